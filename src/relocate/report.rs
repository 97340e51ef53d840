use std::path::PathBuf;

use serde::Serialize;

use crate::model::MoveDirection;

/// Everything one batch did, or would do under `--dry-run`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub dry_run: bool,
    pub moves: Vec<MoveOutcome>,
    /// Moved files nothing else references, at their final location.
    pub dead_files: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        self.moves.iter().any(|m| m.status == MoveStatus::Failed)
    }

    pub fn applied(&self) -> usize {
        self.moves
            .iter()
            .filter(|m| m.status == MoveStatus::Applied)
            .count()
    }

    pub fn files_updated(&self) -> usize {
        self.moves.iter().map(|m| m.files_updated).sum()
    }

    pub fn references_updated(&self) -> usize {
        self.moves.iter().map(|m| m.references_updated).sum()
    }

    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveStatus {
    Applied,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveOutcome {
    pub from: PathBuf,
    pub to: PathBuf,
    pub status: MoveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Files whose content changed because of this move.
    pub files_updated: usize,
    pub references_updated: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ReferenceDiagnostic>,
}

impl MoveOutcome {
    pub fn applied(from: PathBuf, to: PathBuf) -> Self {
        Self {
            from,
            to,
            status: MoveStatus::Applied,
            error: None,
            files_updated: 0,
            references_updated: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn failed(from: PathBuf, to: PathBuf, error: String) -> Self {
        Self {
            status: MoveStatus::Failed,
            error: Some(error),
            ..Self::applied(from, to)
        }
    }
}

/// One rewritten reference.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceDiagnostic {
    pub file: PathBuf,
    pub line: usize,
    pub statement: String,
    pub old_literal: String,
    pub new_literal: String,
    pub direction: MoveDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A reference crosses a module boundary that needs manual resolution.
    UnsupportedBoundary,
    ParseFailure,
    Io,
    /// A cross-package reference to a file with no aliased form.
    NoAlias,
    IndexCollision,
    /// A moved file references something that does not exist.
    Unresolved,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::UnsupportedBoundary => "unsupported_boundary",
            WarningKind::ParseFailure => "parse_failure",
            WarningKind::Io => "io",
            WarningKind::NoAlias => "no_alias",
            WarningKind::IndexCollision => "index_collision",
            WarningKind::Unresolved => "unresolved",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            file: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, file: PathBuf, line: Option<usize>) -> Self {
        self.file = Some(file);
        self.line = line;
        self
    }
}
