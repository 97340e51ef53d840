use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub mod move_map;

/// Position of a move inside a batch. Moves are applied in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MoveId(pub usize);

/// Which kind of module root a file lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleKind {
    Package,
    Application,
    Unknown,
}

impl ModuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Package => "package",
            ModuleKind::Application => "application",
            ModuleKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Semantic identity of a file inside the module tree.
///
/// Always derived from a path via `ModuleClassifier::classify`; never stored
/// independently of the path it was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleAddress {
    pub path: PathBuf,
    pub kind: ModuleKind,
    /// First path segment beneath the matched root. `None` for `Unknown`.
    pub name: Option<String>,
}

impl ModuleAddress {
    pub fn unknown(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            kind: ModuleKind::Unknown,
            name: None,
        }
    }
}

/// Structural relationship between a referencing file and the file it references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveDirection {
    /// Both files belong to the same module; relative addressing applies.
    #[serde(rename = "self")]
    SameModule,
    /// Two different packages; the reference must use the aliased form.
    CrossModule,
    /// A package/application (or unknown) boundary the tool refuses to resolve.
    UnsupportedBoundary,
}

impl MoveDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveDirection::SameModule => "self",
            MoveDirection::CrossModule => "cross-module",
            MoveDirection::UnsupportedBoundary => "unsupported-boundary",
        }
    }
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One file relocation inside a batch. Immutable once the batch is validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMove {
    pub id: MoveId,
    pub from: ModuleAddress,
    pub to: ModuleAddress,
}

/// The syntactic shape an import-like reference was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// `import x from '...'`, `import '...'`, `import type { T } from '...'`
    StaticImport,
    /// `export * from '...'`, `export { a } from '...'`
    ReExport,
    /// `require('...')`, `import x = require('...')`
    Require,
    /// `import('...')`
    DynamicImport,
    /// `jest.mock('...')`, `vi.mock('...')` and friends
    TestMock,
    /// `lazy(() => import('...'))`
    LazyImport,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::StaticImport => "static_import",
            StatementKind::ReExport => "re_export",
            StatementKind::Require => "require",
            StatementKind::DynamicImport => "dynamic_import",
            StatementKind::TestMock => "test_mock",
            StatementKind::LazyImport => "lazy_import",
        }
    }
}

impl FromStr for StatementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static_import" => Ok(StatementKind::StaticImport),
            "re_export" => Ok(StatementKind::ReExport),
            "require" => Ok(StatementKind::Require),
            "dynamic_import" => Ok(StatementKind::DynamicImport),
            "test_mock" => Ok(StatementKind::TestMock),
            "lazy_import" => Ok(StatementKind::LazyImport),
            _ => Err(format!("unknown statement kind: {}", s)),
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recognized import-like occurrence inside a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReference {
    pub source_file: PathBuf,
    /// 1-based line of the string literal.
    pub line: usize,
    /// Literal value without its quotes.
    pub literal: String,
    pub kind: StatementKind,
    /// The trimmed source line, for diagnostics.
    pub statement: String,
    /// Byte range of the literal in the scanned source, quotes included.
    pub span: Range<usize>,
}

impl ImportReference {
    /// `./x`, `../x`, `.` and `..` are relative; everything else is a bare or aliased specifier.
    pub fn is_relative(&self) -> bool {
        crate::resolver::is_relative_literal(&self.literal)
    }
}

/// Grammar used to parse a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    TypeScript,
    Tsx,
    JavaScript,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::JavaScript => "javascript",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ts" | "mts" | "cts" => Some(Language::TypeScript),
            "tsx" => Some(Language::Tsx),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_kind_round_trips_through_str() {
        for kind in [
            StatementKind::StaticImport,
            StatementKind::ReExport,
            StatementKind::Require,
            StatementKind::DynamicImport,
            StatementKind::TestMock,
            StatementKind::LazyImport,
        ] {
            assert_eq!(kind.as_str().parse::<StatementKind>(), Ok(kind));
        }
        assert!("nope".parse::<StatementKind>().is_err());
    }

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path(Path::new("a/b.ts")), Some(Language::TypeScript));
        assert_eq!(Language::from_path(Path::new("a/b.tsx")), Some(Language::Tsx));
        assert_eq!(Language::from_path(Path::new("a/b.mjs")), Some(Language::JavaScript));
        assert_eq!(Language::from_path(Path::new("a/logo.png")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(MoveDirection::SameModule.to_string(), "self");
        assert_eq!(MoveDirection::CrossModule.to_string(), "cross-module");
        assert_eq!(
            MoveDirection::UnsupportedBoundary.to_string(),
            "unsupported-boundary"
        );
    }

    #[test]
    fn test_relative_reference_detection() {
        let mut reference = ImportReference {
            source_file: PathBuf::from("/p/a.ts"),
            line: 1,
            literal: "./b".to_string(),
            kind: StatementKind::StaticImport,
            statement: "import b from './b';".to_string(),
            span: 14..19,
        };
        assert!(reference.is_relative());
        reference.literal = "@alias/main/lib/b".to_string();
        assert!(!reference.is_relative());
    }
}
