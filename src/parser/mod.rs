use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::ImportReference;

pub mod typescript;

/// Why a file produced no references.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("unsupported file type: {0}")]
    Unsupported(PathBuf),
    #[error("failed to configure parser for {path}: {message}")]
    Parser { path: PathBuf, message: String },
    #[error("parser produced no syntax tree for {0}")]
    NoTree(PathBuf),
    #[error("syntax error in {path} at line {line}")]
    Syntax { path: PathBuf, line: usize },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Walks a parsed file and collects every import-like reference.
///
/// Implementations match statement shapes structurally on the syntax tree;
/// only string-literal specifiers are reported, computed ones are skipped.
pub trait ReferenceScanner: Send + Sync {
    /// Scan `source` (the content of `path`) in document order.
    fn scan(&self, path: &Path, source: &str) -> Result<Vec<ImportReference>, ScanError>;

    /// Can this scanner parse the file at `path`?
    fn supports(&self, path: &Path) -> bool;
}
