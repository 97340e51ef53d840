use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fs::FileSystem;
use crate::model::move_map::{MoveCycle, MoveMap};
use crate::model::MoveId;
use crate::resolver::normalize_path;

/// One `(from, to)` pair as given by the caller. Either side may be a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl MoveRequest {
    pub fn new(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Why a single move was not applied. Never aborts the rest of the batch.
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("source does not exist: {0}")]
    SourceMissing(PathBuf),
    #[error("destination already exists: {0}")]
    DestinationOccupied(PathBuf),
    #[error("source and destination are the same: {0}")]
    NoOp(PathBuf),
    #[error("directory contains no files: {0}")]
    EmptyDirectory(PathBuf),
    #[error(transparent)]
    Cycle(#[from] MoveCycle),
    #[error("failed to move {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A file-level step of the batch, after directory expansion and validation.
#[derive(Debug)]
pub enum Step {
    Ready { id: MoveId, from: PathBuf, to: PathBuf },
    Rejected { from: PathBuf, to: PathBuf, error: MoveError },
}

/// The validated batch, in request order.
#[derive(Debug)]
pub struct BatchPlan {
    pub steps: Vec<Step>,
    pub move_map: MoveMap,
    /// Source directories of directory moves, pruned once the batch has run.
    pub vacated_dirs: Vec<PathBuf>,
}

impl BatchPlan {
    pub fn ready(&self) -> impl Iterator<Item = (MoveId, &Path, &Path)> {
        self.steps.iter().filter_map(|step| match step {
            Step::Ready { id, from, to } => Some((*id, from.as_path(), to.as_path())),
            Step::Rejected { .. } => None,
        })
    }
}

/// What the file system will look like once the moves accepted so far have run.
struct Overlay<'a> {
    fs: &'a dyn FileSystem,
    vacated: HashSet<PathBuf>,
    created: BTreeSet<PathBuf>,
}

impl<'a> Overlay<'a> {
    fn new(fs: &'a dyn FileSystem) -> Self {
        Self {
            fs,
            vacated: HashSet::new(),
            created: BTreeSet::new(),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.created.contains(path) || (!self.vacated.contains(path) && self.fs.exists(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.fs.is_dir(path) || self.created.iter().any(|c| c != path && c.starts_with(path))
    }

    fn files_under(&self, dir: &Path) -> Result<Vec<PathBuf>, MoveError> {
        let mut files: BTreeSet<PathBuf> = BTreeSet::new();
        if self.fs.is_dir(dir) {
            let on_disk = self.fs.list_files(dir).map_err(|source| MoveError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            files.extend(on_disk.into_iter().filter(|f| !self.vacated.contains(f)));
        }
        files.extend(self.created.iter().filter(|c| c.starts_with(dir)).cloned());
        Ok(files.into_iter().collect())
    }

    fn record(&mut self, from: &Path, to: &Path) {
        self.created.remove(from);
        self.vacated.insert(from.to_path_buf());
        self.vacated.remove(to);
        self.created.insert(to.to_path_buf());
    }
}

/// Expand directory requests into file moves and validate each one in order.
///
/// Validation sees the effect of every earlier accepted move, so a batch may
/// move a file into a slot vacated earlier, or move a file it created.
pub fn plan(
    requests: &[MoveRequest],
    root: &Path,
    fs: &dyn FileSystem,
    extensions: Vec<String>,
) -> BatchPlan {
    let mut overlay = Overlay::new(fs);
    let mut plan = BatchPlan {
        steps: Vec::new(),
        move_map: MoveMap::new(extensions),
        vacated_dirs: Vec::new(),
    };

    for request in requests {
        let from = normalize_path(&root.join(&request.from));
        let to = normalize_path(&root.join(&request.to));

        if from == to {
            plan.reject(from.clone(), to, MoveError::NoOp(from));
            continue;
        }

        if overlay.is_dir(&from) {
            let files = match overlay.files_under(&from) {
                Ok(files) => files,
                Err(error) => {
                    plan.reject(from, to, error);
                    continue;
                }
            };
            if files.is_empty() {
                plan.reject(from.clone(), to, MoveError::EmptyDirectory(from));
                continue;
            }
            tracing::debug!(dir = %from.display(), files = files.len(), "expanding directory move");
            for file in files {
                let Ok(relative) = file.strip_prefix(&from) else {
                    continue;
                };
                let destination = to.join(relative);
                plan.add_file_move(&mut overlay, file, destination);
            }
            plan.vacated_dirs.push(from);
        } else {
            plan.add_file_move(&mut overlay, from, to);
        }
    }

    plan
}

impl BatchPlan {
    fn reject(&mut self, from: PathBuf, to: PathBuf, error: MoveError) {
        tracing::warn!(from = %from.display(), to = %to.display(), %error, "move rejected");
        self.steps.push(Step::Rejected { from, to, error });
    }

    fn add_file_move(&mut self, overlay: &mut Overlay, from: PathBuf, to: PathBuf) {
        if !overlay.exists(&from) {
            self.reject(from.clone(), to, MoveError::SourceMissing(from));
            return;
        }
        if overlay.exists(&to) {
            self.reject(from, to.clone(), MoveError::DestinationOccupied(to));
            return;
        }
        match self.move_map.push(&from, &to) {
            Ok(id) => {
                overlay.record(&from, &to);
                self.steps.push(Step::Ready { id, from, to });
            }
            Err(cycle) => self.reject(from, to, cycle.into()),
        }
    }
}
