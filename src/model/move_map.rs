use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::MoveId;
use crate::resolver::{path_key, strip_source_extension};

/// Returned when a move would bring a file back to a location it already
/// occupied earlier in the same batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("moving {from} to {to} closes a cycle with earlier moves in the batch")]
pub struct MoveCycle {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone)]
struct Entry {
    from: PathBuf,
    to: PathBuf,
    from_key: String,
    to_key: String,
}

/// Ordered record of the moves in one batch.
///
/// Answers "where is this file now?" by following chains (A→B, then B→C)
/// in batch order. Chains are walked backwards to find where they start and
/// to reject cycles. Both directions are indexed by extension-stripped key,
/// so extension-less addresses (as written in imports) resolve too.
#[derive(Debug, Clone, Default)]
pub struct MoveMap {
    entries: Vec<Entry>,
    forward: HashMap<String, Vec<usize>>,
    backward: HashMap<String, Vec<usize>>,
    extensions: Vec<String>,
}

impl MoveMap {
    pub fn new(extensions: Vec<String>) -> Self {
        Self {
            extensions,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source_of(&self, id: MoveId) -> &Path {
        &self.entries[id.0].from
    }

    pub fn destination_of(&self, id: MoveId) -> &Path {
        &self.entries[id.0].to
    }

    fn strip<'a>(&self, key: &'a str) -> &'a str {
        strip_source_extension(key, &self.extensions)
    }

    /// Append a move. Rejects a destination the moved file already passed through.
    pub fn push(&mut self, from: &Path, to: &Path) -> Result<MoveId, MoveCycle> {
        let from_key = path_key(from);
        let to_key = path_key(to);

        let mut visited = vec![from_key.clone()];
        let mut current = from_key.clone();
        let mut ceiling = self.entries.len();
        while let Some(j) = self.step_back(&current, ceiling) {
            current = self.entries[j].from_key.clone();
            visited.push(current.clone());
            ceiling = j;
        }
        if visited.contains(&to_key) {
            return Err(MoveCycle {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
            });
        }

        let index = self.entries.len();
        self.forward
            .entry(self.strip(&from_key).to_string())
            .or_default()
            .push(index);
        self.backward
            .entry(self.strip(&to_key).to_string())
            .or_default()
            .push(index);
        self.entries.push(Entry {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            from_key,
            to_key,
        });
        Ok(MoveId(index))
    }

    /// First move at or after `floor` (and before `limit`) that relocates `key`.
    fn step_forward(&self, key: &str, floor: usize, limit: usize) -> Option<usize> {
        let stripped = self.strip(key);
        let loose = stripped == key;
        self.forward
            .get(stripped)?
            .iter()
            .copied()
            .filter(|&j| j >= floor && j < limit)
            .find(|&j| loose || self.entries[j].from_key == key)
    }

    /// Latest move before `ceiling` that produced `key`.
    fn step_back(&self, key: &str, ceiling: usize) -> Option<usize> {
        let stripped = self.strip(key);
        let loose = stripped == key;
        self.backward
            .get(stripped)?
            .iter()
            .copied()
            .filter(|&j| j < ceiling)
            .rev()
            .find(|&j| loose || self.entries[j].to_key == key)
    }

    /// Location of `path` once the first `applied` moves have run.
    ///
    /// Extension-less input yields extension-less output.
    pub fn resolve_until(&self, path: &Path, applied: usize) -> PathBuf {
        let limit = applied.min(self.entries.len());
        let mut key = path_key(path);
        let loose = self.strip(&key) == key;
        let mut floor = 0;
        let mut last = None;

        // Each step strictly raises `floor`, so this terminates within the batch size
        while let Some(j) = self.step_forward(&key, floor, limit) {
            key = if loose {
                self.strip(&self.entries[j].to_key).to_string()
            } else {
                self.entries[j].to_key.clone()
            };
            floor = j + 1;
            last = Some(j);
        }

        match last {
            None => path.to_path_buf(),
            Some(j) if !loose => self.entries[j].to.clone(),
            Some(_) => PathBuf::from(key),
        }
    }

    /// Final location of `path` after the whole batch.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.resolve_until(path, self.entries.len())
    }

    /// Does move `id` pick up a file that existed before the batch, rather than
    /// one an earlier move put there?
    pub fn is_chain_start(&self, id: MoveId) -> bool {
        self.step_back(&self.entries[id.0].from_key, id.0).is_none()
    }

    /// The move that first relocates the file originally at `path`, if any.
    pub fn first_move_of(&self, path: &Path) -> Option<MoveId> {
        self.step_forward(&path_key(path), 0, self.entries.len())
            .map(MoveId)
    }

    /// Every move in the chain that starts with the file originally at `path`.
    pub fn chain_of(&self, path: &Path) -> Vec<MoveId> {
        let mut chain = Vec::new();
        let mut key = path_key(path);
        let mut floor = 0;
        while let Some(j) = self.step_forward(&key, floor, self.entries.len()) {
            chain.push(MoveId(j));
            key = self.entries[j].to_key.clone();
            floor = j + 1;
        }
        chain
    }
}
