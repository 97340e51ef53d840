use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::fs::FileSystem;
use crate::model::ImportReference;
use crate::parser::{ReferenceScanner, ScanError};

/// Per-batch cache of file contents and scanned references.
///
/// Safe to populate from several threads: a lookup that misses reads (or
/// scans) outside the lock and then inserts only if nobody beat it there, so
/// a lost race costs one redundant read and never replaces a newer entry.
pub struct FileCache {
    fs: Arc<dyn FileSystem>,
    scanner: Arc<dyn ReferenceScanner>,
    contents: Mutex<HashMap<PathBuf, Arc<str>>>,
    parsed: Mutex<HashMap<PathBuf, Arc<Vec<ImportReference>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock cannot leave a map half-updated
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FileCache {
    pub fn new(fs: Arc<dyn FileSystem>, scanner: Arc<dyn ReferenceScanner>) -> Self {
        Self {
            fs,
            scanner,
            contents: Mutex::new(HashMap::new()),
            parsed: Mutex::new(HashMap::new()),
        }
    }

    /// Current content of `path`, read on first access.
    pub fn content(&self, path: &Path) -> std::io::Result<Arc<str>> {
        if let Some(content) = lock(&self.contents).get(path) {
            return Ok(Arc::clone(content));
        }

        let content: Arc<str> = Arc::from(self.fs.read_to_string(path)?);
        let mut contents = lock(&self.contents);
        let entry = contents
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::clone(&content));
        Ok(Arc::clone(entry))
    }

    /// References found in `path`, scanned on first access.
    ///
    /// Failures are not cached.
    pub fn parsed(&self, path: &Path) -> Result<Arc<Vec<ImportReference>>, ScanError> {
        if let Some(references) = lock(&self.parsed).get(path) {
            return Ok(Arc::clone(references));
        }

        let content = self.content(path).map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let references = Arc::new(self.scanner.scan(path, &content)?);

        let mut parsed = lock(&self.parsed);
        let entry = parsed
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::clone(&references));
        Ok(Arc::clone(entry))
    }

    /// Record rewritten content. The file's scan results are stale from here on.
    pub fn replace_content(&self, path: &Path, content: String) {
        lock(&self.contents).insert(path.to_path_buf(), Arc::from(content));
        lock(&self.parsed).remove(path);
    }

    /// Follow a physical move: the entries for `old` now live under `new`.
    pub fn rekey(&self, old: &Path, new: &Path) {
        {
            let mut contents = lock(&self.contents);
            if let Some(content) = contents.remove(old) {
                contents.insert(new.to_path_buf(), content);
            }
        }
        let mut parsed = lock(&self.parsed);
        if let Some(references) = parsed.remove(old) {
            parsed.insert(new.to_path_buf(), references);
        }
    }

    pub fn is_cached(&self, path: &Path) -> bool {
        lock(&self.contents).contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFileSystem;
    use crate::parser::typescript::TypeScriptScanner;
    use std::fs;
    use tempfile::TempDir;

    fn cache() -> FileCache {
        FileCache::new(Arc::new(OsFileSystem), Arc::new(TypeScriptScanner::default()))
    }

    #[test]
    fn test_content_is_read_once() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        fs::write(&file, "import b from './b';\n").unwrap();

        let cache = cache();
        let first = cache.content(&file).unwrap();
        fs::write(&file, "changed on disk").unwrap();
        let second = cache.content(&file).unwrap();
        assert_eq!(&*first, "import b from './b';\n");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_parsed_and_replace_content() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        fs::write(&file, "import b from './b';\n").unwrap();

        let cache = cache();
        assert_eq!(cache.parsed(&file).unwrap()[0].literal, "./b");

        cache.replace_content(&file, "import c from './c';\n".to_string());
        assert_eq!(&*cache.content(&file).unwrap(), "import c from './c';\n");
        assert_eq!(cache.parsed(&file).unwrap()[0].literal, "./c");
    }

    #[test]
    fn test_rekey_moves_entries_without_reading() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("a.ts");
        let new = dir.path().join("moved/a.ts");
        fs::write(&old, "export const a = 1;\n").unwrap();

        let cache = cache();
        cache.content(&old).unwrap();
        cache.rekey(&old, &new);

        assert!(!cache.is_cached(&old));
        // `new` does not exist on disk, so this must come from the cache
        assert_eq!(&*cache.content(&new).unwrap(), "export const a = 1;\n");
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let err = cache().parsed(&dir.path().join("missing.ts")).unwrap_err();
        assert!(matches!(err, ScanError::Io { .. }));
    }

    #[test]
    fn test_concurrent_fills_share_one_entry() {
        use rayon::prelude::*;

        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.ts");
        fs::write(&file, "import b from './b';\nexport * from './c';\n").unwrap();
        let cache = cache();

        let results: Vec<Arc<Vec<ImportReference>>> = (0..32)
            .into_par_iter()
            .map(|_| cache.parsed(&file).unwrap())
            .collect();

        let first = &results[0];
        assert_eq!(first.len(), 2);
        for references in &results {
            assert!(Arc::ptr_eq(references, first));
        }
        assert!(Arc::ptr_eq(&cache.content(&file).unwrap(), &cache.content(&file).unwrap()));
    }
}
