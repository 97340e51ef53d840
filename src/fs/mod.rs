use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

/// File-system operations the relocator performs.
///
/// Every operation is fallible per path; callers turn failures into report
/// entries instead of aborting the batch.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    /// Every file beneath `dir`, recursively and sorted, ignore files disregarded.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
    /// Immediate subdirectories of `dir`.
    fn list_dirs(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
    /// Remove `dir` if it is empty.
    fn remove_dir(&self, dir: &Path) -> io::Result<()>;
}

/// The real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .follow_links(false)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(io::Error::other)?;
            if entry.file_type().is_some_and(|ft| ft.is_file()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn list_dirs(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    fn remove_dir(&self, dir: &Path) -> io::Result<()> {
        std::fs::remove_dir(dir)
    }
}

/// Remove `dir` and every directory beneath it that holds no files.
///
/// Returns whether `dir` itself was removed.
pub fn prune_empty_dirs(fs: &dyn FileSystem, dir: &Path) -> io::Result<bool> {
    if !fs.is_dir(dir) {
        return Ok(false);
    }
    for child in fs.list_dirs(dir)? {
        prune_empty_dirs(fs, &child)?;
    }
    if fs.list_files(dir)?.is_empty() && fs.list_dirs(dir)?.is_empty() {
        fs.remove_dir(dir)?;
        return Ok(true);
    }
    Ok(false)
}
