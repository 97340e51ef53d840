use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;

/// Configuration for candidate discovery.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryConfig {
    /// Glob patterns to include (empty means include all).
    pub include: Vec<String>,
    /// Glob patterns to exclude.
    pub exclude: Vec<String>,
    /// Extensions of files worth scanning for references.
    pub extensions: Vec<String>,
}

impl DiscoveryConfig {
    pub fn for_extensions(extensions: &[String]) -> Self {
        Self {
            extensions: extensions.to_vec(),
            ..Default::default()
        }
    }
}

/// Default exclude patterns for dependency and build output directories.
const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &["node_modules/", "dist/", "build/", "coverage/"];

/// Discover the files whose imports should be scanned, respecting .gitignore.
pub fn discover_files(root: &Path, config: &DiscoveryConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false) // don't skip dot-prefixed dirs entirely (let gitignore decide)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .parents(true)
        .filter_entry(|entry| entry.file_name() != ".git");

    let mut overrides = ignore::overrides::OverrideBuilder::new(root);
    for pattern in DEFAULT_EXCLUDE_PATTERNS {
        overrides
            .add(&format!("!{}", pattern))
            .context("invalid default exclude pattern")?;
    }
    for pattern in &config.exclude {
        overrides
            .add(&format!("!{}", pattern))
            .context("invalid exclude pattern")?;
    }
    for pattern in &config.include {
        overrides.add(pattern).context("invalid include pattern")?;
    }
    builder.overrides(overrides.build().context("failed to build overrides")?);

    for entry in builder.build() {
        let entry = entry.context("error reading directory entry")?;

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let scannable = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| config.extensions.iter().any(|e| e == ext));
        if scannable {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    tracing::debug!(root = %root.display(), files = files.len(), "discovered candidate files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelinkConfig;
    use std::fs;
    use tempfile::TempDir;

    fn default_config() -> DiscoveryConfig {
        DiscoveryConfig::for_extensions(&RelinkConfig::default().source_extensions)
    }

    fn setup_test_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        fs::create_dir_all(root.join("packages/main/src")).unwrap();
        fs::write(root.join("packages/main/src/index.ts"), "export * from './utils';").unwrap();
        fs::write(root.join("packages/main/src/utils.ts"), "export function helper() {}").unwrap();
        fs::write(root.join("packages/main/src/styles.css"), "body { color: red; }").unwrap();
        fs::write(root.join("packages/main/src/app.js"), "require('./utils');").unwrap();

        // Initialize a git repo so the ignore crate respects .gitignore
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join(".gitignore"), "*.log\ngenerated/\n").unwrap();

        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("node_modules/pkg/index.ts"), "// ignored").unwrap();
        fs::create_dir_all(root.join("packages/main/dist")).unwrap();
        fs::write(root.join("packages/main/dist/index.js"), "// build output").unwrap();
        fs::create_dir_all(root.join("generated")).unwrap();
        fs::write(root.join("generated/api.ts"), "// gitignored").unwrap();
        fs::write(root.join("debug.log"), "some log").unwrap();

        dir
    }

    fn relative(dir: &TempDir, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_discovers_source_files_only() {
        let dir = setup_test_project();
        let files = discover_files(dir.path(), &default_config()).unwrap();
        assert_eq!(
            relative(&dir, &files),
            vec![
                "packages/main/src/app.js",
                "packages/main/src/index.ts",
                "packages/main/src/utils.ts",
            ]
        );
    }

    #[test]
    fn test_respects_gitignore_and_default_excludes() {
        let dir = setup_test_project();
        let files = discover_files(dir.path(), &default_config()).unwrap();
        let paths = relative(&dir, &files);
        assert!(!paths.iter().any(|p| p.contains("node_modules")));
        assert!(!paths.iter().any(|p| p.contains("/dist/")));
        assert!(!paths.iter().any(|p| p.starts_with("generated")));
    }

    #[test]
    fn test_exclude_pattern_filters_files() {
        let dir = setup_test_project();
        let config = DiscoveryConfig {
            exclude: vec!["*.js".to_string()],
            ..default_config()
        };
        let files = discover_files(dir.path(), &config).unwrap();
        let paths = relative(&dir, &files);
        assert!(!paths.iter().any(|p| p.ends_with(".js")));
        assert!(paths.iter().any(|p| p.ends_with("index.ts")));
    }

    #[test]
    fn test_include_pattern_restricts_files() {
        let dir = setup_test_project();
        let config = DiscoveryConfig {
            include: vec!["**/utils.ts".to_string()],
            ..default_config()
        };
        let files = discover_files(dir.path(), &config).unwrap();
        assert_eq!(relative(&dir, &files), vec!["packages/main/src/utils.ts"]);
    }

    #[test]
    fn test_all_script_extensions() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        for name in ["a.tsx", "b.jsx", "c.mjs", "d.cjs", "e.mts", "f.cts", "g.d.ts"] {
            fs::write(root.join("src").join(name), "").unwrap();
        }
        let files = discover_files(root, &default_config()).unwrap();
        assert_eq!(files.len(), 7);
    }

    #[test]
    fn test_files_without_extensions_are_skipped() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("Makefile"), "all: build").unwrap();
        fs::write(root.join("main.ts"), "const x = 1;").unwrap();

        let files = discover_files(root, &default_config()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.ts"));
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(discover_files(dir.path(), &default_config()).unwrap().is_empty());
    }

    #[test]
    fn test_nonexistent_directory_returns_error() {
        let result = discover_files(
            Path::new("/nonexistent/path/that/surely/doesnt/exist"),
            &default_config(),
        );
        assert!(result.is_err(), "should error on nonexistent directory");
    }
}
