use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Naming conventions of the codebase being rewritten.
///
/// Every field has a default, so an empty file (or no file at all) is a valid
/// configuration for the conventional `packages/<name>/src` layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelinkConfig {
    /// Directories (relative to the project root) holding package modules.
    pub package_roots: Vec<String>,
    /// Directories (relative to the project root) holding application modules.
    pub application_roots: Vec<String>,
    /// Prefix of aliased imports, e.g. `@alias` in `@alias/main/lib/utils`.
    pub alias_prefix: String,
    /// Source folder inside a package (`packages/<name>/<source_folder>/...`).
    pub source_folder: String,
    /// Folder the source folder is published as in aliased imports.
    pub output_folder: String,
    /// Base names (without extension) a directory import resolves to.
    pub index_names: Vec<String>,
    /// Extensions treated as source modules (imported without extension).
    pub source_extensions: Vec<String>,
    /// Functions whose first argument may be `() => import('...')`.
    pub lazy_wrappers: Vec<String>,
    /// Test framework objects whose methods take a module path (`jest`, `vi`).
    pub mock_objects: Vec<String>,
    pub mock_methods: Vec<String>,
}

impl Default for RelinkConfig {
    fn default() -> Self {
        Self {
            package_roots: vec!["packages".to_string()],
            application_roots: vec!["apps".to_string()],
            alias_prefix: "@alias".to_string(),
            source_folder: "src".to_string(),
            output_folder: "lib".to_string(),
            index_names: vec!["index".to_string()],
            source_extensions: ["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            lazy_wrappers: vec!["lazy".to_string(), "loadable".to_string()],
            mock_objects: vec!["jest".to_string(), "vi".to_string()],
            mock_methods: ["mock", "doMock", "unmock", "requireActual", "requireMock"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Default config file names, searched in order.
const CONFIG_FILENAMES: &[&str] = &[".relink/config.toml", "relink.toml"];

/// Find the config file for a project.
///
/// If `config_override` is provided, use that path directly.
/// Otherwise, search for config files in the project root.
pub fn find_config_path(project_root: &Path, config_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(override_path) = config_override {
        if override_path.exists() {
            return Some(override_path.to_path_buf());
        }
        return None;
    }

    CONFIG_FILENAMES
        .iter()
        .map(|filename| project_root.join(filename))
        .find(|path| path.exists())
}

/// Load and parse a config from a TOML file.
pub fn load_config(path: &Path) -> Result<RelinkConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse a config from a TOML string.
pub fn parse_config(toml_str: &str) -> Result<RelinkConfig> {
    let config: RelinkConfig = toml::from_str(toml_str)?;
    Ok(config)
}

/// Load the project config, or defaults when the project has none.
///
/// An explicit `--config` path that does not exist is an error.
pub fn load_project_config(
    project_root: &Path,
    config_override: Option<&Path>,
) -> Result<RelinkConfig> {
    match find_config_path(project_root, config_override) {
        Some(path) => load_config(&path),
        None => match config_override {
            Some(path) => anyhow::bail!("config file not found: {}", path.display()),
            None => Ok(RelinkConfig::default()),
        },
    }
}

/// A `RelinkConfig` resolved against a concrete project root.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub package_roots: Vec<PathBuf>,
    pub application_roots: Vec<PathBuf>,
    pub config: RelinkConfig,
}

impl ProjectLayout {
    pub fn new(root: &Path, config: RelinkConfig) -> Self {
        let resolve = |roots: &[String]| -> Vec<PathBuf> {
            let mut resolved: Vec<PathBuf> = roots
                .iter()
                .map(|r| crate::resolver::normalize_path(&root.join(r.trim_end_matches('/'))))
                .collect();
            // Most specific root first
            resolved.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
            resolved
        };

        Self {
            root: root.to_path_buf(),
            package_roots: resolve(&config.package_roots),
            application_roots: resolve(&config.application_roots),
            config,
        }
    }

    pub fn is_source_extension(&self, ext: &str) -> bool {
        self.config.source_extensions.iter().any(|e| e == ext)
    }

    pub fn is_index_name(&self, stem: &str) -> bool {
        self.config.index_names.iter().any(|n| n == stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, RelinkConfig::default());
        assert_eq!(config.alias_prefix, "@alias");
        assert_eq!(config.source_folder, "src");
        assert_eq!(config.output_folder, "lib");
    }

    #[test]
    fn test_partial_config_overrides_fields() {
        let config = parse_config(
            r#"
package_roots = ["libs", "shared/packages"]
alias_prefix = "@acme"
output_folder = "dist"
"#,
        )
        .unwrap();
        assert_eq!(config.package_roots, vec!["libs", "shared/packages"]);
        assert_eq!(config.alias_prefix, "@acme");
        assert_eq!(config.output_folder, "dist");
        assert_eq!(config.source_folder, "src");
        assert_eq!(config.application_roots, vec!["apps"]);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        assert!(parse_config("package_roots = 3").is_err());
    }

    #[test]
    fn test_find_config_search_order() {
        let dir = TempDir::new().unwrap();
        assert!(find_config_path(dir.path(), None).is_none());

        fs::write(dir.path().join("relink.toml"), "").unwrap();
        assert_eq!(
            find_config_path(dir.path(), None),
            Some(dir.path().join("relink.toml"))
        );

        fs::create_dir_all(dir.path().join(".relink")).unwrap();
        fs::write(dir.path().join(".relink/config.toml"), "").unwrap();
        assert_eq!(
            find_config_path(dir.path(), None),
            Some(dir.path().join(".relink/config.toml"))
        );
    }

    #[test]
    fn test_missing_override_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_project_config(dir.path(), Some(&missing)).is_err());
        assert!(load_project_config(dir.path(), None).is_ok());
    }

    #[test]
    fn test_layout_resolves_roots_most_specific_first() {
        let config = RelinkConfig {
            package_roots: vec!["packages".to_string(), "packages/nested/".to_string()],
            ..Default::default()
        };
        let layout = ProjectLayout::new(Path::new("/repo"), config);
        assert_eq!(
            layout.package_roots,
            vec![
                PathBuf::from("/repo/packages/nested"),
                PathBuf::from("/repo/packages")
            ]
        );
        assert_eq!(layout.application_roots, vec![PathBuf::from("/repo/apps")]);
        assert!(layout.is_source_extension("tsx"));
        assert!(!layout.is_source_extension("png"));
        assert!(layout.is_index_name("index"));
    }
}
