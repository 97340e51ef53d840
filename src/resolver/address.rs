use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use crate::config::ProjectLayout;

use super::classify::ModuleClassifier;
use super::{normalize_path, path_key, strip_source_extension, to_slash};

/// Every string an import could use to address one file, forward-slash normalized.
pub type AddressFormSet = BTreeSet<String>;

/// Enumerates the address forms of files and builds aliased literals.
#[derive(Debug, Clone)]
pub struct AddressFormGenerator {
    classifier: ModuleClassifier,
}

impl AddressFormGenerator {
    pub fn new(classifier: ModuleClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &ModuleClassifier {
        &self.classifier
    }

    pub fn layout(&self) -> &ProjectLayout {
        self.classifier.layout()
    }

    /// Strip a known source extension from a forward-slash address.
    pub fn strip<'a>(&self, address: &'a str) -> &'a str {
        strip_source_extension(address, &self.layout().config.source_extensions)
    }

    /// Is this file one a directory import implicitly resolves to?
    pub fn is_index(&self, path: &Path) -> bool {
        path.file_name()
            .map(|n| n.to_string_lossy())
            .is_some_and(|name| self.layout().is_index_name(self.strip(&name)))
    }

    /// All address forms of `path`:
    ///
    /// - the absolute normalized path
    /// - the same with its source extension stripped
    /// - the aliased form, when the file lives under `<package root>/<name>/<source folder>/`
    /// - for index files, the parent-directory form of each of the above
    pub fn forms(&self, path: &Path) -> AddressFormSet {
        let absolute = path_key(path);
        let stripped = self.strip(&absolute).to_string();

        let mut forms = AddressFormSet::new();
        if let Some(alias) = self.aliased_form(Path::new(&stripped)) {
            forms.insert(alias);
        }
        forms.insert(absolute);
        forms.insert(stripped);

        if self.is_index(path) {
            let directories: Vec<String> = forms
                .iter()
                .filter_map(|f| f.rsplit_once('/'))
                .map(|(parent, _)| parent.to_string())
                .filter(|parent| !parent.is_empty())
                .collect();
            forms.extend(directories);
        }

        forms
    }

    /// Aliased literal for a path under `<package root>/<name>/<source folder>/<rest>`:
    /// `<alias prefix>/<name>/<output folder>/<rest>`.
    ///
    /// `path` is used as given: callers strip the extension first when the
    /// literal should not carry one. Returns `None` outside any package source folder.
    pub fn aliased_form(&self, path: &Path) -> Option<String> {
        let config = &self.layout().config;
        let (package_dir, name) = self.classifier.package_dir(path)?;
        let mut rest = path.strip_prefix(&package_dir).ok()?.components();

        match rest.next() {
            Some(Component::Normal(folder)) if folder == config.source_folder.as_str() => {}
            _ => return None,
        }

        let rest: PathBuf = rest.collect();
        let mut alias = format!("{}/{}/{}", config.alias_prefix, name, config.output_folder);
        if !rest.as_os_str().is_empty() {
            alias.push('/');
            alias.push_str(&to_slash(&rest));
        }
        Some(alias)
    }

    /// Paths an aliased literal could stand for, one per package root: the
    /// inverse of [`AddressFormGenerator::aliased_form`]. Empty for literals
    /// that do not follow the alias convention.
    pub fn unaliased_candidates(&self, literal: &str) -> Vec<PathBuf> {
        let layout = self.layout();
        let config = &layout.config;
        let Some(rest) = literal
            .strip_prefix(config.alias_prefix.as_str())
            .and_then(|r| r.strip_prefix('/'))
        else {
            return Vec::new();
        };

        let mut segments = rest.splitn(3, '/');
        let (Some(name), Some(folder)) = (segments.next(), segments.next()) else {
            return Vec::new();
        };
        if name.is_empty() || folder != config.output_folder {
            return Vec::new();
        }
        let tail = segments.next().unwrap_or_default();

        layout
            .package_roots
            .iter()
            .map(|root| {
                let source = root.join(name).join(&config.source_folder);
                if tail.is_empty() {
                    source
                } else {
                    normalize_path(&source.join(tail))
                }
            })
            .collect()
    }
}
