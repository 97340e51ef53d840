use std::path::{Path, PathBuf};

use crate::config::ProjectLayout;
use crate::model::{ModuleAddress, ModuleKind, MoveDirection};

/// Determines which module a path belongs to, and how two modules relate.
#[derive(Debug, Clone)]
pub struct ModuleClassifier {
    layout: ProjectLayout,
}

impl ModuleClassifier {
    pub fn new(layout: ProjectLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Classify a path by the first configured root it falls under.
    ///
    /// Package roots are checked before application roots. The module name is
    /// the first segment beneath the root; a path that *is* a root (no segment
    /// beneath it) is `Unknown`.
    pub fn classify(&self, path: &Path) -> ModuleAddress {
        let roots = self
            .layout
            .package_roots
            .iter()
            .map(|r| (r, ModuleKind::Package))
            .chain(
                self.layout
                    .application_roots
                    .iter()
                    .map(|r| (r, ModuleKind::Application)),
            );

        for (root, kind) in roots {
            if let Some(name) = module_name_under(path, root) {
                return ModuleAddress {
                    path: path.to_path_buf(),
                    kind,
                    name: Some(name),
                };
            }
        }

        ModuleAddress::unknown(path)
    }

    /// Relationship between the module of a referencing file and the module of its target.
    pub fn direction(&self, referencing: &ModuleAddress, target: &ModuleAddress) -> MoveDirection {
        match (referencing.kind, target.kind) {
            (ModuleKind::Unknown, _) | (_, ModuleKind::Unknown) => {
                MoveDirection::UnsupportedBoundary
            }
            (ModuleKind::Package, ModuleKind::Package) => {
                if referencing.name == target.name {
                    MoveDirection::SameModule
                } else {
                    MoveDirection::CrossModule
                }
            }
            (ModuleKind::Application, ModuleKind::Application) => {
                if referencing.name == target.name {
                    MoveDirection::SameModule
                } else {
                    // Aliased addressing only exists for packages
                    MoveDirection::UnsupportedBoundary
                }
            }
            (ModuleKind::Package, ModuleKind::Application)
            | (ModuleKind::Application, ModuleKind::Package) => MoveDirection::UnsupportedBoundary,
        }
    }

    /// Convenience: classify both paths, then compare.
    pub fn direction_between(&self, referencing: &Path, target: &Path) -> MoveDirection {
        self.direction(&self.classify(referencing), &self.classify(target))
    }

    /// Root directory of the package a path belongs to (`<root>/<name>`), if any.
    pub fn package_dir(&self, path: &Path) -> Option<(PathBuf, String)> {
        self.layout.package_roots.iter().find_map(|root| {
            module_name_under(path, root).map(|name| (root.join(&name), name))
        })
    }
}

fn module_name_under(path: &Path, root: &Path) -> Option<String> {
    let rest = path.strip_prefix(root).ok()?;
    rest.components()
        .next()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
}
