use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::model::{FileMove, MoveId};

use super::address::AddressFormGenerator;
use super::{is_relative_literal, path_key, resolve_relative, strip_source_extension};

/// Two moves produced the same address form; the first one kept it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexCollision {
    pub form: String,
    pub kept: MoveId,
    pub dropped: MoveId,
}

/// Inverted mapping from address form to the move whose source it addresses.
///
/// Built fresh for every batch from the moves' `from` locations.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    entries: HashMap<String, MoveId>,
    collisions: Vec<IndexCollision>,
    extensions: Vec<String>,
}

impl ReferenceIndex {
    pub fn build(moves: &[FileMove], forms: &AddressFormGenerator) -> Self {
        let mut index = Self {
            extensions: forms.layout().config.source_extensions.clone(),
            ..Default::default()
        };

        for file_move in moves {
            for form in forms.forms(&file_move.from.path) {
                match index.entries.get(&form) {
                    Some(&kept) if kept != file_move.id => {
                        tracing::warn!(form = %form, ?kept, dropped = ?file_move.id, "address form collision");
                        index.collisions.push(IndexCollision {
                            form,
                            kept,
                            dropped: file_move.id,
                        });
                    }
                    Some(_) => {}
                    None => {
                        index.entries.insert(form, file_move.id);
                    }
                }
            }
        }

        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn collisions(&self) -> &[IndexCollision] {
        &self.collisions
    }

    /// The move a literal refers to, if any.
    ///
    /// The literal is first looked up as written. Only relative literals are
    /// then resolved against `containing_file`'s directory and retried, with
    /// and without a source extension; a bare or aliased literal that misses
    /// the index is never reinterpreted.
    pub fn lookup(&self, literal: &str, containing_file: &Path) -> Option<MoveId> {
        if let Some(&id) = self.entries.get(literal) {
            return Some(id);
        }
        if !is_relative_literal(literal) {
            return None;
        }

        let resolved = path_key(&resolve_relative(literal, containing_file));
        self.entries.get(&resolved).copied().or_else(|| {
            self.entries
                .get(strip_source_extension(&resolved, &self.extensions))
                .copied()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProjectLayout, RelinkConfig};
    use crate::resolver::classify::ModuleClassifier;
    use std::path::PathBuf;

    fn generator() -> AddressFormGenerator {
        AddressFormGenerator::new(ModuleClassifier::new(ProjectLayout::new(
            Path::new("/repo"),
            RelinkConfig::default(),
        )))
    }

    fn moves(g: &AddressFormGenerator, pairs: &[(&str, &str)]) -> Vec<FileMove> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, (from, to))| FileMove {
                id: MoveId(i),
                from: g.classifier().classify(Path::new(from)),
                to: g.classifier().classify(Path::new(to)),
            })
            .collect()
    }

    #[test]
    fn test_lookup_relative_literal() {
        let g = generator();
        let index = ReferenceIndex::build(
            &moves(
                &g,
                &[(
                    "/repo/packages/main/src/utils/helper.ts",
                    "/repo/packages/main/src/shared/helper.ts",
                )],
            ),
            &g,
        );
        let button = PathBuf::from("/repo/packages/main/src/components/Button.ts");
        assert_eq!(index.lookup("../utils/helper", &button), Some(MoveId(0)));
        assert_eq!(index.lookup("../utils/helper.ts", &button), Some(MoveId(0)));
        // ESM-style specifier naming the compiled extension
        assert_eq!(index.lookup("../utils/helper.js", &button), Some(MoveId(0)));
        assert_eq!(index.lookup("./utils/helper", &button), None);
        assert_eq!(index.lookup("../utils/helpers", &button), None);
    }

    #[test]
    fn test_lookup_aliased_literal() {
        let g = generator();
        let index = ReferenceIndex::build(
            &moves(
                &g,
                &[(
                    "/repo/packages/main/src/utils/helper.ts",
                    "/repo/packages/main/src/shared/helper.ts",
                )],
            ),
            &g,
        );
        let card = PathBuf::from("/repo/packages/other/src/components/Card.ts");
        assert_eq!(index.lookup("@alias/main/lib/utils/helper", &card), Some(MoveId(0)));
        assert_eq!(index.lookup("@alias/main/lib/helper", &card), None);
        assert_eq!(index.lookup("other-lib/utils/helper", &card), None);
    }

    #[test]
    fn test_lookup_index_directory() {
        let g = generator();
        let index = ReferenceIndex::build(
            &moves(
                &g,
                &[(
                    "/repo/packages/main/src/foo/index.ts",
                    "/repo/packages/main/src/bar/index.ts",
                )],
            ),
            &g,
        );
        let app = PathBuf::from("/repo/packages/main/src/app.ts");
        assert_eq!(index.lookup("./foo", &app), Some(MoveId(0)));
        assert_eq!(index.lookup("./foo/index", &app), Some(MoveId(0)));
        assert_eq!(index.lookup("@alias/main/lib/foo", &app), Some(MoveId(0)));
    }

    #[test]
    fn test_collision_keeps_first_move() {
        let g = generator();
        let index = ReferenceIndex::build(
            &moves(
                &g,
                &[
                    ("/repo/packages/main/src/foo.ts", "/repo/packages/main/src/a/foo.ts"),
                    ("/repo/packages/main/src/foo.tsx", "/repo/packages/main/src/b/foo.tsx"),
                ],
            ),
            &g,
        );
        let app = PathBuf::from("/repo/packages/main/src/app.ts");
        assert_eq!(index.lookup("./foo", &app), Some(MoveId(0)));
        assert_eq!(index.lookup("./foo.tsx", &app), Some(MoveId(1)));
        assert!(!index.collisions().is_empty());
        assert!(index
            .collisions()
            .iter()
            .all(|c| c.kept == MoveId(0) && c.dropped == MoveId(1)));
    }

    #[test]
    fn test_empty_batch() {
        let g = generator();
        let index = ReferenceIndex::build(&[], &g);
        assert!(index.is_empty());
        assert_eq!(index.lookup("./a", Path::new("/repo/x.ts")), None);
    }
}
