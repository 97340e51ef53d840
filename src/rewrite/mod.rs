use std::ops::Range;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::model::{ModuleKind, MoveDirection};
use crate::resolver::address::AddressFormGenerator;
use crate::resolver::{literal_extension, relative_literal, strip_source_extension, to_slash};

/// What a reference should point at once the batch has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteTarget {
    /// The reference addressed a moved file. `destination` is the final
    /// location after following every chained move.
    Moved {
        original: PathBuf,
        destination: PathBuf,
    },
    /// The reference addresses a file that stays put; the path is the
    /// literal resolved as written (extension and directory style kept).
    Fixed(PathBuf),
}

/// One reference to recompute.
#[derive(Debug, Clone)]
pub struct RewriteRequest<'a> {
    pub literal: &'a str,
    /// Final location of the file containing the reference.
    pub referencing_file: &'a Path,
    pub target: RewriteTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedBoundary {
        referencing: ModuleKind,
        target: ModuleKind,
    },
    /// Cross-package reference to a file outside any package source folder.
    NoAlias(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    Replace {
        literal: String,
        direction: MoveDirection,
    },
    Unchanged {
        direction: MoveDirection,
    },
    Skipped(SkipReason),
}

/// A literal substitution to perform in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralEdit {
    pub old: String,
    pub new: String,
    /// Where the scanner found the old literal, quotes included.
    pub spans: Vec<Range<usize>>,
}

/// Computes replacement literals and applies them to file content.
#[derive(Debug, Clone)]
pub struct PathRewriter {
    forms: AddressFormGenerator,
}

impl PathRewriter {
    pub fn new(forms: AddressFormGenerator) -> Self {
        Self { forms }
    }

    pub fn forms(&self) -> &AddressFormGenerator {
        &self.forms
    }

    /// Compute the literal a reference should carry after the batch.
    pub fn compute(&self, request: &RewriteRequest) -> Rewrite {
        let target = match &request.target {
            RewriteTarget::Moved {
                original,
                destination,
            } => self.styled_destination(request.literal, original, destination),
            RewriteTarget::Fixed(path) => path.clone(),
        };

        let classifier = self.forms.classifier();
        let referencing = classifier.classify(request.referencing_file);
        let target_address = classifier.classify(&target);
        let direction = classifier.direction(&referencing, &target_address);

        let literal = match direction {
            MoveDirection::SameModule => {
                let from_dir = request.referencing_file.parent().unwrap_or(Path::new("/"));
                relative_literal(from_dir, &target)
            }
            MoveDirection::CrossModule => match self.forms.aliased_form(&target) {
                Some(alias) => alias,
                None => return Rewrite::Skipped(SkipReason::NoAlias(target)),
            },
            MoveDirection::UnsupportedBoundary => {
                return Rewrite::Skipped(SkipReason::UnsupportedBoundary {
                    referencing: referencing.kind,
                    target: target_address.kind,
                })
            }
        };

        if literal == request.literal {
            Rewrite::Unchanged { direction }
        } else {
            Rewrite::Replace { literal, direction }
        }
    }

    /// The path a rewritten literal should spell out for a moved file,
    /// keeping the addressing style of the original literal.
    fn styled_destination(&self, literal: &str, original: &Path, destination: &Path) -> PathBuf {
        let layout = self.forms.layout();
        let extensions = &layout.config.source_extensions;

        let last_segment = literal.rsplit('/').next().unwrap_or(literal);
        let names_index = layout.is_index_name(strip_source_extension(last_segment, extensions));
        if self.forms.is_index(destination) && !names_index {
            if let Some(parent) = destination.parent() {
                return parent.to_path_buf();
            }
        }

        let destination_ext = destination.extension().and_then(|e| e.to_str());
        let is_source = destination_ext.is_some_and(|e| layout.is_source_extension(e));
        if !is_source {
            return destination.to_path_buf();
        }

        match literal_extension(literal).filter(|e| layout.is_source_extension(e)) {
            Some(ext) => {
                let original_ext = original.extension().and_then(|e| e.to_str());
                if original_ext == Some(ext) {
                    destination.to_path_buf()
                } else {
                    // `./helper.js` written for `helper.ts`
                    destination.with_extension(ext)
                }
            }
            None => {
                let key = to_slash(destination);
                PathBuf::from(strip_source_extension(&key, extensions))
            }
        }
    }

    /// Apply literal edits to `content` in a single pass.
    ///
    /// Only the scanned spans are touched, and only while each still holds
    /// the old literal in its own quotes, so comments and unrelated strings
    /// stay intact. Returns the new content and the number of spans replaced;
    /// edits whose old and new literals are equal are ignored.
    pub fn apply(&self, content: &str, edits: &[LiteralEdit]) -> (String, usize) {
        self.apply_shifted(content, edits, &mut SpanShifts::default())
    }

    /// Like [`PathRewriter::apply`] for content that earlier calls already
    /// edited: spans are translated through `shifts`, which then records the
    /// replacements made here.
    pub fn apply_shifted(
        &self,
        content: &str,
        edits: &[LiteralEdit],
        shifts: &mut SpanShifts,
    ) -> (String, usize) {
        // (scanned start, current range, replacement)
        let mut replacements: Vec<(usize, Range<usize>, String)> = Vec::new();

        for edit in edits.iter().filter(|e| e.old != e.new) {
            let Some(pattern) = quoted_pattern(&edit.old) else {
                continue;
            };
            for span in &edit.spans {
                if shifts.contains(span.start) {
                    continue;
                }
                let Some(current) = shifts.translate(span) else {
                    continue;
                };
                let Some(token) = content.get(current.clone()) else {
                    continue;
                };
                if !pattern.is_match(token) {
                    continue;
                }
                let quote = &token[..1];
                replacements.push((
                    span.start,
                    current,
                    format!("{}{}{}", quote, edit.new, quote),
                ));
            }
        }

        replacements.sort_by_key(|(_, current, _)| current.start);

        let mut output = String::with_capacity(content.len());
        let mut cursor = 0;
        let mut applied = 0;
        for (scanned, current, replacement) in replacements {
            if current.start < cursor {
                continue;
            }
            output.push_str(&content[cursor..current.start]);
            output.push_str(&replacement);
            cursor = current.end;
            applied += 1;
            shifts.record(scanned, replacement.len() as isize - current.len() as isize);
        }
        output.push_str(&content[cursor..]);

        (output, applied)
    }
}

/// Offset bookkeeping for a file that receives edits from several moves.
///
/// Spans stay in the coordinates of the content that was scanned; each
/// replacement shifts every span that starts after it.
#[derive(Debug, Clone, Default)]
pub struct SpanShifts {
    applied: Vec<(usize, isize)>,
}

impl SpanShifts {
    fn contains(&self, scanned_start: usize) -> bool {
        self.applied.iter().any(|(start, _)| *start == scanned_start)
    }

    fn translate(&self, span: &Range<usize>) -> Option<Range<usize>> {
        let delta: isize = self
            .applied
            .iter()
            .filter(|(start, _)| *start < span.start)
            .map(|(_, delta)| delta)
            .sum();
        Some(span.start.checked_add_signed(delta)?..span.end.checked_add_signed(delta)?)
    }

    fn record(&mut self, scanned_start: usize, delta: isize) {
        self.applied.push((scanned_start, delta));
    }
}

/// Matches exactly one quoted occurrence of `literal`.
fn quoted_pattern(literal: &str) -> Option<Regex> {
    let old = regex::escape(literal);
    let pattern = format!(r#"^(?:'{old}'|"{old}"|`{old}`)$"#, old = old);
    match Regex::new(&pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!(literal = %literal, error = %e, "could not build substitution pattern");
            None
        }
    }
}
