//! Batch orchestration: validate moves, find references, rewrite, move.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::cache::FileCache;
use crate::config::ProjectLayout;
use crate::fs::{prune_empty_dirs, FileSystem};
use crate::model::{FileMove, ImportReference, MoveDirection, MoveId};
use crate::parser::{ReferenceScanner, ScanError};
use crate::resolver::address::AddressFormGenerator;
use crate::resolver::classify::ModuleClassifier;
use crate::resolver::index::ReferenceIndex;
use crate::resolver::{normalize_path, path_key, resolve_relative};
use crate::rewrite::{
    LiteralEdit, PathRewriter, Rewrite, RewriteRequest, RewriteTarget, SkipReason, SpanShifts,
};

pub mod batch;
pub mod report;

pub use batch::{MoveError, MoveRequest};
pub use report::{
    BatchReport, MoveOutcome, MoveStatus, ReferenceDiagnostic, Warning, WarningKind,
};

use batch::{BatchPlan, Step};

/// Moves files and rewrites every import that addresses them.
pub struct Relocator {
    rewriter: PathRewriter,
    fs: Arc<dyn FileSystem>,
    scanner: Arc<dyn ReferenceScanner>,
    dry_run: bool,
}

impl Relocator {
    pub fn new(
        layout: ProjectLayout,
        fs: Arc<dyn FileSystem>,
        scanner: Arc<dyn ReferenceScanner>,
    ) -> Self {
        let forms = AddressFormGenerator::new(ModuleClassifier::new(layout));
        Self {
            rewriter: PathRewriter::new(forms),
            fs,
            scanner,
            dry_run: false,
        }
    }

    /// Compute everything, write nothing.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn layout(&self) -> &ProjectLayout {
        self.rewriter.forms().layout()
    }

    /// Run one batch.
    ///
    /// `candidates` are the files whose references are scanned (see
    /// `discovery::discover_files`); moved source files are always scanned
    /// as well. Per-move failures end up in the report, never as an `Err`.
    pub fn run(&self, requests: &[MoveRequest], candidates: &[PathBuf]) -> BatchReport {
        let layout = self.layout();
        let plan = batch::plan(
            requests,
            &layout.root,
            self.fs.as_ref(),
            layout.config.source_extensions.clone(),
        );

        let mut batch = BatchContext::new(self, plan);
        let scanned = batch.scan(candidates);
        for (file, references) in scanned {
            for reference in references.iter() {
                batch.plan_reference(&file, reference);
            }
        }
        batch.execute();
        batch.finish()
    }
}

/// State of one batch run, discarded when the run ends.
struct BatchContext<'r> {
    relocator: &'r Relocator,
    plan: BatchPlan,
    moves: Vec<FileMove>,
    index: ReferenceIndex,
    cache: FileCache,
    /// Pending edits per move, then per file (keyed by pre-batch path).
    edits: BTreeMap<MoveId, BTreeMap<PathBuf, Vec<LiteralEdit>>>,
    edit_slots: HashMap<(PathBuf, String), (MoveId, usize)>,
    /// Replacements already made per file, keyed like `edits`.
    shifts: HashMap<PathBuf, SpanShifts>,
    diagnostics: HashMap<MoveId, Vec<ReferenceDiagnostic>>,
    /// References to each chain from files other than the moved file itself.
    inbound: HashMap<MoveId, usize>,
    failed: HashSet<MoveId>,
    report: BatchReport,
}

impl<'r> BatchContext<'r> {
    fn new(relocator: &'r Relocator, plan: BatchPlan) -> Self {
        let classifier = relocator.rewriter.forms().classifier();
        let moves: Vec<FileMove> = plan
            .ready()
            .map(|(id, from, to)| FileMove {
                id,
                from: classifier.classify(from),
                to: classifier.classify(to),
            })
            .collect();

        // Later links of a chain start at a path that did not exist before the batch
        let chain_starts: Vec<FileMove> = moves
            .iter()
            .filter(|m| plan.move_map.is_chain_start(m.id))
            .cloned()
            .collect();
        let index = ReferenceIndex::build(&chain_starts, relocator.rewriter.forms());
        tracing::debug!(moves = moves.len(), forms = index.len(), "built reference index");

        let mut batch = Self {
            relocator,
            plan,
            moves,
            index,
            cache: FileCache::new(Arc::clone(&relocator.fs), Arc::clone(&relocator.scanner)),
            edits: BTreeMap::new(),
            edit_slots: HashMap::new(),
            shifts: HashMap::new(),
            diagnostics: HashMap::new(),
            inbound: HashMap::new(),
            failed: HashSet::new(),
            report: BatchReport {
                dry_run: relocator.dry_run,
                ..Default::default()
            },
        };

        let collisions = batch.index.collisions().to_vec();
        for collision in collisions {
            let kept = batch.display(batch.plan.move_map.source_of(collision.kept));
            let dropped = batch.display(batch.plan.move_map.source_of(collision.dropped));
            batch.warn(
                Warning::new(
                    WarningKind::IndexCollision,
                    format!(
                        "'{}' addresses both {} and {}; references resolve to the first",
                        collision.form,
                        kept.display(),
                        dropped.display()
                    ),
                )
                .at(dropped, None),
            );
        }

        batch
    }

    fn display(&self, path: &Path) -> PathBuf {
        let root = &self.relocator.layout().root;
        path.strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    fn warn(&mut self, warning: Warning) {
        tracing::warn!(
            kind = warning.kind.as_str(),
            file = ?warning.file,
            line = ?warning.line,
            "{}",
            warning.message
        );
        self.report.warnings.push(warning);
    }

    /// Scan every candidate and every moved source file, in parallel.
    fn scan(&mut self, candidates: &[PathBuf]) -> Vec<(PathBuf, Arc<Vec<ImportReference>>)> {
        let root = &self.relocator.layout().root;
        let scanner = &self.relocator.scanner;
        let mut files: BTreeSet<PathBuf> = candidates
            .iter()
            .map(|c| normalize_path(&root.join(c)))
            .collect();
        files.extend(
            self.moves
                .iter()
                .filter(|m| self.plan.move_map.is_chain_start(m.id))
                .map(|m| m.from.path.clone())
                .filter(|path| scanner.supports(path)),
        );
        let files: Vec<PathBuf> = files.into_iter().collect();

        let cache = &self.cache;
        let results: Vec<(PathBuf, Result<Arc<Vec<ImportReference>>, ScanError>)> = files
            .par_iter()
            .map(|file| (file.clone(), cache.parsed(file)))
            .collect();

        let mut scanned = Vec::with_capacity(results.len());
        for (file, result) in results {
            match result {
                Ok(references) => scanned.push((file, references)),
                Err(error) => {
                    let (kind, line) = match &error {
                        ScanError::Io { .. } => (WarningKind::Io, None),
                        ScanError::Syntax { line, .. } => (WarningKind::ParseFailure, Some(*line)),
                        _ => (WarningKind::ParseFailure, None),
                    };
                    let file = self.display(&file);
                    self.warn(
                        Warning::new(kind, format!("skipped: {}", error)).at(file, line),
                    );
                }
            }
        }
        tracing::info!(files = scanned.len(), "scanned candidate files");
        scanned
    }

    /// Does the whole chain of `id` cross a boundary references cannot follow?
    fn chain_direction(&self, id: MoveId) -> MoveDirection {
        let move_map = &self.plan.move_map;
        let destination = move_map.resolve(move_map.destination_of(id));
        self.relocator
            .rewriter
            .forms()
            .classifier()
            .direction_between(move_map.source_of(id), &destination)
    }

    /// Decide what, if anything, one scanned reference becomes.
    fn plan_reference(&mut self, file: &Path, reference: &ImportReference) {
        let move_map = &self.plan.move_map;

        let (id, target) = if let Some(id) = self.index.lookup(&reference.literal, file) {
            let source = move_map.source_of(id).to_path_buf();
            if source != file {
                *self.inbound.entry(id).or_default() += 1;
            }
            let destination = move_map.resolve(move_map.destination_of(id));
            (
                id,
                RewriteTarget::Moved {
                    original: source,
                    destination,
                },
            )
        } else {
            // The containing file moves; references to files that stay put must follow
            let Some(id) = move_map.first_move_of(file) else {
                return;
            };
            let Some(resolved) = self.resolve_fixed(file, reference) else {
                return;
            };
            (id, RewriteTarget::Fixed(resolved))
        };

        if self.chain_direction(id) == MoveDirection::UnsupportedBoundary {
            let source = self.display(self.plan.move_map.source_of(id));
            let display = self.display(file);
            self.warn(
                Warning::new(
                    WarningKind::UnsupportedBoundary,
                    format!(
                        "'{}' left unchanged: moving {} crosses a module boundary, update it manually",
                        reference.literal,
                        source.display()
                    ),
                )
                .at(display, Some(reference.line)),
            );
            return;
        }

        let referencing = self.plan.move_map.resolve(file);
        let rewrite = self.relocator.rewriter.compute(&RewriteRequest {
            literal: &reference.literal,
            referencing_file: &referencing,
            target,
        });

        match rewrite {
            Rewrite::Replace { literal, direction } => {
                tracing::debug!(
                    file = %file.display(),
                    line = reference.line,
                    old = %reference.literal,
                    new = %literal,
                    %direction,
                    "rewriting reference"
                );
                let diagnostic = ReferenceDiagnostic {
                    file: self.display(&referencing),
                    line: reference.line,
                    statement: reference.statement.clone(),
                    old_literal: reference.literal.clone(),
                    new_literal: literal.clone(),
                    direction,
                };
                self.diagnostics.entry(id).or_default().push(diagnostic);
                self.push_edit(id, file, reference, literal);
            }
            Rewrite::Unchanged { direction } => {
                tracing::debug!(
                    file = %file.display(),
                    literal = %reference.literal,
                    %direction,
                    "reference already correct"
                );
            }
            Rewrite::Skipped(SkipReason::UnsupportedBoundary {
                referencing,
                target,
            }) => {
                let display = self.display(file);
                self.warn(
                    Warning::new(
                        WarningKind::UnsupportedBoundary,
                        format!(
                            "'{}' left unchanged: {} code cannot be addressed from {} code automatically",
                            reference.literal, target, referencing
                        ),
                    )
                    .at(display, Some(reference.line)),
                );
            }
            Rewrite::Skipped(SkipReason::NoAlias(path)) => {
                let display = self.display(file);
                let target = self.display(&path);
                self.warn(
                    Warning::new(
                        WarningKind::NoAlias,
                        format!(
                            "'{}' left unchanged: {} has no aliased form",
                            reference.literal,
                            target.display()
                        ),
                    )
                    .at(display, Some(reference.line)),
                );
            }
        }
    }

    /// One edit per distinct literal per file; further occurrences add their spans.
    fn push_edit(&mut self, id: MoveId, file: &Path, reference: &ImportReference, new: String) {
        let key = (file.to_path_buf(), reference.literal.clone());
        if let Some(&(slot_move, slot)) = self.edit_slots.get(&key) {
            if let Some(edit) = self
                .edits
                .get_mut(&slot_move)
                .and_then(|files| files.get_mut(file))
                .and_then(|edits| edits.get_mut(slot))
            {
                edit.spans.push(reference.span.clone());
            }
            return;
        }

        let file_edits = self
            .edits
            .entry(id)
            .or_default()
            .entry(file.to_path_buf())
            .or_default();
        file_edits.push(LiteralEdit {
            old: reference.literal.clone(),
            new,
            spans: vec![reference.span.clone()],
        });
        self.edit_slots.insert(key, (id, file_edits.len() - 1));
    }

    /// Where a reference from a moving file points, if it addresses a
    /// project file: relative literals as written, aliased literals through
    /// the first package root that has a matching file.
    fn resolve_fixed(&mut self, file: &Path, reference: &ImportReference) -> Option<PathBuf> {
        if !reference.is_relative() {
            let forms = self.relocator.rewriter.forms();
            return forms
                .unaliased_candidates(&reference.literal)
                .into_iter()
                .find(|candidate| self.target_exists(candidate));
        }

        let resolved = resolve_relative(&reference.literal, file);
        if !self.target_exists(&resolved) {
            let display = self.display(file);
            self.warn(
                Warning::new(
                    WarningKind::Unresolved,
                    format!("'{}' does not resolve to an existing file", reference.literal),
                )
                .at(display, Some(reference.line)),
            );
        }
        Some(resolved)
    }

    /// A resolved literal may name a file with or without its
    /// extension, or a directory holding an index file.
    fn target_exists(&self, resolved: &Path) -> bool {
        let fs = &self.relocator.fs;
        if fs.exists(resolved) && !fs.is_dir(resolved) {
            return true;
        }
        let config = &self.relocator.layout().config;
        let key = path_key(resolved);
        let with_extension = config
            .source_extensions
            .iter()
            .any(|ext| fs.exists(Path::new(&format!("{}.{}", key, ext))));
        with_extension
            || config.index_names.iter().any(|name| {
                config
                    .source_extensions
                    .iter()
                    .any(|ext| fs.exists(&resolved.join(format!("{}.{}", name, ext))))
            })
    }

    /// Perform the moves in order, applying each move's edits right after it.
    fn execute(&mut self) {
        let steps = std::mem::take(&mut self.plan.steps);
        for step in steps {
            match step {
                Step::Rejected { from, to, error } => {
                    let outcome =
                        MoveOutcome::failed(self.display(&from), self.display(&to), error.to_string());
                    self.report.moves.push(outcome);
                }
                Step::Ready { id, from, to } => {
                    let outcome = self.execute_move(id, &from, &to);
                    self.report.moves.push(outcome);
                }
            }
        }

        if !self.relocator.dry_run {
            let dirs = std::mem::take(&mut self.plan.vacated_dirs);
            for dir in dirs {
                if let Err(e) = prune_empty_dirs(self.relocator.fs.as_ref(), &dir) {
                    let display = self.display(&dir);
                    self.warn(
                        Warning::new(WarningKind::Io, format!("could not remove emptied directory: {}", e))
                            .at(display, None),
                    );
                }
            }
        }
    }

    fn execute_move(&mut self, id: MoveId, from: &Path, to: &Path) -> MoveOutcome {
        let mut outcome = MoveOutcome::applied(self.display(from), self.display(to));
        let fs = Arc::clone(&self.relocator.fs);

        if !self.relocator.dry_run {
            let moved = match to.parent() {
                Some(parent) => fs.create_dir_all(parent),
                None => Ok(()),
            }
            .and_then(|_| fs.rename(from, to));
            if let Err(source) = moved {
                let error = MoveError::Io {
                    path: from.to_path_buf(),
                    source,
                };
                tracing::warn!(from = %from.display(), %error, "move failed");
                self.failed.insert(id);
                return MoveOutcome::failed(outcome.from, outcome.to, error.to_string());
            }
        }
        self.cache.rekey(from, to);

        let edits = self.edits.remove(&id).unwrap_or_default();
        for (file, file_edits) in edits {
            let current = self.plan.move_map.resolve_until(&file, id.0 + 1);
            let content = match self.cache.content(&current) {
                Ok(content) => content,
                Err(e) => {
                    let display = self.display(&current);
                    self.warn(
                        Warning::new(WarningKind::Io, format!("could not read: {}", e))
                            .at(display, None),
                    );
                    continue;
                }
            };

            let mut shifts = self.shifts.get(&file).cloned().unwrap_or_default();
            let rewriter = &self.relocator.rewriter;
            let (updated, count) = rewriter.apply_shifted(&content, &file_edits, &mut shifts);
            if count == 0 || updated.as_str() == &*content {
                continue;
            }
            if !self.relocator.dry_run {
                if let Err(e) = fs.write(&current, &updated) {
                    let display = self.display(&current);
                    self.warn(
                        Warning::new(WarningKind::Io, format!("could not write: {}", e))
                            .at(display, None),
                    );
                    continue;
                }
            }
            self.cache.replace_content(&current, updated);
            self.shifts.insert(file, shifts);
            outcome.files_updated += 1;
            outcome.references_updated += count;
        }

        outcome.diagnostics = self.diagnostics.remove(&id).unwrap_or_default();
        tracing::info!(
            from = %outcome.from.display(),
            to = %outcome.to.display(),
            files_updated = outcome.files_updated,
            references_updated = outcome.references_updated,
            "moved"
        );
        outcome
    }

    fn finish(mut self) -> BatchReport {
        let move_map = &self.plan.move_map;
        let mut dead = Vec::new();
        for file_move in &self.moves {
            let id = file_move.id;
            if !move_map.is_chain_start(id) {
                continue;
            }
            let chain = move_map.chain_of(&file_move.from.path);
            if chain.iter().any(|link| self.failed.contains(link)) {
                continue;
            }
            if self.inbound.get(&id).copied().unwrap_or(0) == 0 {
                dead.push(self.display(&move_map.resolve(&file_move.from.path)));
            }
        }
        dead.sort();
        self.report.dead_files = dead;
        self.report
    }
}
