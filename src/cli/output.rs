use serde::Serialize;

use super::OutputFormat;
use crate::relocate::{BatchReport, MoveStatus};

/// Format any serializable value as JSON.
pub fn format_json<T: Serialize>(value: &T, format: OutputFormat) -> String {
    match format {
        OutputFormat::Compact => serde_json::to_string(value).unwrap_or_default(),
        OutputFormat::Json | OutputFormat::Text => {
            serde_json::to_string_pretty(value).unwrap_or_default()
        }
    }
}

/// Format a batch report. Per-reference diagnostics only appear when `verbose`.
pub fn format_report(report: &BatchReport, format: OutputFormat, verbose: bool) -> String {
    if !matches!(format, OutputFormat::Text) {
        if verbose {
            return format_json(report, format);
        }
        let mut trimmed = report.clone();
        for outcome in &mut trimmed.moves {
            outcome.diagnostics.clear();
        }
        return format_json(&trimmed, format);
    }

    let mut output = String::new();
    if report.dry_run {
        output.push_str("Dry run: no files were changed\n");
    }

    for outcome in &report.moves {
        match outcome.status {
            MoveStatus::Applied => {
                output.push_str(&format!(
                    "moved  {} -> {} ({} files, {} references updated)\n",
                    outcome.from.display(),
                    outcome.to.display(),
                    outcome.files_updated,
                    outcome.references_updated,
                ));
                if verbose {
                    for d in &outcome.diagnostics {
                        output.push_str(&format!(
                            "         {}:{} [{}] '{}' -> '{}'\n",
                            d.file.display(),
                            d.line,
                            d.direction,
                            d.old_literal,
                            d.new_literal,
                        ));
                    }
                }
            }
            MoveStatus::Failed => {
                output.push_str(&format!(
                    "FAILED {} -> {}: {}\n",
                    outcome.from.display(),
                    outcome.to.display(),
                    outcome.error.as_deref().unwrap_or("unknown error"),
                ));
            }
        }
    }

    if !report.dead_files.is_empty() {
        output.push_str("\nNo references found to (possibly dead):\n");
        for file in &report.dead_files {
            output.push_str(&format!("  {}\n", file.display()));
        }
    }

    if !report.warnings.is_empty() {
        output.push_str(&format!("\nWarnings ({}):\n", report.warnings.len()));
        for w in &report.warnings {
            let location = match (&w.file, w.line) {
                (Some(file), Some(line)) => format!("{}:{}: ", file.display(), line),
                (Some(file), None) => format!("{}: ", file.display()),
                _ => String::new(),
            };
            output.push_str(&format!("  [{}] {}{}\n", w.kind.as_str(), location, w.message));
        }
    }

    output.push_str(&format!(
        "\n{} of {} moves applied, {} files updated",
        report.applied(),
        report.moves.len(),
        report.files_updated(),
    ));
    output
}
