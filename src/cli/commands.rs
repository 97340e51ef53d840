use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{load_project_config, ProjectLayout};
use crate::discovery::{discover_files, DiscoveryConfig};
use crate::fs::OsFileSystem;
use crate::parser::typescript::TypeScriptScanner;
use crate::relocate::{BatchReport, MoveRequest, Relocator};

use super::output::format_report;
use super::{OutputFormat, RunOptions};

/// Move one file or directory.
pub fn run_move(
    options: &RunOptions,
    from: &Path,
    to: &Path,
    format: OutputFormat,
) -> Result<(String, BatchReport)> {
    let requests = vec![MoveRequest::new(from, to)];
    run_requests(options, &requests, format)
}

/// Apply every move listed in a JSON batch file, in order.
pub fn run_batch(
    options: &RunOptions,
    batch_file: &Path,
    format: OutputFormat,
) -> Result<(String, BatchReport)> {
    let content = if batch_file == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read batch from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(batch_file)
            .with_context(|| format!("Failed to read {}", batch_file.display()))?
    };
    let requests = parse_batch(&content)
        .with_context(|| format!("Invalid batch file {}", batch_file.display()))?;
    run_requests(options, &requests, format)
}

/// Parse a JSON batch: an array of `{ "from": ..., "to": ... }` objects.
pub fn parse_batch(content: &str) -> Result<Vec<MoveRequest>> {
    let requests: Vec<MoveRequest> = serde_json::from_str(content)?;
    if requests.is_empty() {
        anyhow::bail!("batch contains no moves");
    }
    Ok(requests)
}

fn run_requests(
    options: &RunOptions,
    requests: &[MoveRequest],
    format: OutputFormat,
) -> Result<(String, BatchReport)> {
    let root = options
        .root
        .canonicalize()
        .with_context(|| format!("Project root not found: {}", options.root.display()))?;
    let config = load_project_config(&root, options.config.as_deref())?;

    let discovery = DiscoveryConfig {
        include: options.include.clone(),
        exclude: options.exclude.clone(),
        extensions: config.source_extensions.clone(),
    };
    let candidates = discover_files(&root, &discovery)?;

    let scanner = Arc::new(TypeScriptScanner::new(&config));
    let relocator = Relocator::new(ProjectLayout::new(&root, config), Arc::new(OsFileSystem), scanner)
        .with_dry_run(options.dry_run);
    let report = relocator.run(requests, &candidates);

    let output = format_report(&report, format, options.verbose);
    Ok((output, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_batch() {
        let requests = parse_batch(
            r#"[
                {"from": "packages/main/src/a.ts", "to": "packages/main/src/b.ts"},
                {"from": "packages/main/src/dir", "to": "packages/shared/src/dir"}
            ]"#,
        )
        .unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].to, PathBuf::from("packages/shared/src/dir"));
    }

    #[test]
    fn test_malformed_batch_is_an_error() {
        assert!(parse_batch("{}").is_err());
        assert!(parse_batch(r#"[{"from": "a.ts"}]"#).is_err());
        assert!(parse_batch("[]").is_err());
    }
}
