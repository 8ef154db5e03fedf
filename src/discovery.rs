use crate::toc::TocManifest;
use anyhow::{anyhow, Result};
use glob::glob;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Configuration for issue file discovery behavior.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryConfig {
    /// Whether to fail fast on the first unresolvable issue or continue.
    pub fail_fast: bool,
}

/// Result of resolving one manifest issue to a source file.
#[derive(Debug, Clone)]
pub struct IssueFile {
    /// Index of the issue in the manifest.
    pub spec_index: usize,
    /// Resolved path, when the file was found.
    pub path: Option<PathBuf>,
    pub error: Option<String>,
}

/// Resolve every manifest issue to its source text file under `root_dir`.
///
/// Each issue's `source_file` is tried directly under the root first, then
/// located with a recursive glob so volume subdirectories work without
/// configuration. Missing or unreadable files become error records (or abort
/// the run under `fail_fast`).
pub async fn resolve_issue_files(
    root_dir: impl AsRef<Path>,
    manifest: &TocManifest,
    config: DiscoveryConfig,
) -> Result<Vec<IssueFile>> {
    let root = root_dir.as_ref();
    let mut files = Vec::with_capacity(manifest.issues.len());

    for (spec_index, issue) in manifest.issues.iter().enumerate() {
        match resolve_one(root, &issue.source_file).await {
            Ok(path) => {
                debug!(issue = %issue.label(), path = %path.display(), "Issue file resolved");
                files.push(IssueFile {
                    spec_index,
                    path: Some(path),
                    error: None,
                });
            }
            Err(e) => {
                let error = format!("{} ({}): {e}", issue.label(), issue.source_file);
                warn!("{}", error);
                if config.fail_fast {
                    return Err(anyhow!(error));
                }
                files.push(IssueFile {
                    spec_index,
                    path: None,
                    error: Some(error),
                });
            }
        }
    }

    let found = files.iter().filter(|f| f.path.is_some()).count();
    info!(
        "Issue discovery complete: {} of {} source files found",
        found,
        files.len()
    );
    Ok(files)
}

async fn resolve_one(root: &Path, source_file: &str) -> Result<PathBuf> {
    let direct = root.join(source_file);
    if is_readable_file(&direct).await {
        return Ok(direct);
    }

    // WHY: issue files are commonly nested one level per volume; a recursive
    // glob finds them without encoding the directory layout in the manifest
    let pattern = format!("{}/**/{}", root.display(), source_file);
    for candidate in glob(&pattern)?.flatten() {
        if is_readable_file(&candidate).await {
            return Ok(candidate);
        }
    }

    Err(anyhow!("source file not found under {}", root.display()))
}

async fn is_readable_file(path: &Path) -> bool {
    match fs::metadata(path).await {
        Ok(metadata) => metadata.is_file(),
        Err(_) => false,
    }
}
