use crate::extract::{IssueExtraction, IssueStats};
use crate::locator::Strategy;
use crate::review::FlagRecord;
use crate::toc::IssueSpec;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Longest filename component built from a title.
const MAX_FILENAME_LEN: usize = 80;

/// Reduce a title/author string to a safe filename component.
///
/// Reserved filesystem characters are dropped, separator runs collapse to a
/// single underscore, and the result is clipped to [`MAX_FILENAME_LEN`].
pub fn sanitize_filename(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_separator = false;
    for ch in s.trim().chars() {
        match ch {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => {}
            c if c.is_whitespace() || "-,;.!'()".contains(c) => pending_separator = true,
            c => {
                if pending_separator && !out.is_empty() {
                    out.push('_');
                }
                pending_separator = false;
                out.push(c);
            }
        }
    }
    if out.len() > MAX_FILENAME_LEN {
        let mut end = MAX_FILENAME_LEN;
        while !out.is_char_boundary(end) {
            end -= 1;
        }
        out.truncate(end);
        while out.ends_with('_') {
            out.pop();
        }
    }
    out
}

/// One row of the run-wide manifest.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestRow {
    pub file: String,
    pub path: String,
    pub volume: String,
    pub month: String,
    pub etype: String,
    pub title: String,
    pub author: String,
    pub strategy: String,
}

/// One month's slice of a volume JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct MonthDoc {
    pub month: String,
    pub year: u16,
    pub source_file: String,
    pub entries: Vec<crate::entry::EntryRecord>,
    pub toc: Option<String>,
    pub ads: Option<String>,
    pub misc: Option<String>,
}

/// Per-volume JSON document of full entry records.
#[derive(Debug, Clone, Serialize)]
pub struct VolumeDoc {
    pub volume: String,
    pub months: Vec<MonthDoc>,
}

/// A flag record tagged with the month it came from, for the per-volume
/// review file.
#[derive(Debug, Clone, Serialize)]
pub struct VolumeFlag {
    pub month: String,
    #[serde(flatten)]
    pub flag: FlagRecord,
}

/// Run-wide statistics, written as JSON at the end of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub issues_processed: usize,
    pub issues_failed: usize,
    pub entries_matched: usize,
    pub entries_flagged: usize,
    pub total_bytes: usize,
    pub misc_bytes: usize,
    pub coverage_pct: f64,
    pub issues: Vec<IssueStatsRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueStatsRow {
    pub volume: String,
    pub issue: String,
    pub month: String,
    pub coverage_pct: f64,
    #[serde(flatten)]
    pub stats: IssueStats,
}

impl RunStats {
    /// Fold one issue's counters into the run totals.
    pub fn record_issue(&mut self, spec: &IssueSpec, stats: &IssueStats) {
        self.issues_processed += 1;
        self.entries_matched += stats.entries_matched;
        self.entries_flagged += stats.flagged;
        self.total_bytes += stats.total_bytes;
        self.misc_bytes += stats.misc_bytes;
        self.coverage_pct = if self.total_bytes == 0 {
            0.0
        } else {
            (self.total_bytes - self.misc_bytes) as f64 / self.total_bytes as f64 * 100.0
        };
        self.issues.push(IssueStatsRow {
            volume: spec.volume.clone(),
            issue: spec.issue.clone(),
            month: spec.month.clone(),
            coverage_pct: stats.coverage_pct(),
            stats: stats.clone(),
        });
    }
}

/// Writes extraction results into the output directory tree.
///
/// Layout: `<out>/<volume>/<month>/` holds per-entry content files plus
/// `TOC.txt` / `ADS.txt` / `MISC.txt`; `<out>/<volume>/` holds the volume
/// JSON and review file; the manifest CSV sits at the output root.
pub struct OutputWriter {
    out_dir: PathBuf,
    dry_run: bool,
}

impl OutputWriter {
    pub fn new(out_dir: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            out_dir: out_dir.into(),
            dry_run,
        }
    }

    /// Write one issue's content files. Returns the manifest rows for every
    /// file written (or that would be written, under dry run).
    pub async fn write_issue(
        &self,
        spec: &IssueSpec,
        extraction: &IssueExtraction,
    ) -> Result<Vec<ManifestRow>> {
        let issue_dir = self.out_dir.join(&spec.volume).join(&spec.month);
        let rel_dir = format!("{}/{}", spec.volume, spec.month);
        if !self.dry_run {
            fs::create_dir_all(&issue_dir)
                .await
                .with_context(|| format!("Failed to create {}", issue_dir.display()))?;
        }

        let mut rows = Vec::new();

        for record in &extraction.entries {
            // Unmatched entries have no content files
            let Some(index) = record.index else { continue };
            let title_safe = sanitize_filename(&record.title);

            for strategy in Strategy::ALL {
                let matched = match strategy {
                    Strategy::Strict => record.strict_match.as_ref(),
                    Strategy::Loose => record.loose_match.as_ref(),
                };
                let Some(matched) = matched else { continue };
                if matched.content.is_empty() {
                    continue;
                }

                let filename = format!("{index:02}_{strategy}_{title_safe}.txt");
                self.write_file(&issue_dir.join(&filename), &matched.content)
                    .await?;
                rows.push(ManifestRow {
                    file: filename,
                    path: rel_dir.clone(),
                    volume: spec.volume.clone(),
                    month: spec.month.clone(),
                    etype: record.etype.as_str().to_string(),
                    title: record.title.clone(),
                    author: record.author.clone().unwrap_or_default(),
                    strategy: strategy.to_string(),
                });
            }
        }

        let sections = [
            ("TOC.txt", "toc", "TOC", &extraction.toc_text),
            ("ADS.txt", "ads", "ADS", &extraction.ads_text),
            ("MISC.txt", "misc", "MISC", &extraction.misc_text),
        ];
        for (filename, etype, title, content) in sections {
            let Some(content) = content else { continue };
            self.write_file(&issue_dir.join(filename), content).await?;
            rows.push(ManifestRow {
                file: filename.to_string(),
                path: rel_dir.clone(),
                volume: spec.volume.clone(),
                month: spec.month.clone(),
                etype: etype.to_string(),
                title: title.to_string(),
                author: String::new(),
                strategy: String::new(),
            });
        }

        debug!(issue = %spec.label(), files = rows.len(), "Issue files written");
        Ok(rows)
    }

    /// Write one volume's entries JSON document.
    pub async fn write_volume_json(&self, doc: &VolumeDoc) -> Result<PathBuf> {
        let path = self
            .out_dir
            .join(&doc.volume)
            .join(format!("{}_entries.json", doc.volume));
        let json = serde_json::to_string_pretty(doc)?;
        self.write_file(&path, &json).await?;
        info!("Volume JSON written: {}", path.display());
        Ok(path)
    }

    /// Write one volume's review file; skipped when there are no flags.
    pub async fn write_flagged_json(
        &self,
        volume: &str,
        flags: &[VolumeFlag],
    ) -> Result<Option<PathBuf>> {
        if flags.is_empty() {
            return Ok(None);
        }
        let path = self.out_dir.join(volume).join("flagged_for_review.json");
        let json = serde_json::to_string_pretty(flags)?;
        self.write_file(&path, &json).await?;
        info!(
            "Flagged for review: {} ({} entries with title not at start)",
            path.display(),
            flags.len()
        );
        Ok(Some(path))
    }

    /// Write the run-wide manifest CSV.
    pub fn write_manifest_csv(&self, rows: &[ManifestRow]) -> Result<PathBuf> {
        let path = self.out_dir.join("manifest.csv");
        if self.dry_run {
            return Ok(path);
        }
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create manifest: {}", path.display()))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!("Manifest written: {} ({} rows)", path.display(), rows.len());
        Ok(path)
    }

    /// Write run statistics JSON to the given path.
    pub async fn write_run_stats(&self, path: &Path, stats: &RunStats) -> Result<()> {
        let json = serde_json::to_string_pretty(stats)?;
        self.write_file(path, &json).await?;
        Ok(())
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_reserved_characters() {
        assert_eq!(sanitize_filename("Who? What: \"Why\""), "Who_What_Why");
        assert_eq!(sanitize_filename("a/b\\c|d*e"), "abcde");
    }

    #[test]
    fn test_sanitize_collapses_separators() {
        assert_eq!(
            sanitize_filename("Tch! Tch! Grandma!"),
            "Tch_Tch_Grandma"
        );
        assert_eq!(
            sanitize_filename("Wist Ye Not That I Must Be"),
            "Wist_Ye_Not_That_I_Must_Be"
        );
        assert_eq!(sanitize_filename("Work-and-Business"), "Work_and_Business");
    }

    #[test]
    fn test_sanitize_clips_long_titles() {
        let long = "Word ".repeat(40);
        let sanitized = sanitize_filename(&long);
        assert!(sanitized.len() <= 80);
        assert!(!sanitized.ends_with('_'));
    }

    #[test]
    fn test_sanitize_no_leading_or_trailing_underscores() {
        assert_eq!(sanitize_filename("  (Gifts)  "), "Gifts");
        assert_eq!(sanitize_filename("A New Heart and a New Spirit"), "A_New_Heart_and_a_New_Spirit");
    }

    #[test]
    fn test_sanitize_clip_respects_char_boundary() {
        let long = "é".repeat(90);
        let sanitized = sanitize_filename(&long);
        assert!(sanitized.len() <= 80);
        assert!(sanitized.chars().all(|c| c == 'é'));
    }
}
