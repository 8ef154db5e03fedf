use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Classification of a TOC entry, as supplied by the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Article,
    Fiction,
    Poem,
    Editorial,
    Lesson,
    Report,
    Letter,
    FrontMatter,
    Misc,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Article => "article",
            EntryType::Fiction => "fiction",
            EntryType::Poem => "poem",
            EntryType::Editorial => "editorial",
            EntryType::Lesson => "lesson",
            EntryType::Report => "report",
            EntryType::Letter => "letter",
            EntryType::FrontMatter => "front_matter",
            EntryType::Misc => "misc",
        }
    }
}

/// One table-of-contents entry for an issue.
///
/// Entries arrive in TOC appearance order. That order is a tentative article
/// sequence only; final ordering is derived from where each title actually
/// matches in the body text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleEntry {
    /// Title exactly as it appears in the text (used for literal matching).
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    pub etype: EntryType,
}

/// One issue of the publication: identification, source file, and its
/// ordered TOC entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueSpec {
    /// Volume label, e.g. "Vol30".
    pub volume: String,
    /// Issue label within the volume, e.g. "No1".
    pub issue: String,
    /// Month name used for output directories, e.g. "January".
    pub month: String,
    pub year: u16,
    /// Source text filename, resolved relative to the scan root.
    pub source_file: String,
    pub entries: Vec<TitleEntry>,
}

impl IssueSpec {
    /// Short "Vol30 No1 January 1943" label for logs and summaries.
    pub fn label(&self) -> String {
        format!("{} {} {} {}", self.volume, self.issue, self.month, self.year)
    }
}

/// The TOC manifest: every issue to process, in publication order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocManifest {
    pub issues: Vec<IssueSpec>,
}

impl TocManifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let manifest: TocManifest =
            serde_json::from_str(text).context("Failed to parse TOC manifest JSON")?;
        Ok(manifest)
    }

    /// Load and parse a manifest file.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read TOC manifest: {}", path.display()))?;
        let manifest = Self::from_json(&text)?;
        info!(
            "Loaded TOC manifest: {} issues, {} entries total",
            manifest.issues.len(),
            manifest.issues.iter().map(|i| i.entries.len()).sum::<usize>()
        );
        Ok(manifest)
    }

    /// Keep only issues of the given volume label.
    pub fn retain_volume(&mut self, volume: &str) {
        self.issues.retain(|issue| issue.volume == volume);
    }
}
