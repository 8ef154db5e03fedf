use anyhow::{Context, Result};
use regex_automata::meta::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// One labeled boilerplate pattern to strip from entry content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoisePatternSpec {
    /// Human-readable label, used in logs and configuration errors.
    pub label: String,
    /// Regex source. Patterns in a set must be pairwise disjoint: no
    /// pattern's removal may enable or block another's match.
    pub regex: String,
}

/// The configurable noise-pattern set.
///
/// Loaded from a TOML file of `[[pattern]]` tables, or built from the
/// shipped defaults that mirror the magazine's running boilerplate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseConfig {
    #[serde(rename = "pattern")]
    pub patterns: Vec<NoisePatternSpec>,
}

impl NoiseConfig {
    /// Built-in pattern set for the publication's known boilerplate.
    pub fn default_set() -> Self {
        let patterns = vec![
            NoisePatternSpec {
                label: "running header".to_string(),
                // Page header: optional page number, magazine name, optional
                // month/year tail. Kept on one line.
                regex: r"\d{0,4}[ \t]*RELIEF SOCIETY MAGAZINE[ \t]*[^\w\n]*(?:JANUARY|FEBRUARY|MARCH|APRIL|MAY|JUNE|JULY|AUGUST|SEPTEMBER|OCTOBER|NOVEMBER|DECEMBER)?[ \t]*\d{0,4}".to_string(),
            },
            NoisePatternSpec {
                label: "lesson department label".to_string(),
                regex: r"(?m)^[ \t]*LESSON DEPARTMENT[ \t]*$".to_string(),
            },
            NoisePatternSpec {
                label: "mailing statement".to_string(),
                regex: r"(?is)Entered as second-class matter.*?authorized\s+June\s+29,\s+1918\.".to_string(),
            },
            NoisePatternSpec {
                label: "manuscript stamps notice".to_string(),
                regex: r"Stamps should accompany manuscripts for their return\.?".to_string(),
            },
        ];
        NoiseConfig { patterns }
    }

    /// Parse a pattern set from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: NoiseConfig =
            toml::from_str(text).context("Failed to parse noise pattern config")?;
        Ok(config)
    }

    /// Load a pattern set from a TOML file.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read noise config: {}", path.display()))?;
        Self::from_toml(&text)
    }
}

#[derive(Debug)]
struct CompiledPattern {
    label: String,
    regex: Regex,
}

/// Strips configured boilerplate from text spans, recording what it removed.
#[derive(Debug)]
pub struct NoiseStripper {
    patterns: Vec<CompiledPattern>,
}

/// Result of one stripping pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripOutcome {
    /// Text with all pattern matches removed.
    pub cleaned: String,
    /// Every removed fragment, verbatim (edge-trimmed), in document order
    /// per pattern.
    pub fragments: Vec<String>,
}

impl NoiseStripper {
    /// Compile a pattern set.
    ///
    /// An invalid pattern is a configuration error and fails here, before
    /// any issue is processed.
    pub fn compile(config: &NoiseConfig) -> Result<Self> {
        let mut patterns = Vec::with_capacity(config.patterns.len());
        for spec in &config.patterns {
            let regex = Regex::new(&spec.regex).with_context(|| {
                format!("Invalid noise pattern {:?}: {:?}", spec.label, spec.regex)
            })?;
            patterns.push(CompiledPattern {
                label: spec.label.clone(),
                regex,
            });
        }
        info!("Compiled {} noise patterns", patterns.len());
        Ok(Self { patterns })
    }

    /// Compile the shipped default set.
    pub fn with_default_patterns() -> Result<Self> {
        Self::compile(&NoiseConfig::default_set())
    }

    /// Remove every pattern match from `text`.
    ///
    /// Each matched fragment is recorded before removal. Removal erases the
    /// matched bytes and, when the match occupied the start of a line and is
    /// followed by a line break, that single line break as well, never more,
    /// so unrelated paragraphs are not merged.
    pub fn strip(&self, text: &str) -> StripOutcome {
        let mut cleaned = text.to_string();
        let mut fragments = Vec::new();

        for pattern in &self.patterns {
            let ranges: Vec<(usize, usize)> = pattern
                .regex
                .find_iter(cleaned.as_str())
                .map(|m| (m.start(), m.end()))
                .collect();
            if ranges.is_empty() {
                continue;
            }
            debug!(label = %pattern.label, matches = ranges.len(), "Stripping noise");

            for &(start, end) in &ranges {
                fragments.push(cleaned[start..end].trim().to_string());
            }
            // WHY: removing right-to-left keeps the earlier ranges valid
            for &(start, end) in ranges.iter().rev() {
                erase(&mut cleaned, start, end);
            }
        }

        StripOutcome { cleaned, fragments }
    }
}

/// Erase `[start, end)` plus at most one adjacent line break.
fn erase(cleaned: &mut String, start: usize, end: usize) {
    let bytes = cleaned.as_bytes();
    let at_line_start = start == 0 || bytes[start - 1] == b'\n';
    let mut end = end;
    if at_line_start && bytes.get(end) == Some(&b'\n') {
        end += 1;
    }
    cleaned.replace_range(start..end, "");
}
