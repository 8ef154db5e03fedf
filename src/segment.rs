use anyhow::{Context, Result};
use regex_automata::meta::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Ad detection searches only this trailing fraction of the body.
const AD_TAIL_NUMERATOR: usize = 3;
const AD_TAIL_DENOMINATOR: usize = 10;
/// Maximum walk-back from an ad marker to the paragraph break that opens
/// the advertising section.
const AD_BREAK_WINDOW: usize = 500;

/// Patterns that carve an issue into front matter, article body, and ads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Line pattern that closes the front matter in every issue.
    pub front_matter_marker: String,
    /// Pattern opening the CONTENTS block inside the front matter.
    pub contents_start: String,
    /// Section headings that terminate the CONTENTS block.
    pub contents_boundary: String,
    /// Markers whose earliest occurrence in the body tail opens the ads.
    pub ad_markers: Vec<String>,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            front_matter_marker: r"MAGAZINE CIRCULATION[^\n]*".to_string(),
            contents_start: r"CONTENTS".to_string(),
            contents_boundary: r"GENERAL\s+BOARD|PUBLISHED\s+MONTHLY|MAGAZINE\s+CIRCULATION"
                .to_string(),
            ad_markers: vec![
                r"When Buying Mention Relief Society Magazine".to_string(),
                r"DESERET NEWS PRESS".to_string(),
                r"DESERET BOOK COMPANY".to_string(),
                r"DAYNES\S?\s*MUSIC\s*CO".to_string(),
                r"L\.\s*D\.\s*S\.\s*BUSINESS COLLEGE".to_string(),
                r"MORMON HANDICRAFT".to_string(),
                r"Brigham Young University".to_string(),
            ],
        }
    }
}

/// Compiled issue segmenter.
pub struct Segmenter {
    marker: Regex,
    contents_start: Regex,
    contents_boundary: Regex,
    ad_markers: Vec<Regex>,
}

impl Segmenter {
    /// Compile a segment config; invalid patterns fail here, at startup.
    pub fn compile(config: &SegmentConfig) -> Result<Self> {
        let marker = Regex::new(&config.front_matter_marker)
            .context("Invalid front matter marker pattern")?;
        let contents_start =
            Regex::new(&config.contents_start).context("Invalid contents start pattern")?;
        let contents_boundary =
            Regex::new(&config.contents_boundary).context("Invalid contents boundary pattern")?;
        let ad_markers = config
            .ad_markers
            .iter()
            .map(|pattern| {
                Regex::new(pattern).with_context(|| format!("Invalid ad marker: {pattern:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            marker,
            contents_start,
            contents_boundary,
            ad_markers,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::compile(&SegmentConfig::default())
    }

    /// Split the issue at the end of the front-matter marker line.
    ///
    /// Title matching must run over the body only, or TOC listings would
    /// claim every title at its contents-page occurrence. Without the
    /// marker the whole text is treated as body.
    pub fn split_front_matter<'a>(&self, text: &'a str) -> (&'a str, &'a str) {
        match self.marker.find(text) {
            Some(m) => {
                debug!(split = m.end(), "Front matter split");
                (&text[..m.end()], &text[m.end()..])
            }
            None => {
                warn!("Front matter marker not found; matching over full text");
                ("", text)
            }
        }
    }

    /// Lift the CONTENTS block out of the front matter.
    ///
    /// Returns the block (if any) and the remaining front matter around it.
    pub fn extract_contents(&self, front_matter: &str) -> (Option<String>, String) {
        let Some(start_match) = self.contents_start.find(front_matter) else {
            return (None, front_matter.trim().to_string());
        };
        let start = start_match.start();
        let after = start_match.end();
        let end = self
            .contents_boundary
            .find(&front_matter[after..])
            .map(|m| after + m.start())
            .unwrap_or(front_matter.len());

        let toc_text = front_matter[start..end].trim().to_string();
        let remaining = format!(
            "{}\n{}",
            front_matter[..start].trim_end(),
            front_matter[end..].trim_start()
        )
        .trim()
        .to_string();
        (Some(toc_text), remaining)
    }

    /// Detect advertising content at the tail of the body.
    ///
    /// Searches the final 30% of the body for the earliest ad marker, then
    /// walks back to the nearest blank-line break within 500 bytes so the
    /// whole ad block moves together. Returns the trimmed body and the ads
    /// text, if any.
    pub fn find_ads_tail<'a>(&self, body: &'a str) -> (&'a str, Option<&'a str>) {
        let mut search_start =
            body.len() * (AD_TAIL_DENOMINATOR - AD_TAIL_NUMERATOR) / AD_TAIL_DENOMINATOR;
        while !body.is_char_boundary(search_start) {
            search_start -= 1;
        }
        let region = &body[search_start..];

        let earliest = self
            .ad_markers
            .iter()
            .filter_map(|re| re.find(region).map(|m| search_start + m.start()))
            .min();
        let Some(marker_pos) = earliest else {
            return (body, None);
        };

        let mut cut = marker_pos;
        if let Some(break_pos) = body[..marker_pos].rfind("\n\n") {
            if marker_pos - break_pos < AD_BREAK_WINDOW {
                cut = break_pos;
            }
        }

        let ads = body[cut..].trim();
        if ads.is_empty() {
            return (body, None);
        }
        debug!(cut, "Advertising tail detected");
        (&body[..cut], Some(ads))
    }
}
