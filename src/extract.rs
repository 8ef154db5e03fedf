use crate::entry::{self, EntryRecord};
use crate::locator::Strategy;
use crate::noise::NoiseStripper;
use crate::resolver;
use crate::review::{self, FlagRecord};
use crate::segment::Segmenter;
use crate::toc::TitleEntry;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// Per-issue counters for the run summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueStats {
    /// Entries matched under at least one strategy.
    pub entries_matched: usize,
    /// Entries supplied by the TOC.
    pub entries_total: usize,
    /// (entry, strategy) pairs flagged for review.
    pub flagged: usize,
    pub total_bytes: usize,
    pub misc_bytes: usize,
}

impl IssueStats {
    /// Share of the issue accounted for by extracted entries.
    pub fn coverage_pct(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.total_bytes - self.misc_bytes) as f64 / self.total_bytes as f64 * 100.0
    }
}

/// Everything extracted from one issue.
#[derive(Debug, Clone)]
pub struct IssueExtraction {
    pub entries: Vec<EntryRecord>,
    pub flags: Vec<FlagRecord>,
    /// CONTENTS block lifted from the front matter.
    pub toc_text: Option<String>,
    /// Advertising tail cut from the body.
    pub ads_text: Option<String>,
    /// Residual text: leftover front matter, body gaps no entry claimed,
    /// and deduplicated stripped-noise fragments.
    pub misc_text: Option<String>,
    pub stats: IssueStats,
}

impl IssueExtraction {
    fn empty(total_bytes: usize, entries_total: usize) -> Self {
        Self {
            entries: Vec::new(),
            flags: Vec::new(),
            toc_text: None,
            ads_text: None,
            misc_text: None,
            stats: IssueStats {
                total_bytes,
                entries_total,
                ..IssueStats::default()
            },
        }
    }
}

/// Extract one issue: segment, resolve boundaries under both strategies,
/// build entry records, flag suspect splits, and collect residuals.
///
/// Pure function over in-memory strings; all I/O stays with the caller.
/// An empty body or an empty title list yields an empty extraction.
pub fn extract_issue(
    titles: &[TitleEntry],
    text: &str,
    stripper: &NoiseStripper,
    segmenter: &Segmenter,
) -> Result<IssueExtraction> {
    if titles.is_empty() || text.is_empty() {
        return Ok(IssueExtraction::empty(text.len(), titles.len()));
    }

    let (front_matter, body_full) = segmenter.split_front_matter(text);
    let body_offset = front_matter.len();
    let (body, ads_text) = segmenter.find_ads_tail(body_full);
    let body_end = body_offset + body.len();

    // The two strategy passes are independent runs over the same body;
    // the entry builder below is their join point.
    let resolved_strict = resolver::resolve(titles, body, Strategy::Strict)?;
    let resolved_loose = resolver::resolve(titles, body, Strategy::Loose)?;

    let (entries, noise_fragments) = entry::build(
        &resolved_strict,
        &resolved_loose,
        titles,
        body,
        body_offset,
        stripper,
    );
    let flags = review::flag(&entries);

    // Union of both strategies' claimed intervals, in full-text coordinates.
    let mut intervals: Vec<(usize, usize)> = resolved_strict
        .iter()
        .chain(resolved_loose.iter())
        .filter_map(|located| located.span)
        .map(|span| (body_offset + span.start, body_offset + span.end))
        .collect();
    intervals.sort_unstable();
    intervals.dedup();

    let (toc_text, remaining_front) = segmenter.extract_contents(front_matter);

    let mut misc_parts: Vec<String> = Vec::new();
    if !remaining_front.is_empty() {
        misc_parts.push(remaining_front);
    }

    let mut cursor = body_offset;
    for &(start, end) in &intervals {
        if cursor < start {
            let gap = text[cursor..start].trim();
            if !gap.is_empty() {
                misc_parts.push(gap.to_string());
            }
        }
        cursor = cursor.max(end);
    }
    if cursor < body_end {
        let gap = text[cursor..body_end].trim();
        if !gap.is_empty() {
            misc_parts.push(gap.to_string());
        }
    }

    if !noise_fragments.is_empty() {
        misc_parts.push("--- STRIPPED NOISE ---".to_string());
        let mut seen = HashSet::new();
        for fragment in noise_fragments {
            if seen.insert(fragment.clone()) {
                misc_parts.push(fragment);
            }
        }
    }

    let misc_text = if misc_parts.is_empty() {
        None
    } else {
        Some(misc_parts.join("\n\n---\n\n"))
    };

    let stats = IssueStats {
        entries_matched: entries.iter().filter(|e| e.index.is_some()).count(),
        entries_total: titles.len(),
        flagged: flags.len(),
        total_bytes: text.len(),
        misc_bytes: misc_text.as_deref().map_or(0, str::len),
    };
    info!(
        matched = stats.entries_matched,
        total = stats.entries_total,
        flagged = stats.flagged,
        coverage_pct = stats.coverage_pct(),
        "Issue extraction complete"
    );

    Ok(IssueExtraction {
        entries,
        flags,
        toc_text,
        ads_text: ads_text.map(str::to_string),
        misc_text,
        stats,
    })
}
