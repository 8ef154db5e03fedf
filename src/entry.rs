use crate::noise::NoiseStripper;
use crate::resolver::{Located, Span};
use crate::toc::{EntryType, TitleEntry};
use serde::{Deserialize, Serialize};

/// One strategy's extracted slice for a single entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// 0-based byte offset of the title match in the full issue text.
    pub position: usize,
    /// Length of the raw slice before noise stripping.
    pub length: usize,
    /// Post-stripping content.
    pub content: String,
}

/// A finalized per-entry record carrying both strategy results.
///
/// `index` is `None` for entries that matched under neither strategy; those
/// are retained after all matched entries, in TOC order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord {
    pub index: Option<u32>,
    pub title: String,
    pub author: Option<String>,
    pub etype: EntryType,
    pub strict_loose_identical: bool,
    pub strict_match: Option<MatchResult>,
    pub loose_match: Option<MatchResult>,
}

/// Pair both strategy runs into finalized entry records.
///
/// For each TOC title the strict and loose spans are sliced from `body`,
/// noise-stripped, and combined. Reported positions are offset by
/// `body_offset` into full-text coordinates. Final indices come from a
/// stable sort on the earliest available position, strict preferred; the
/// index sequence is 1-based and dense over matched entries.
///
/// Returns the records plus every stripped noise fragment, in record order,
/// for the caller's misc collector. A fragment set is taken from the loose
/// slice only when the strict slice is absent, so overlapping slices do not
/// double-report the same boilerplate.
pub fn build(
    resolved_strict: &[Located],
    resolved_loose: &[Located],
    titles: &[TitleEntry],
    body: &str,
    body_offset: usize,
    stripper: &NoiseStripper,
) -> (Vec<EntryRecord>, Vec<String>) {
    let strict_spans = spans_by_toc_index(resolved_strict, titles.len());
    let loose_spans = spans_by_toc_index(resolved_loose, titles.len());

    let mut fragments = Vec::new();
    let mut keyed: Vec<(Option<usize>, EntryRecord)> = Vec::with_capacity(titles.len());

    for (toc_index, title_entry) in titles.iter().enumerate() {
        let strict_match = strict_spans[toc_index]
            .map(|span| slice_match(body, body_offset, span, stripper, &mut fragments));
        let loose_match = loose_spans[toc_index].map(|span| {
            let mut local_fragments = Vec::new();
            let result = slice_match(body, body_offset, span, stripper, &mut local_fragments);
            if strict_spans[toc_index].is_none() {
                fragments.extend(local_fragments);
            }
            result
        });

        if let (Some(strict), Some(loose)) = (&strict_match, &loose_match) {
            // Loose takes the first occurrence anywhere, so it can never sit
            // past the line-anchored strict occurrence.
            debug_assert!(loose.position <= strict.position);
        }

        let strict_loose_identical = match (&strict_match, &loose_match) {
            (Some(strict), Some(loose)) => strict.content == loose.content,
            _ => false,
        };

        let sort_key = strict_match
            .as_ref()
            .map(|m| m.position)
            .or_else(|| loose_match.as_ref().map(|m| m.position));

        keyed.push((
            sort_key,
            EntryRecord {
                index: None,
                title: title_entry.title.clone(),
                author: title_entry.author.clone(),
                etype: title_entry.etype,
                strict_loose_identical,
                strict_match,
                loose_match,
            },
        ));
    }

    // WHY: a pure sort-and-enumerate keeps indexing deterministic and
    // side-effect free; no running counter survives between issues
    let (mut matched, unmatched): (Vec<_>, Vec<_>) =
        keyed.into_iter().partition(|(key, _)| key.is_some());
    matched.sort_by_key(|(key, _)| key.expect("partitioned on is_some"));

    let mut records = Vec::with_capacity(matched.len() + unmatched.len());
    for (i, (_, mut record)) in matched.into_iter().enumerate() {
        record.index = Some(i as u32 + 1);
        records.push(record);
    }
    for (_, record) in unmatched {
        records.push(record);
    }

    (records, fragments)
}

fn spans_by_toc_index(resolved: &[Located], len: usize) -> Vec<Option<Span>> {
    let mut spans = vec![None; len];
    for located in resolved {
        spans[located.toc_index] = located.span;
    }
    spans
}

fn slice_match(
    body: &str,
    body_offset: usize,
    span: Span,
    stripper: &NoiseStripper,
    fragments: &mut Vec<String>,
) -> MatchResult {
    let raw = body[span.start..span.end].trim();
    let outcome = stripper.strip(raw);
    fragments.extend(outcome.fragments);
    MatchResult {
        position: body_offset + span.start,
        length: raw.len(),
        content: outcome.cleaned.trim().to_string(),
    }
}
