use crate::locator::{Strategy, TitleMatcher};
use crate::toc::TitleEntry;
use anyhow::Result;
use tracing::debug;

/// Half-open byte range `[start, end)` of one entry's slice of the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Outcome of locating one TOC title under a single strategy.
///
/// `toc_index` points back into the original TOC sequence; unlocated titles
/// carry `None` for both position and span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub toc_index: usize,
    pub position: Option<usize>,
    pub span: Option<Span>,
}

/// Locate every title in `body` under `strategy` and derive fence-post spans.
///
/// Each title is located independently; found positions are then sorted
/// ascending (stable, so original TOC order breaks exact position ties) and
/// entry *i*'s span runs from its own position to the next entry's position,
/// the last span extending to end-of-text. Unlocated titles follow the
/// located ones in original TOC order, span-less.
pub fn resolve(titles: &[TitleEntry], body: &str, strategy: Strategy) -> Result<Vec<Located>> {
    let mut found: Vec<(usize, usize)> = Vec::new(); // (position, toc_index)
    let mut unlocated: Vec<usize> = Vec::new();

    for (toc_index, entry) in titles.iter().enumerate() {
        let matcher = TitleMatcher::compile(&entry.title, strategy)?;
        match matcher.locate(body) {
            Some(position) => found.push((position, toc_index)),
            None => {
                debug!(strategy = %strategy, title = %entry.title, "Title not located");
                unlocated.push(toc_index);
            }
        }
    }

    // WHY: stable sort keeps TOC order deterministic among equal positions
    found.sort_by_key(|&(position, _)| position);

    let mut resolved = Vec::with_capacity(titles.len());
    for (i, &(position, toc_index)) in found.iter().enumerate() {
        let end = match found.get(i + 1) {
            Some(&(next_position, _)) => next_position,
            None => body.len(),
        };
        resolved.push(Located {
            toc_index,
            position: Some(position),
            span: Some(Span { start: position, end }),
        });
    }
    for &toc_index in &unlocated {
        resolved.push(Located {
            toc_index,
            position: None,
            span: None,
        });
    }

    debug!(
        strategy = %strategy,
        located = found.len(),
        unlocated = unlocated.len(),
        "Boundary resolution complete"
    );
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toc::EntryType;

    fn titles(names: &[&str]) -> Vec<TitleEntry> {
        names
            .iter()
            .map(|name| TitleEntry {
                title: name.to_string(),
                author: None,
                etype: EntryType::Article,
            })
            .collect()
    }

    #[test]
    fn test_fence_post_spans_do_not_overlap() {
        let body = "First\naaa\nSecond\nbbb\nThird\nccc";
        let toc = titles(&["First", "Second", "Third"]);
        let resolved = resolve(&toc, body, Strategy::Strict).unwrap();

        let spans: Vec<Span> = resolved.iter().filter_map(|l| l.span).collect();
        assert_eq!(spans.len(), 3);
        for pair in spans.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(spans.last().unwrap().end, body.len());
    }

    #[test]
    fn test_ordering_follows_position_not_toc() {
        // TOC lists Second before First, but the text has First earlier
        let body = "First\naaa\nSecond\nbbb";
        let toc = titles(&["Second", "First"]);
        let resolved = resolve(&toc, body, Strategy::Strict).unwrap();

        assert_eq!(resolved[0].toc_index, 1); // "First" at position 0
        assert_eq!(resolved[1].toc_index, 0);
        assert_eq!(resolved[0].position, Some(0));
        assert_eq!(resolved[1].position, Some(10));
    }

    #[test]
    fn test_unlocated_titles_retained_in_toc_order() {
        let body = "First\naaa";
        let toc = titles(&["Missing B", "First", "Missing A"]);
        let resolved = resolve(&toc, body, Strategy::Strict).unwrap();

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].toc_index, 1);
        assert!(resolved[0].span.is_some());
        // Unlocated entries keep their relative TOC order
        assert_eq!(resolved[1].toc_index, 0);
        assert_eq!(resolved[2].toc_index, 2);
        assert_eq!(resolved[1].span, None);
        assert_eq!(resolved[2].position, None);
    }

    #[test]
    fn test_duplicate_position_tie_is_stable() {
        // Two TOC entries whose titles match at the same offset: one title
        // is a prefix of the other. Stable sort keeps TOC order.
        let body = "Notes to the Field\ncontent";
        let toc = titles(&["Notes to the Field", "Notes to the"]);
        let resolved = resolve(&toc, body, Strategy::Strict).unwrap();

        assert_eq!(resolved[0].position, Some(0));
        assert_eq!(resolved[1].position, Some(0));
        assert_eq!(resolved[0].toc_index, 0);
        assert_eq!(resolved[1].toc_index, 1);
        // Fence-post model still holds: first span is empty, second runs out
        assert_eq!(resolved[0].span, Some(Span { start: 0, end: 0 }));
        assert_eq!(resolved[1].span.unwrap().end, body.len());
    }

    #[test]
    fn test_empty_inputs() {
        assert!(resolve(&[], "some body", Strategy::Loose).unwrap().is_empty());

        let toc = titles(&["Alpha"]);
        let resolved = resolve(&toc, "", Strategy::Loose).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].span, None);
    }

    #[test]
    fn test_strategies_are_independent() {
        // Scenario: strict misses a mid-string title that loose finds
        let body = "Alpha text one. Beta text two.";
        let toc = titles(&["Alpha", "Beta"]);

        let strict = resolve(&toc, body, Strategy::Strict).unwrap();
        let loose = resolve(&toc, body, Strategy::Loose).unwrap();

        let strict_beta = strict.iter().find(|l| l.toc_index == 1).unwrap();
        assert_eq!(strict_beta.position, None);

        let loose_beta = loose.iter().find(|l| l.toc_index == 1).unwrap();
        assert_eq!(loose_beta.position, Some(16));
        assert_eq!(loose_beta.span, Some(Span { start: 16, end: body.len() }));
    }
}
