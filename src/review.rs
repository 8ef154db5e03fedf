use crate::entry::EntryRecord;
use crate::locator::Strategy;
use crate::toc::EntryType;
use serde::Serialize;
use tracing::debug;

/// How far into an entry's cleaned content its own title must appear.
pub const HEAD_WINDOW_CHARS: usize = 200;

/// Advisory record for a likely false split.
///
/// A read-only view of one (entry, strategy) pair whose content does not
/// open with its own title, the signature of a title matched inside a
/// preceding article's prose instead of at its real heading. Emission never
/// mutates the entry records.
#[derive(Debug, Clone, Serialize)]
pub struct FlagRecord {
    pub index: Option<u32>,
    pub title: String,
    pub author: Option<String>,
    pub etype: EntryType,
    pub strategy: Strategy,
    pub position: usize,
    pub length: usize,
    pub content: String,
    pub strict_loose_identical: bool,
    pub title_not_at_start: bool,
}

/// Scan finalized entries and flag every (entry, strategy) pair whose
/// content does not contain the entry's own title within the first
/// [`HEAD_WINDOW_CHARS`] characters.
///
/// The check uses the same literal, case-sensitive semantics as the title
/// locator. Flags are per-strategy: an entry may be flagged under strict,
/// loose, both, or neither.
pub fn flag(entries: &[EntryRecord]) -> Vec<FlagRecord> {
    let mut flags = Vec::new();

    for entry in entries {
        for strategy in Strategy::ALL {
            let matched = match strategy {
                Strategy::Strict => entry.strict_match.as_ref(),
                Strategy::Loose => entry.loose_match.as_ref(),
            };
            let Some(matched) = matched else { continue };

            if head_chars(&matched.content, HEAD_WINDOW_CHARS).contains(entry.title.as_str()) {
                continue;
            }

            debug!(title = %entry.title, strategy = %strategy, "Title not at start of content");
            flags.push(FlagRecord {
                index: entry.index,
                title: entry.title.clone(),
                author: entry.author.clone(),
                etype: entry.etype,
                strategy,
                position: matched.position,
                length: matched.length,
                content: matched.content.clone(),
                strict_loose_identical: entry.strict_loose_identical,
                title_not_at_start: true,
            });
        }
    }

    flags
}

/// Prefix of `s` holding at most `n` characters, clamped to a char boundary.
fn head_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}
