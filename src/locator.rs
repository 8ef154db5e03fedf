use anyhow::{Context, Result};
use regex_automata::meta::Regex;
use serde::Serialize;
use std::fmt;

/// Title-location strategy.
///
/// Both strategies search for the same escaped literal; they differ only in
/// where a match is allowed to begin. Modeled as a tag driving one
/// parameterized matcher rather than two matcher types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Match only where the title starts a line (offset 0 counts).
    Strict,
    /// Match the first occurrence anywhere in the body.
    Loose,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Strict, Strategy::Loose];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Strict => "strict",
            Strategy::Loose => "loose",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled literal matcher for one title under one strategy.
pub struct TitleMatcher {
    regex: Regex,
}

impl TitleMatcher {
    /// Compile a matcher for `title`.
    ///
    /// The title is escaped before compilation, so regex metacharacters in
    /// TOC titles ("Tch! Tch! Grandma!", "I-30") are matched literally.
    /// Matching is case-sensitive; case is never normalized.
    pub fn compile(title: &str, strategy: Strategy) -> Result<Self> {
        let literal = regex_syntax::escape(title);
        let pattern = match strategy {
            // WHY: (?m)^ anchors the match to a line boundary without
            // consuming it, so the reported offset is the title itself
            Strategy::Strict => format!("(?m)^{literal}"),
            Strategy::Loose => literal,
        };
        let regex = Regex::new(&pattern)
            .with_context(|| format!("Failed to compile title pattern for {title:?}"))?;
        Ok(Self { regex })
    }

    /// Byte offset of the first allowed occurrence in `body`, or `None`.
    pub fn locate(&self, body: &str) -> Option<usize> {
        self.regex.find(body).map(|m| m.start())
    }
}

/// One-shot locate: compile and search in a single call.
pub fn locate(title: &str, body: &str, strategy: Strategy) -> Result<Option<usize>> {
    Ok(TitleMatcher::compile(title, strategy)?.locate(body))
}
