//! Splits raw text around literal special tokens.

use aho_corasick::{AhoCorasick, MatchKind};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Exact special-token literal, emitted as a single id.
    Special(&'a str),
    /// Ordinary text that goes through pre-tokenization and BPE.
    Text(&'a str),
}

pub struct SpecialSplitter {
    // None when there are no special tokens; everything is ordinary text.
    matcher: Option<AhoCorasick>,
}

impl SpecialSplitter {
    /// Build a matcher over `tokens`. Matching is leftmost-first: at the
    /// earliest position where any token matches, the one listed first wins.
    pub fn new<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if patterns.is_empty() {
            return Ok(SpecialSplitter { matcher: None });
        }
        let matcher = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostFirst)
            .build(&patterns)?;
        Ok(SpecialSplitter {
            matcher: Some(matcher),
        })
    }

    /// Partition `text` into special and ordinary segments, left to right.
    /// Empty ordinary gaps are dropped.
    pub fn split<'a>(&self, text: &'a str) -> Vec<Segment<'a>> {
        let mut result = Vec::new();
        let Some(matcher) = &self.matcher else {
            if !text.is_empty() {
                result.push(Segment::Text(text));
            }
            return result;
        };

        let mut last_end = 0;
        for m in matcher.find_iter(text) {
            if m.start() > last_end {
                result.push(Segment::Text(&text[last_end..m.start()]));
            }
            result.push(Segment::Special(&text[m.start()..m.end()]));
            last_end = m.end();
        }
        if last_end < text.len() {
            result.push(Segment::Text(&text[last_end..]));
        }
        result
    }
}
