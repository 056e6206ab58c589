use tracing::warn;

use crate::error::Result;

/// Qwen2 pre-tokenization pattern, alternatives tried in order:
/// contractions, letter runs with one optional leading symbol, single digits,
/// punctuation runs with an optional leading space and trailing newlines,
/// newline-terminated whitespace, whitespace not followed by text, and any
/// remaining whitespace.
const QWEN2_PAT: &str = concat!(
    r"(?i:'s|'t|'re|'ve|'m|'ll|'d)",
    r"|[^\r\n\p{L}\p{N}]?\p{L}+",
    r"|\p{N}",
    r"| ?[^\s\p{L}\p{N}]+[\r\n]*",
    r"|\s*[\r\n]+",
    r"|\s+(?!\S)",
    r"|\s+",
);

pub struct Pretokenizer {
    regex: fancy_regex::Regex,
}

impl Pretokenizer {
    pub fn new() -> Result<Self> {
        let regex = fancy_regex::Regex::new(QWEN2_PAT)?;
        Ok(Pretokenizer { regex })
    }

    /// Lazily segment `text`. Concatenating the pieces reproduces `text`;
    /// calling again restarts from the beginning.
    pub fn split<'r, 't>(&'r self, text: &'t str) -> Pieces<'r, 't> {
        Pieces {
            matches: self.regex.find_iter(text),
            text,
            last_end: 0,
            pending: None,
        }
    }
}

/// Iterator over pre-tokenized pieces of one ordinary segment.
///
/// A region the regex engine gives up on (backtrack limit) is emitted as its
/// own piece so no input is dropped.
pub struct Pieces<'r, 't> {
    matches: fancy_regex::Matches<'r, 't>,
    text: &'t str,
    last_end: usize,
    pending: Option<(usize, usize)>,
}

impl<'t> Iterator for Pieces<'_, 't> {
    type Item = &'t str;

    fn next(&mut self) -> Option<&'t str> {
        if let Some((start, end)) = self.pending.take() {
            self.last_end = end;
            return Some(&self.text[start..end]);
        }
        loop {
            match self.matches.next() {
                Some(Ok(m)) => {
                    if m.start() == m.end() {
                        continue;
                    }
                    if m.start() > self.last_end {
                        let gap = &self.text[self.last_end..m.start()];
                        self.pending = Some((m.start(), m.end()));
                        self.last_end = m.start();
                        return Some(gap);
                    }
                    self.last_end = m.end();
                    return Some(m.as_str());
                }
                Some(Err(e)) => {
                    warn!(
                        offset = self.last_end,
                        remaining = self.text.len() - self.last_end,
                        error = %e,
                        "pre-tokenizer regex failed, keeping text as one piece"
                    );
                    continue;
                }
                None => {
                    if self.last_end < self.text.len() {
                        let rest = &self.text[self.last_end..];
                        self.last_end = self.text.len();
                        return Some(rest);
                    }
                    return None;
                }
            }
        }
    }
}
