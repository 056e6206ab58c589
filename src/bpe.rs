//! Rank-ordered BPE merging over byte-level text.
//!
//! Each pass finds the adjacent pair with the globally lowest rank and merges
//! every non-overlapping occurrence of it, left to right. Symbols are kept as
//! byte ranges into the chunk: a merged symbol is always a contiguous slice of
//! the input, so merging two neighbors just extends a range.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

use crate::vocab::MergeRanks;

/// Memoized merge results keyed by byte-level chunk text.
///
/// Grows for the lifetime of the tokenizer and is never invalidated. The
/// lock is held only for lookup and insert; the first value stored for a
/// chunk is the one every caller sees.
#[derive(Default)]
pub struct MergeCache {
    entries: Mutex<HashMap<String, Arc<[String]>>>,
}

impl MergeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, chunk: &str) -> Option<Arc<[String]>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(chunk).cloned()
    }

    /// Insert `pieces` unless another caller got there first; returns the
    /// stored value either way.
    pub fn insert(&self, chunk: &str, pieces: Arc<[String]>) -> Arc<[String]> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(chunk.to_string())
            .or_insert(pieces)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split `chunk` into vocabulary pieces, consulting and filling `cache`.
pub fn bpe(ranks: &MergeRanks, cache: &MergeCache, chunk: &str) -> Arc<[String]> {
    if let Some(hit) = cache.get(chunk) {
        return hit;
    }
    trace!(chunk, "merge cache miss");
    let pieces: Arc<[String]> = merge(ranks, chunk)
        .into_iter()
        .map(|(start, end)| chunk[start..end].to_string())
        .collect();
    cache.insert(chunk, pieces)
}

/// Run the merge loop and return the final symbols as byte ranges of `chunk`.
pub fn merge(ranks: &MergeRanks, chunk: &str) -> Vec<(usize, usize)> {
    let mut parts: Vec<(usize, usize)> = chunk
        .char_indices()
        .map(|(i, ch)| (i, i + ch.len_utf8()))
        .collect();
    if parts.len() <= 1 {
        return parts;
    }

    let mut key = String::new();
    let mut next = Vec::with_capacity(parts.len());

    loop {
        // Running minimum over every adjacent pair in the current sequence.
        let mut best: Option<(u32, usize)> = None;
        for i in 0..parts.len() - 1 {
            let left = &chunk[parts[i].0..parts[i].1];
            let right = &chunk[parts[i + 1].0..parts[i + 1].1];
            if let Some(rank) = ranks.rank_with(&mut key, left, right) {
                if best.map_or(true, |(r, _)| rank < r) {
                    best = Some((rank, i));
                }
            }
        }
        let Some((_, at)) = best else { break };

        let first = parts[at];
        let second = parts[at + 1];
        let left = &chunk[first.0..first.1];
        let right = &chunk[second.0..second.1];

        next.clear();
        let mut i = 0;
        while i < parts.len() {
            if i + 1 < parts.len()
                && &chunk[parts[i].0..parts[i].1] == left
                && &chunk[parts[i + 1].0..parts[i + 1].1] == right
            {
                next.push((parts[i].0, parts[i + 1].1));
                i += 2;
            } else {
                next.push(parts[i]);
                i += 1;
            }
        }
        std::mem::swap(&mut parts, &mut next);

        if parts.len() == 1 {
            break;
        }
    }

    parts
}
