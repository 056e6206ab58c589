//! Qwen2-style byte-level BPE tokenizer.
//!
//! Encoding: NFC normalize → split on special tokens → pre-tokenize ordinary
//! text → byte-level map → BPE merge (memoized) → vocabulary lookup.
//! Decoding reverses the vocabulary lookup and the byte-level map.

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::bpe::{self, MergeCache};
use crate::byte_level::ByteLevel;
use crate::error::Result;
use crate::pretokenize::Pretokenizer;
use crate::special::{Segment, SpecialSplitter};
use crate::vocab::{MergeRanks, ReservedIds, TokenizerConfig, Vocab};

enum Unit<'a> {
    Special(u32),
    Pieces(&'a [String]),
}

pub struct Tokenizer {
    vocab: Vocab,
    ranks: MergeRanks,
    byte_level: ByteLevel,
    /// Special token literal -> id, resolved at load time.
    special: HashMap<String, u32>,
    splitter: SpecialSplitter,
    pretokenizer: Pretokenizer,
    cache: MergeCache,
    reserved: ReservedIds,
}

impl Tokenizer {
    /// Build a tokenizer from the text of `vocab.json`, `merges.txt` and
    /// `tokenizer_config.json`.
    pub fn new(vocab_json: &str, merges_txt: &str, config_json: &str) -> Result<Self> {
        let mut vocab = Vocab::from_json(vocab_json)?;
        let config = TokenizerConfig::from_json(config_json)?;

        for (&id, token) in &config.added_tokens {
            vocab.insert_if_absent(&token.content, id);
        }

        // Added tokens are in the vocabulary by now, so every special literal
        // resolves; ascending id order decides which overlapping literal wins.
        let mut special = HashMap::new();
        let mut special_order = Vec::new();
        for token in config.added_tokens.values().filter(|t| t.special) {
            if let Some(id) = vocab.id(&token.content) {
                if special.insert(token.content.clone(), id).is_none() {
                    special_order.push(token.content.as_str());
                }
            }
        }
        let splitter = SpecialSplitter::new(&special_order)?;

        let reserved = ReservedIds::resolve(&vocab, &config)?;
        let ranks = MergeRanks::parse(merges_txt);

        debug!(
            vocab_size = vocab.len(),
            merge_count = ranks.len(),
            special_count = special.len(),
            eos = reserved.eos,
            pad = reserved.pad,
            unk = reserved.unk,
            "tokenizer initialized"
        );

        Ok(Tokenizer {
            vocab,
            ranks,
            byte_level: ByteLevel::new(),
            special,
            splitter,
            pretokenizer: Pretokenizer::new()?,
            cache: MergeCache::new(),
            reserved,
        })
    }

    /// Encode `text` into token ids, left to right.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        let mut ids = Vec::new();
        self.encode_into(text, &mut ids);
        ids
    }

    /// Encode several texts in parallel; output order matches input order.
    pub fn encode_batch(&self, texts: &[&str]) -> Vec<Vec<u32>> {
        texts.par_iter().map(|text| self.encode(text)).collect()
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        let mut total = 0;
        self.walk(text, |unit| match unit {
            Unit::Special(_) => total += 1,
            Unit::Pieces(pieces) => total += pieces.len(),
        });
        total
    }

    fn encode_into(&self, text: &str, ids: &mut Vec<u32>) {
        self.walk(text, |unit| match unit {
            Unit::Special(id) => ids.push(id),
            Unit::Pieces(pieces) => ids.extend(
                pieces
                    .iter()
                    .map(|p| self.vocab.id(p).unwrap_or(self.reserved.unk)),
            ),
        });
    }

    /// Normalize, split on special tokens, pre-tokenize and merge `text`,
    /// handing each unit to `f` in input order.
    fn walk(&self, text: &str, mut f: impl FnMut(Unit<'_>)) {
        if text.is_empty() {
            return;
        }
        let normalized: String = text.nfc().collect();
        for segment in self.splitter.split(&normalized) {
            match segment {
                Segment::Special(literal) => {
                    if let Some(&id) = self.special.get(literal) {
                        f(Unit::Special(id));
                    }
                }
                Segment::Text(part) => {
                    for piece in self.pretokenizer.split(part) {
                        let merged = self.merge_piece(piece);
                        f(Unit::Pieces(&merged));
                    }
                }
            }
        }
    }

    fn merge_piece(&self, piece: &str) -> Arc<[String]> {
        let mapped = self.byte_level.encode_bytes(piece.as_bytes());
        bpe::bpe(&self.ranks, &self.cache, &mapped)
    }

    /// Decode ids back into text. The unknown id and ids missing from the
    /// vocabulary contribute nothing; invalid UTF-8 is replaced lossily.
    pub fn decode(&self, ids: &[u32]) -> String {
        let mut surrogate = String::new();
        for &id in ids {
            if id == self.reserved.unk {
                continue;
            }
            if let Some(token) = self.vocab.token(id) {
                surrogate.push_str(token);
            }
        }
        let bytes = self.byte_level.decode_chars(&surrogate);
        match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }

    pub fn eos_token_id(&self) -> u32 {
        self.reserved.eos
    }

    pub fn pad_token_id(&self) -> u32 {
        self.reserved.pad
    }

    pub fn unk_token_id(&self) -> u32 {
        self.reserved.unk
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.vocab.id(token)
    }

    pub fn id_to_token(&self, id: u32) -> Option<&str> {
        self.vocab.token(id)
    }

    pub fn is_special(&self, token: &str) -> bool {
        self.special.contains_key(token)
    }

    pub fn special_tokens(&self) -> impl Iterator<Item = (&str, u32)> {
        self.special.iter().map(|(t, &id)| (t.as_str(), id))
    }

    /// Number of chunks memoized by the merge cache so far.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}
