//! Vocabulary, merge list and tokenizer configuration loading.
//!
//! All three inputs arrive as already-read text in the formats published with
//! Qwen2 checkpoints: `vocab.json`, `merges.txt` and `tokenizer_config.json`.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, TokenizerError};

/// Token that must exist in every supported vocabulary; stands in for the
/// unknown token when the configuration does not name a usable one.
pub const DEFAULT_UNK_TOKEN: &str = "<|endoftext|>";

/// Separates the two halves of a merge key. Byte-level text never contains
/// U+0000 because byte 0x00 is remapped to U+0100.
const PAIR_SEP: char = '\0';

/// Bidirectional token string <-> id table.
pub struct Vocab {
    token_to_id: HashMap<String, u32>,
    id_to_token: HashMap<u32, String>,
}

impl Vocab {
    /// Parse a flat JSON object of token string -> id.
    pub fn from_json(text: &str) -> Result<Self> {
        let token_to_id: HashMap<String, u32> =
            serde_json::from_str(text).map_err(TokenizerError::Vocab)?;
        let mut id_to_token = HashMap::with_capacity(token_to_id.len());
        for (token, &id) in &token_to_id {
            if let Some(existing) = id_to_token.insert(id, token.clone()) {
                let (first, second) = if existing <= *token {
                    (existing, token.clone())
                } else {
                    (token.clone(), existing)
                };
                return Err(TokenizerError::DuplicateId { id, first, second });
            }
        }
        Ok(Vocab {
            token_to_id,
            id_to_token,
        })
    }

    /// Insert `token` at `id` unless the string is already present.
    /// Returns false when the token already existed.
    pub fn insert_if_absent(&mut self, token: &str, id: u32) -> bool {
        if self.token_to_id.contains_key(token) {
            return false;
        }
        if let Some(previous) = self.id_to_token.get(&id) {
            warn!(id, previous = %previous, added = %token, "added token replaces existing id");
        }
        self.token_to_id.insert(token.to_string(), id);
        self.id_to_token.insert(id, token.to_string());
        true
    }

    #[inline]
    pub fn id(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    #[inline]
    pub fn token(&self, id: u32) -> Option<&str> {
        self.id_to_token.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.token_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_to_id.is_empty()
    }
}

/// Merge priorities keyed by `(left, right)`; lower rank merges first.
pub struct MergeRanks {
    ranks: HashMap<String, u32>,
}

impl MergeRanks {
    /// Read a `merges.txt` body. Blank lines and lines starting with `#` are
    /// skipped, as is anything that is not exactly two space-separated parts.
    /// Ranks follow file order; a repeated pair keeps its first rank.
    pub fn parse(text: &str) -> Self {
        let mut ranks = HashMap::new();
        let mut rank = 0u32;
        let mut skipped = 0usize;
        for line in text.split(['\r', '\n']) {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split(' ');
            let (Some(left), Some(right), None) = (parts.next(), parts.next(), parts.next()) else {
                skipped += 1;
                continue;
            };
            ranks.entry(pair_key(left, right)).or_insert(rank);
            rank += 1;
        }
        if skipped > 0 {
            debug!(skipped, "ignored malformed merge lines");
        }
        MergeRanks { ranks }
    }

    pub fn rank(&self, left: &str, right: &str) -> Option<u32> {
        let mut key = String::with_capacity(left.len() + right.len() + 1);
        self.rank_with(&mut key, left, right)
    }

    /// Same as [`MergeRanks::rank`] but reuses `buf` for the lookup key.
    #[inline]
    pub fn rank_with(&self, buf: &mut String, left: &str, right: &str) -> Option<u32> {
        buf.clear();
        buf.push_str(left);
        buf.push(PAIR_SEP);
        buf.push_str(right);
        self.ranks.get(buf.as_str()).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

fn pair_key(left: &str, right: &str) -> String {
    let mut key = String::with_capacity(left.len() + right.len() + 1);
    key.push_str(left);
    key.push(PAIR_SEP);
    key.push_str(right);
    key
}

/// A token field in `tokenizer_config.json`: either a bare string or an
/// AddedToken object carrying `content`.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
enum TokenName {
    Plain(String),
    Added { content: String },
}

impl TokenName {
    fn into_string(self) -> String {
        match self {
            TokenName::Plain(s) => s,
            TokenName::Added { content } => content,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AddedToken {
    pub content: String,
    #[serde(default)]
    pub special: bool,
}

#[derive(Deserialize, Debug)]
struct RawConfig {
    eos_token: Option<TokenName>,
    pad_token: Option<TokenName>,
    unk_token: Option<TokenName>,
    #[serde(default)]
    added_tokens_decoder: HashMap<String, AddedToken>,
}

/// The parts of `tokenizer_config.json` the tokenizer consumes.
#[derive(Debug, Clone)]
pub struct TokenizerConfig {
    pub eos_token: Option<String>,
    pub pad_token: Option<String>,
    pub unk_token: Option<String>,
    /// Added tokens in ascending id order.
    pub added_tokens: BTreeMap<u32, AddedToken>,
}

impl TokenizerConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text).map_err(TokenizerError::Config)?;
        let mut added_tokens = BTreeMap::new();
        for (key, token) in raw.added_tokens_decoder {
            let id = key
                .trim()
                .parse::<u32>()
                .map_err(|_| TokenizerError::InvalidAddedTokenId(key.clone()))?;
            added_tokens.insert(id, token);
        }
        Ok(TokenizerConfig {
            eos_token: raw.eos_token.map(TokenName::into_string),
            pad_token: raw.pad_token.map(TokenName::into_string),
            unk_token: raw.unk_token.map(TokenName::into_string),
            added_tokens,
        })
    }
}

/// Reserved ids resolved once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedIds {
    pub eos: u32,
    pub pad: u32,
    pub unk: u32,
}

impl ReservedIds {
    pub fn resolve(vocab: &Vocab, config: &TokenizerConfig) -> Result<Self> {
        let eos = required(vocab, "end-of-sequence", config.eos_token.as_deref())?;
        let pad = required(vocab, "pad", config.pad_token.as_deref())?;
        let unk = match config.unk_token.as_deref().and_then(|t| vocab.id(t)) {
            Some(id) => id,
            None => {
                let id = vocab.id(DEFAULT_UNK_TOKEN).ok_or_else(|| {
                    TokenizerError::MissingUnknownToken {
                        configured: config.unk_token.clone(),
                        fallback: DEFAULT_UNK_TOKEN,
                    }
                })?;
                if let Some(configured) = &config.unk_token {
                    warn!(
                        configured = %configured,
                        fallback = DEFAULT_UNK_TOKEN,
                        "unknown token not in vocabulary, using fallback"
                    );
                }
                id
            }
        };
        Ok(ReservedIds { eos, pad, unk })
    }
}

fn required(vocab: &Vocab, role: &'static str, token: Option<&str>) -> Result<u32> {
    let token = token.unwrap_or_default();
    vocab.id(token).ok_or_else(|| TokenizerError::MissingToken {
        role,
        token: token.to_string(),
    })
}
