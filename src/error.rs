use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("invalid vocabulary JSON: {0}")]
    Vocab(#[source] serde_json::Error),

    #[error("invalid tokenizer config JSON: {0}")]
    Config(#[source] serde_json::Error),

    #[error("vocabulary id {id} assigned to both {first:?} and {second:?}")]
    DuplicateId { id: u32, first: String, second: String },

    #[error("invalid added token id: {0:?}")]
    InvalidAddedTokenId(String),

    #[error("{role} token {token:?} not found in vocabulary")]
    MissingToken { role: &'static str, token: String },

    #[error("unknown token {configured:?} and fallback {fallback:?} not found in vocabulary")]
    MissingUnknownToken {
        configured: Option<String>,
        fallback: &'static str,
    },

    #[error("invalid pre-tokenizer pattern: {0}")]
    Pattern(#[from] fancy_regex::Error),

    #[error("cannot build special token matcher: {0}")]
    SpecialPattern(#[from] aho_corasick::BuildError),
}

pub type Result<T> = std::result::Result<T, TokenizerError>;
