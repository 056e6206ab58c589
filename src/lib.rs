//! Byte-level BPE tokenizer reproducing the Qwen2/GPT-2 scheme: text is
//! mapped to printable byte surrogates, merged by a ranked pair table and
//! looked up in a fixed vocabulary.
//!
//! ```no_run
//! # fn main() -> qwentok::Result<()> {
//! let vocab = std::fs::read_to_string("vocab.json").unwrap();
//! let merges = std::fs::read_to_string("merges.txt").unwrap();
//! let config = std::fs::read_to_string("tokenizer_config.json").unwrap();
//! let tok = qwentok::Tokenizer::new(&vocab, &merges, &config)?;
//! let ids = tok.encode("Hello world");
//! assert_eq!(tok.decode(&ids), "Hello world");
//! # Ok(())
//! # }
//! ```

pub mod bpe;
pub mod byte_level;
pub mod error;
pub mod pretokenize;
pub mod special;
pub mod tokenizer;
pub mod vocab;

pub use error::{Result, TokenizerError};
pub use tokenizer::Tokenizer;
