use qwentok::byte_level::ByteLevel;
use qwentok::{Tokenizer, TokenizerError};

const ENDOFTEXT: &str = "<|endoftext|>";
const IM_START: &str = "<|im_start|>";
const IM_END: &str = "<|im_end|>";

/// Vocabulary with every byte surrogate at id = byte value, a handful of
/// merged tokens after that, and the end-of-text marker.
fn byte_vocab(merged: &[&str]) -> String {
    let bl = ByteLevel::new();
    let mut map = serde_json::Map::new();
    for b in 0u8..=255 {
        map.insert(bl.byte_to_char(b).to_string(), (b as u32).into());
    }
    for (i, token) in merged.iter().enumerate() {
        map.insert(token.to_string(), (256 + i as u32).into());
    }
    map.insert(ENDOFTEXT.to_string(), 1000.into());
    serde_json::Value::Object(map).to_string()
}

fn chat_config() -> String {
    serde_json::json!({
        "eos_token": IM_END,
        "pad_token": ENDOFTEXT,
        "unk_token": null,
        "added_tokens_decoder": {
            "1000": {"content": ENDOFTEXT, "special": true},
            "1001": {"content": IM_START, "special": true},
            "1002": {"content": IM_END, "special": true},
            "1003": {"content": "<think>", "special": false}
        }
    })
    .to_string()
}

const MERGES: &str = "#version: 0.2\n\
                      \u{120} w\n\
                      h e\n\
                      l l\n\
                      o r\n\
                      he ll\n\
                      hell o\n\
                      \u{120}w or\n\
                      \u{120}wor l\n\
                      \u{120}worl d\n";

const MERGED: &[&str] = &[
    "\u{120}w", "he", "ll", "or", "hell", "hello", "\u{120}wor", "\u{120}worl", "\u{120}world",
];

fn chat_tokenizer() -> Tokenizer {
    Tokenizer::new(&byte_vocab(MERGED), MERGES, &chat_config()).unwrap()
}

#[test]
fn reference_scenario() {
    let vocab = r#"{"a": 0, "b": 1, "ab": 2, "<|end|>": 3}"#;
    let config = r#"{
        "eos_token": "<|end|>",
        "pad_token": "<|end|>",
        "unk_token": "<|end|>",
        "added_tokens_decoder": {"3": {"content": "<|end|>", "special": true}}
    }"#;
    let tok = Tokenizer::new(vocab, "a b", config).unwrap();
    assert_eq!(tok.encode("ab<|end|>"), vec![2, 3]);
    // "<|end|>" doubles as the unknown id here, so decode drops it.
    assert_eq!(tok.decode(&[2]), "ab");
}

#[test]
fn merges_produce_whole_words() {
    let tok = chat_tokenizer();
    let hello = tok.token_to_id("hello").unwrap();
    let world = tok.token_to_id("\u{120}world").unwrap();
    assert_eq!(tok.encode("hello world"), vec![hello, world]);
}

#[test]
fn ascii_round_trip() {
    let tok = chat_tokenizer();
    for text in [
        "hello world",
        "Hello, World! 123 it's fine.\n\n  indented\ttab",
        "   ",
        "a\r\nb",
    ] {
        assert_eq!(tok.decode(&tok.encode(text)), text);
    }
}

#[test]
fn multibyte_round_trip() {
    let tok = chat_tokenizer();
    let text = "naïve café 中文 🙂";
    let ids = tok.encode(text);
    // every byte of a non-ASCII char is its own token
    assert!(ids.len() > text.chars().count());
    assert_eq!(tok.decode(&ids), text);
}

#[test]
fn input_is_nfc_normalized() {
    let tok = chat_tokenizer();
    let decomposed = "e\u{301}";
    let composed = "\u{e9}";
    assert_eq!(tok.encode(decomposed), tok.encode(composed));
    assert_eq!(tok.decode(&tok.encode(decomposed)), composed);
}

#[test]
fn special_tokens_are_atomic() {
    let tok = chat_tokenizer();
    let start = 1001;
    let end = 1002;
    let ids = tok.encode("<|im_start|>user\nhello<|im_end|>");
    assert_eq!(ids.first(), Some(&start));
    assert_eq!(ids.last(), Some(&end));
    assert_eq!(ids.iter().filter(|&&id| id == start || id == end).count(), 2);

    for text in ["x<|im_end|>y", " <|im_end|> ", "<|im_end|><|im_end|>", "hello<|im_end|>world"] {
        let ids = tok.encode(text);
        assert_eq!(ids.iter().filter(|&&id| id == end).count(), text.matches(IM_END).count());
        assert_eq!(tok.decode(&ids), text);
    }
}

#[test]
fn non_special_added_token_is_tokenized_normally() {
    let tok = chat_tokenizer();
    assert_eq!(tok.token_to_id("<think>"), Some(1003));
    assert!(!tok.is_special("<think>"));
    let ids = tok.encode("<think>");
    assert!(!ids.contains(&1003));
    assert_eq!(tok.decode(&ids), "<think>");
}

#[test]
fn special_tokens_are_added_to_vocab() {
    let tok = chat_tokenizer();
    assert_eq!(tok.token_to_id(IM_START), Some(1001));
    assert_eq!(tok.id_to_token(1002), Some(IM_END));
    assert!(tok.is_special(IM_END));
    let mut specials: Vec<(&str, u32)> = tok.special_tokens().collect();
    specials.sort_by_key(|&(_, id)| id);
    assert_eq!(specials, vec![(ENDOFTEXT, 1000), (IM_START, 1001), (IM_END, 1002)]);
    assert_eq!(tok.vocab_size(), 256 + MERGED.len() + 4);
}

#[test]
fn reserved_ids_resolve() {
    let tok = chat_tokenizer();
    assert_eq!(tok.eos_token_id(), 1002);
    assert_eq!(tok.pad_token_id(), 1000);
    // unk_token is null, so the end-of-text fallback is used
    assert_eq!(tok.unk_token_id(), 1000);
}

#[test]
fn unknown_pieces_become_unk_and_decode_drops_them() {
    // Only "a", "b" and "ab" exist; no surrogate for space.
    let vocab = r#"{"a": 0, "b": 1, "ab": 2, "<unk>": 3, "<eos>": 4}"#;
    let config = r#"{"eos_token": "<eos>", "pad_token": "<eos>", "unk_token": "<unk>"}"#;
    let tok = Tokenizer::new(vocab, "a b\n", config).unwrap();
    let ids = tok.encode("ab ab");
    // " ab" stays as [Ġ, ab]; Ġ is not in the vocabulary
    assert_eq!(ids, vec![2, 3, 2]);
    assert_eq!(tok.decode(&ids), "abab");
}

#[test]
fn decode_drops_ids_outside_vocab() {
    let tok = chat_tokenizer();
    let hello = tok.token_to_id("hello").unwrap();
    assert_eq!(tok.decode(&[hello, 99_999, hello]), "hellohello");
}

#[test]
fn decode_of_truncated_multibyte_is_lossy() {
    let tok = chat_tokenizer();
    let ids = tok.encode("中");
    assert_eq!(ids.len(), 3);
    let partial = tok.decode(&ids[..2]);
    assert!(!partial.is_empty());
    assert!(partial.chars().all(|c| c == char::REPLACEMENT_CHARACTER));
}

#[test]
fn merge_priority_is_file_order() {
    let vocab = r#"{"a": 0, "b": 1, "c": 2, "ab": 3, "bc": 4, "<|endoftext|>": 5}"#;
    let config = r#"{"eos_token": "<|endoftext|>", "pad_token": "<|endoftext|>"}"#;

    // "b c" appears first, so it wins even though "a b" sorts earlier.
    let tok = Tokenizer::new(vocab, "b c\na b\n", config).unwrap();
    assert_eq!(tok.encode("abc"), vec![0, 4]);

    let tok = Tokenizer::new(vocab, "a b\nb c\n", config).unwrap();
    assert_eq!(tok.encode("abc"), vec![3, 2]);
}

#[test]
fn repeated_encode_is_stable() {
    let tok = chat_tokenizer();
    let text = "hello world hello world";
    let first = tok.encode(text);
    let cached = tok.cache_len();
    assert!(cached > 0);
    let second = tok.encode(text);
    assert_eq!(first, second);
    assert_eq!(tok.cache_len(), cached);
}

#[test]
fn batch_matches_sequential() {
    let tok = chat_tokenizer();
    let texts: Vec<String> = (0..64)
        .map(|i| format!("hello world {i} <|im_end|> item{}", i * 7))
        .collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let batch = tok.encode_batch(&refs);
    assert_eq!(batch.len(), texts.len());
    for (text, ids) in refs.iter().zip(&batch) {
        assert_eq!(&tok.encode(text), ids);
    }
}

#[test]
fn tokenizer_is_shareable_across_threads() {
    let tok = chat_tokenizer();
    let expected = tok.encode("hello world");
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| assert_eq!(tok.encode("hello world"), expected));
        }
    });
}

#[test]
fn count_tokens_matches_encode() {
    let tok = chat_tokenizer();
    let text = "<|im_start|>hello world, 42<|im_end|>";
    assert_eq!(tok.count_tokens(text), tok.encode(text).len());
}

#[test]
fn missing_eos_is_fatal() {
    let vocab = r#"{"<|endoftext|>": 0}"#;
    let config = r#"{"eos_token": "<|im_end|>", "pad_token": "<|endoftext|>"}"#;
    let err = Tokenizer::new(vocab, "", config).err().unwrap();
    assert!(matches!(
        err,
        TokenizerError::MissingToken { role: "end-of-sequence", ref token } if token == IM_END
    ));
}

#[test]
fn eos_from_added_tokens_resolves() {
    let vocab = r#"{"<|endoftext|>": 0}"#;
    let config = r#"{
        "eos_token": "<|im_end|>",
        "pad_token": "<|endoftext|>",
        "added_tokens_decoder": {"7": {"content": "<|im_end|>", "special": true}}
    }"#;
    let tok = Tokenizer::new(vocab, "", config).unwrap();
    assert_eq!(tok.eos_token_id(), 7);
}

#[test]
fn malformed_inputs_are_fatal() {
    let config = r#"{"eos_token": "a", "pad_token": "a"}"#;
    assert!(matches!(
        Tokenizer::new("[1, 2]", "", config),
        Err(TokenizerError::Vocab(_))
    ));
    assert!(matches!(
        Tokenizer::new(r#"{"a": 0}"#, "", "not json"),
        Err(TokenizerError::Config(_))
    ));
}

#[test]
fn digits_are_never_merged_across_chunks() {
    let vocab = r#"{"1": 0, "2": 1, "3": 2, "12": 3, "<|endoftext|>": 4}"#;
    let config = r#"{"eos_token": "<|endoftext|>", "pad_token": "<|endoftext|>"}"#;
    let tok = Tokenizer::new(vocab, "1 2\n", config).unwrap();
    assert_eq!(tok.encode("123"), vec![0, 1, 2]);
    assert_eq!(tok.encode("a12").len(), 3);
    assert_eq!(tok.decode(&[0, 1, 2]), "123");
}

#[test]
fn shared_vocab_id_is_fatal() {
    let vocab = r#"{"a": 0, "b": 0, "<|endoftext|>": 4}"#;
    let config = r#"{"eos_token": "<|endoftext|>", "pad_token": "<|endoftext|>"}"#;
    let err = Tokenizer::new(vocab, "", config).err().unwrap();
    assert!(matches!(err, TokenizerError::DuplicateId { id: 0, .. }));
}
