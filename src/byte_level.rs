/// GPT-2 byte-level encoding: maps each byte 0x00..0xFF to a unique Unicode
/// character so that BPE merges operate on displayable strings.
///
/// Printable ASCII + Latin-1 supplement map to themselves; control characters
/// and the few gaps (0x00-0x20, 0x7F-0xA0, 0xAD) map to U+0100..U+0143.
pub fn byte_to_char_table() -> [char; 256] {
    let mut table = ['\0'; 256];
    let mut n: u32 = 0;
    for b in 0u16..256 {
        let cp = match b as u8 {
            0x21..=0x7E | 0xA1..=0xAC | 0xAE..=0xFF => b as u32,
            _ => {
                let c = 0x100 + n;
                n += 1;
                c
            }
        };
        // Every value here is below U+0144, far from the surrogate range.
        table[b as usize] = char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER);
    }
    table
}

/// Both directions of the byte-level mapping, built once per tokenizer.
#[derive(Clone)]
pub struct ByteLevel {
    encode: [char; 256],
    // Indexed by code point; the highest surrogate is U+0143.
    decode: [Option<u8>; 0x144],
}

impl ByteLevel {
    pub fn new() -> Self {
        let encode = byte_to_char_table();
        let mut decode = [None; 0x144];
        for (b, &ch) in encode.iter().enumerate() {
            decode[ch as usize] = Some(b as u8);
        }
        ByteLevel { encode, decode }
    }

    #[inline]
    pub fn byte_to_char(&self, b: u8) -> char {
        self.encode[b as usize]
    }

    #[inline]
    pub fn char_to_byte(&self, ch: char) -> Option<u8> {
        self.decode.get(ch as usize).copied().flatten()
    }

    /// Encode raw bytes into the GPT-2 unicode representation.
    pub fn encode_bytes(&self, input: &[u8]) -> String {
        let mut out = String::with_capacity(input.len() * 2);
        for &b in input {
            out.push(self.byte_to_char(b));
        }
        out
    }

    /// Map surrogate text back to raw bytes, dropping characters that are not
    /// part of the mapping.
    pub fn decode_chars(&self, text: &str) -> Vec<u8> {
        text.chars().filter_map(|ch| self.char_to_byte(ch)).collect()
    }
}

impl Default for ByteLevel {
    fn default() -> Self {
        Self::new()
    }
}
