//! Variable-width LZW compression as used by GIF image data.

use std::collections::HashMap;

/// Dictionary capacity; the table is cleared once it holds this many codes.
pub const MAX_CODES: u16 = 4096;

/// Widest code GIF allows.
pub const MAX_CODE_WIDTH: u8 = 12;

/// Packs variable-width codes least-significant bit first.
#[derive(Debug, Default)]
struct BitWriter {
    bytes: Vec<u8>,
    acc: u32,
    bits: u8,
}

impl BitWriter {
    fn write(&mut self, code: u16, width: u8) {
        self.acc |= u32::from(code) << self.bits;
        self.bits += width;
        while self.bits >= 8 {
            self.bytes.push(self.acc as u8);
            self.acc >>= 8;
            self.bits -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.bytes.push(self.acc as u8);
        }
        self.bytes
    }
}

/// GIF LZW encoder state for one image.
///
/// The dictionary maps `(prefix code, next symbol)` to the code of the
/// extended string, so a match is extended one symbol at a time without
/// materializing strings.
#[derive(Debug)]
pub struct LzwEncoder {
    min_code_size: u8,
    clear_code: u16,
    end_code: u16,
    next_code: u16,
    width: u8,
    dictionary: HashMap<(u16, u8), u16>,
    out: BitWriter,
}

impl LzwEncoder {
    /// Create an encoder for symbols below `2^min_code_size`.
    ///
    /// `min_code_size` is clamped to GIF's valid range of 2..=8.
    pub fn new(min_code_size: u8) -> Self {
        let min_code_size = min_code_size.clamp(2, 8);
        let clear_code = 1u16 << min_code_size;
        Self {
            min_code_size,
            clear_code,
            end_code: clear_code + 1,
            next_code: clear_code + 2,
            width: min_code_size + 1,
            dictionary: HashMap::with_capacity(MAX_CODES as usize),
            out: BitWriter::default(),
        }
    }

    pub fn min_code_size(&self) -> u8 {
        self.min_code_size
    }

    fn reset(&mut self) {
        self.dictionary.clear();
        self.next_code = self.end_code + 1;
        self.width = self.min_code_size + 1;
    }

    fn emit(&mut self, code: u16) {
        self.out.write(code, self.width);
    }

    /// Widen codes once the next code to be assigned no longer fits. Checked
    /// after every emitted code, including the last one before End.
    fn grow(&mut self) {
        if self.next_code >= (1 << self.width) && self.width < MAX_CODE_WIDTH {
            self.width += 1;
        }
    }

    /// Compress `indices` into a packed code stream, framed by a leading
    /// Clear code and a trailing End-of-Information code.
    pub fn encode(mut self, indices: &[u8]) -> Vec<u8> {
        self.emit(self.clear_code);

        let Some((&first, rest)) = indices.split_first() else {
            self.emit(self.end_code);
            return self.out.finish();
        };

        let mut current = u16::from(first);
        for &symbol in rest {
            if let Some(&code) = self.dictionary.get(&(current, symbol)) {
                current = code;
                continue;
            }

            self.emit(current);
            self.grow();
            if self.next_code < MAX_CODES {
                self.dictionary.insert((current, symbol), self.next_code);
                self.next_code += 1;
            } else {
                self.emit(self.clear_code);
                self.reset();
            }
            current = u16::from(symbol);
        }

        self.emit(current);
        self.grow();
        self.emit(self.end_code);
        self.out.finish()
    }
}

/// Compress palette indices with the given minimum code size.
pub fn encode(indices: &[u8], min_code_size: u8) -> Vec<u8> {
    LzwEncoder::new(min_code_size).encode(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::gif::decode::decode_lzw;
    use proptest::prelude::*;

    #[test]
    fn test_bit_packing_lsb_first() {
        let mut w = BitWriter::default();
        w.write(0b101, 3);
        w.write(0b11111, 5);
        w.write(0x1FF, 9);
        assert_eq!(w.finish(), vec![0b1111_1101, 0xFF, 0x01]);
    }

    #[test]
    fn test_empty_input_is_clear_then_end() {
        // 9-bit codes 256 (clear) and 257 (end).
        assert_eq!(encode(&[], 8), vec![0x00, 0x03, 0x02]);
    }

    #[test]
    fn test_known_small_stream() {
        // min code size 2: clear=4, end=5, codes start at 6 with width 3.
        // Input 0 0 0 0: emits 4, 0, 6, 0, 5. Code 8 would be next after
        // the final 0, so End is written 4 bits wide.
        let bytes = encode(&[0, 0, 0, 0], 2);
        assert_eq!(bytes, vec![0b1000_0100, 0b0101_0001]);
        let decoded = decode_lzw(&bytes, 2).unwrap();
        assert_eq!(decoded.indices, vec![0, 0, 0, 0]);
        assert_eq!(decoded.codes, vec![4, 0, 6, 0, 5]);
    }

    #[test]
    fn test_width_grows_with_dictionary() {
        let indices: Vec<u8> = (0..=255).cycle().take(2000).collect();
        let bytes = encode(&indices, 8);
        let decoded = decode_lzw(&bytes, 8).unwrap();
        assert_eq!(decoded.indices, indices);
        assert!(decoded.max_width > 9);
    }

    #[test]
    fn test_full_dictionary_clears_and_resets() {
        let mut state = 0x1234_5678u32;
        let indices: Vec<u8> = (0..60_000)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            })
            .collect();

        let bytes = encode(&indices, 8);
        let decoded = decode_lzw(&bytes, 8).unwrap();
        assert_eq!(decoded.indices, indices);
        assert!(decoded.clear_codes > 1, "dictionary never reset");
        assert_eq!(decoded.max_width, MAX_CODE_WIDTH);
    }

    #[test]
    fn test_min_code_size_clamped() {
        assert_eq!(LzwEncoder::new(0).min_code_size(), 2);
        assert_eq!(LzwEncoder::new(12).min_code_size(), 8);
    }

    proptest! {
        #[test]
        fn prop_roundtrip_is_lossless(
            indices in prop::collection::vec(0u8..6, 0..5000),
        ) {
            let bytes = encode(&indices, 8);
            let decoded = decode_lzw(&bytes, 8).unwrap();
            prop_assert_eq!(decoded.indices, indices);
        }

        #[test]
        fn prop_roundtrip_small_alphabet(
            indices in prop::collection::vec(0u8..4, 1..3000),
        ) {
            let bytes = encode(&indices, 2);
            let decoded = decode_lzw(&bytes, 2).unwrap();
            prop_assert_eq!(decoded.indices, indices);
        }
    }
}
