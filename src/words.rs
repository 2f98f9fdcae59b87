//! Reconstruction of 36-bit instrument words from tape bytes.
//!
//! The instrument's native unit is a 36-bit word, frequently used as two 18-bit
//! half-words. How those bits are laid out in the tape's 8-bit bytes depends on the
//! tape format [Generation](crate::Generation):
//!
//! * 6-bit format: each word occupies 6 bytes, with 6 data bits per byte. The
//!   remaining two bits of each byte are a parity and a check bit, and any byte
//!   failing validation makes the entire word undecodable.
//! * Packed format: all 8 bits are used, so two words occupy 9 bytes, the second
//!   starting half way through the 5th byte. There is no per-byte validation.
//!
//! In both cases bytes are taken most significant first, which reverses the byte
//! order of the recording hardware. Sign bits and flag bit positions used elsewhere
//! depend on this order.
use crate::bytes::Span;

/// A decoded word, or `None` if it could not be decoded.
pub type Word = Option<i64>;

/// Bytes per word in the 6-bit format.
pub const SIX_BIT_LEN: usize = 6;
/// Bytes per pair of words in the packed format.
pub const PACKED_LEN: usize = 9;

const HALF_MASK: i64 = 0x3_ffff;
const WORD_MASK: i64 = (1 << 36) - 1;
/// Sign bit of a sign-magnitude word.
pub const SIGN_BIT: i64 = 1 << 35;

/// Upper (most significant) 18 bits.
#[must_use]
pub fn high_half(word: Word) -> Word {
    word.map(|w| w >> 18)
}

/// Lower (least significant) 18 bits.
#[must_use]
pub fn low_half(word: Word) -> Word {
    word.map(|w| w & HALF_MASK)
}

/// Both half-words, upper first.
#[must_use]
pub fn halves(word: Word) -> [Word; 2] {
    [high_half(word), low_half(word)]
}

/// Interpret a word as sign-magnitude, with the sign at bit 35.
///
/// The magnitude is the low 32 bits read as a signed 32-bit value, matching how the
/// ground system widened these words.
#[must_use]
pub fn sign_magnitude(word: i64) -> i64 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let magnitude = i64::from(word as u32 as i32);
    if word & SIGN_BIT != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode one 6-bit format word from exactly 6 bytes.
///
/// Returns `None` if any byte is invalid or if `span` is not 6 bytes long.
#[must_use]
pub fn six_bit_word(span: Span<'_>) -> Word {
    if span.len() != SIX_BIT_LEN {
        return None;
    }
    let mut word: i64 = 0;
    for (idx, b) in span.bytes.iter().enumerate() {
        if !span.is_valid(idx) {
            return None;
        }
        word = (word << 6) | i64::from(b & 0x3f);
    }
    Some(word)
}

/// Decode a pair of packed format words from exactly 9 bytes.
///
/// The first 40 bits shifted right by 4 produce the first word, the last 36 bits
/// produce the second. Both are `None` if `bytes` is not 9 bytes long.
#[must_use]
pub fn packed_pair(bytes: &[u8]) -> (Word, Word) {
    if bytes.len() != PACKED_LEN {
        return (None, None);
    }
    let first = bytes[..5]
        .iter()
        .fold(0i64, |acc, b| (acc << 8) | i64::from(*b));
    let second = bytes[4..]
        .iter()
        .fold(0i64, |acc, b| (acc << 8) | i64::from(*b));
    (Some(first >> 4), Some(second & WORD_MASK))
}

/// Word assembly strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// 6 bytes per word, 6 data bits per byte, with per-byte validation.
    SixBit,
    /// 9 bytes per pair of words, starting at the first byte of the span.
    Packed,
    /// Packed words for a span starting at the 9 byte group whose second word is the
    /// first word wanted, i.e., the first word of the group is discarded.
    ///
    /// Used for the second swath of a pair sharing one span when the swath block
    /// size is odd, in which case that swath starts in the middle of a byte.
    PackedShifted,
}

impl Strategy {
    /// Lazily decode words from `span`. Packed spans are zero-padded to a multiple of
    /// 9 bytes, while a short trailing 6-bit group decodes as `None`.
    pub fn words<'a>(&self, span: Span<'a>) -> Box<dyn Iterator<Item = Word> + 'a> {
        match self {
            Strategy::SixBit => {
                let count = span.len().div_ceil(SIX_BIT_LEN);
                Box::new(
                    (0..count).map(move |i| six_bit_word(span.sub(i * SIX_BIT_LEN, SIX_BIT_LEN))),
                )
            }
            Strategy::Packed => Box::new(packed_words(span.bytes)),
            Strategy::PackedShifted => Box::new(packed_words(span.bytes).skip(1)),
        }
    }

    /// Decode exactly `count` words from `span`, stopping once `count` is reached.
    /// Words the span is too short to provide are `None`.
    #[must_use]
    pub fn assemble(&self, span: Span<'_>, count: usize) -> Vec<Word> {
        let mut words: Vec<Word> = self.words(span).take(count).collect();
        words.resize(count, None);
        words
    }

    /// Number of bytes occupied by `count` whole words, rounded up to whole 9 byte
    /// groups for packed formats.
    #[must_use]
    pub fn byte_len(&self, count: usize) -> usize {
        match self {
            Strategy::SixBit => count * SIX_BIT_LEN,
            Strategy::Packed | Strategy::PackedShifted => count.div_ceil(2) * PACKED_LEN,
        }
    }
}

fn packed_words(bytes: &[u8]) -> impl Iterator<Item = Word> {
    let mut padded = bytes.to_vec();
    let rem = padded.len() % PACKED_LEN;
    if rem != 0 {
        padded.resize(padded.len() + PACKED_LEN - rem, 0);
    }
    let groups = padded.len() / PACKED_LEN;
    (0..groups).flat_map(move |g| {
        let (first, second) = packed_pair(&padded[g * PACKED_LEN..(g + 1) * PACKED_LEN]);
        [first, second]
    })
}


#[cfg(test)]
mod tests {
    use super::testing::{encode_packed, encode_six_bit};
    use super::*;
    use crate::bytes::RawBlock;
    use crate::config::Parity;
    use rand::Rng;

    #[test]
    fn six_bit_round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..256 {
            let expected: i64 = rng.gen_range(0..(1 << 36));
            let block = RawBlock::tagged(encode_six_bit(expected), Parity::Even);
            assert_eq!(six_bit_word(block.all()), Some(expected));
        }
    }

    #[test]
    fn six_bit_invalid_byte_is_none() {
        let mut bytes = encode_six_bit(0x123_4567);
        bytes[3] ^= 0x40;
        let block = RawBlock::tagged(bytes, Parity::Even);
        assert_eq!(six_bit_word(block.all()), None);
    }

    #[test]
    fn six_bit_short_is_none() {
        let block = RawBlock::tagged(encode_six_bit(7)[..5].to_vec(), Parity::Even);
        assert_eq!(six_bit_word(block.all()), None);
    }

    #[test]
    fn six_bit_strategy_words() {
        let mut bytes = encode_six_bit(1);
        bytes.extend(encode_six_bit(2));
        bytes.extend(&[0, 0]);
        let block = RawBlock::tagged(bytes, Parity::Even);

        let words: Vec<Word> = Strategy::SixBit.words(block.all()).collect();
        assert_eq!(words, vec![Some(1), Some(2), None]);
        assert_eq!(
            Strategy::SixBit.assemble(block.all(), 4),
            vec![Some(1), Some(2), None, None]
        );
    }

    #[test]
    fn packed_round_trip() {
        let mut rng = rand::thread_rng();
        for _ in 0..256 {
            let a: i64 = rng.gen_range(0..(1 << 36));
            let b: i64 = rng.gen_range(0..(1 << 36));
            assert_eq!(packed_pair(&encode_packed(&[a, b])), (Some(a), Some(b)));
        }
    }

    #[test]
    fn packed_pair_known_bits() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0xf0, 0x00, 0x00, 0x00, 0x01];
        assert_eq!(packed_pair(&bytes), (Some(WORD_MASK), Some(1)));
        assert_eq!(packed_pair(&bytes[..8]), (None, None));
    }

    #[test]
    fn packed_pads_to_group() {
        let mut bytes = encode_packed(&[5, 6]);
        // first byte of a following group, remainder implicitly zero
        bytes.push(0x80);
        let span = Span::new(&bytes);

        let words = Strategy::Packed.assemble(span, 5);
        assert_eq!(words, vec![Some(5), Some(6), Some(1 << 35), Some(0), None]);
    }

    #[test]
    fn packed_shifted_skips_first_word() {
        // swath block of 3 words, so a pair span holds 6 words in 27 bytes with the
        // second swath starting half way through byte 13, in the group at byte 9
        let words: Vec<i64> = (10..16).collect();
        let bytes = encode_packed(&words);
        let span = Span::new(&bytes);

        assert_eq!(
            Strategy::Packed.assemble(span, 3),
            vec![Some(10), Some(11), Some(12)]
        );
        assert_eq!(
            Strategy::PackedShifted.assemble(span.skip(9), 3),
            vec![Some(13), Some(14), Some(15)]
        );
    }

    #[test]
    fn halves_and_sign() {
        let word = Some((3 << 18) | 9);
        assert_eq!(halves(word), [Some(3), Some(9)]);
        assert_eq!(halves(None), [None, None]);
        assert_eq!(sign_magnitude(SIGN_BIT | 100), -100);
        assert_eq!(sign_magnitude(100), 100);
    }

    #[test]
    fn byte_len() {
        assert_eq!(Strategy::SixBit.byte_len(38), 228);
        assert_eq!(Strategy::Packed.byte_len(38), 171);
        assert_eq!(Strategy::Packed.byte_len(37), 171);
    }
}
