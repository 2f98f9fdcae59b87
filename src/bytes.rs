use crate::config::Parity;

const PARITY_BIT: u8 = 0b0100_0000;
const SIGN_BIT: u8 = 0b1000_0000;
const DATA_BITS: u8 = 0b0011_1111;

/// Returns true if `byte` passes the 6-bit tape format check, i.e., its parity bit agrees
/// with the number of set data bits and its sign bit is clear.
#[must_use]
pub fn validate(byte: u8, parity: Parity) -> bool {
    let odd = (byte & DATA_BITS).count_ones() % 2 == 1;
    let expect_set = match parity {
        Parity::Even => odd,
        Parity::Odd => !odd,
    };
    let parity_ok = ((byte & PARITY_BIT) != 0) == expect_set;
    parity_ok && (byte & SIGN_BIT) == 0
}

/// The bytes of one tape block, optionally paired with per-byte validity.
///
/// Only the 6-bit format carries validity; for the packed format every byte is
/// considered valid.
#[derive(Debug, Clone)]
pub struct RawBlock {
    bytes: Vec<u8>,
    valid: Option<Vec<bool>>,
}

impl RawBlock {
    /// Block of bytes validated per byte using [validate].
    #[must_use]
    pub fn tagged(bytes: Vec<u8>, parity: Parity) -> Self {
        let valid = bytes.iter().map(|b| validate(*b, parity)).collect();
        RawBlock {
            bytes,
            valid: Some(valid),
        }
    }

    /// Block of bytes with no validity information.
    #[must_use]
    pub fn untagged(bytes: Vec<u8>) -> Self {
        RawBlock { bytes, valid: None }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of bytes that failed validation.
    #[must_use]
    pub fn invalid_count(&self) -> usize {
        self.valid
            .as_ref()
            .map_or(0, |v| v.iter().filter(|ok| !**ok).count())
    }

    /// The entire block.
    #[must_use]
    pub fn all(&self) -> Span<'_> {
        self.span(0, self.bytes.len())
    }

    /// A view of `len` bytes starting at `start`, clipped to the end of the block.
    #[must_use]
    pub fn span(&self, start: usize, len: usize) -> Span<'_> {
        let start = start.min(self.bytes.len());
        let end = start.saturating_add(len).min(self.bytes.len());
        Span {
            bytes: &self.bytes[start..end],
            valid: self.valid.as_ref().map(|v| &v[start..end]),
        }
    }
}

/// Borrowed view into a [RawBlock].
#[derive(Debug, Clone, Copy)]
pub struct Span<'a> {
    pub bytes: &'a [u8],
    pub valid: Option<&'a [bool]>,
}

impl<'a> Span<'a> {
    /// Span over untagged bytes.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Span { bytes, valid: None }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn is_valid(&self, idx: usize) -> bool {
        self.valid.map_or(true, |v| v[idx])
    }

    /// Sub-span of `len` bytes starting at `start`, clipped to the end of this span.
    #[must_use]
    pub fn sub(&self, start: usize, len: usize) -> Span<'a> {
        let start = start.min(self.bytes.len());
        let end = start.saturating_add(len).min(self.bytes.len());
        Span {
            bytes: &self.bytes[start..end],
            valid: self.valid.map(|v| &v[start..end]),
        }
    }

    /// Sub-span starting at `start`, clipped to the end of this span.
    #[must_use]
    pub fn skip(&self, start: usize) -> Span<'a> {
        let start = start.min(self.bytes.len());
        Span {
            bytes: &self.bytes[start..],
            valid: self.valid.map(|v| &v[start..]),
        }
    }
}
