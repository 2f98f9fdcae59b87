//! The decoded tape record model.
//!
//! A tape file consists of a single [OrbitDocument] block followed by any number of
//! [ScanRecord] blocks, each of which embeds a fixed number of [SwathRecord]s. The
//! orbit document provides the [RecordLayout] needed to decode everything after it.
//!
//! Fields that cannot be decoded, or decode to a physically impossible value, are
//! `None` rather than failing the record.
mod orbit;
mod scan;
mod swath;

use serde::{Deserialize, Serialize};

pub use orbit::{Channel, OrbitDocument};
pub use scan::ScanRecord;
pub use swath::{SwathFlags, SwathRecord};

use crate::satellite::Generation;
use crate::words::{Word, PACKED_LEN};

/// Scale factor for times in 1/512 second units.
pub(crate) const TIME_SCALE: f64 = 512.0;
/// Scale factor for attitude and brightness values in 1/8 units.
pub(crate) const EIGHTHS: f64 = 8.0;
/// Scale factor for angles in 1/64 degree units.
pub(crate) const ANGLE_SCALE: f64 = 64.0;

/// Geometry of the scan records in a file, from its [OrbitDocument].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    /// Words per swath.
    pub swath_block: usize,
    pub swaths_per_record: usize,
    /// Number of anchor (locator) points per swath.
    pub locators: usize,
}

impl RecordLayout {
    /// Returns true if a block of `len` bytes can hold the scan record header and the
    /// start of every swath.
    ///
    /// Layout words are not protected by parity on packed tapes, so a corrupt orbit
    /// document can describe records far larger than any block.
    #[must_use]
    pub fn fits(&self, generation: Generation, len: usize) -> bool {
        if self.swath_block > len || self.swaths_per_record > len || self.locators > len {
            return false;
        }
        // bound for every swath offset, so the span arithmetic below cannot overflow
        let bounded = self
            .swaths_per_record
            .checked_mul(self.swath_block)
            .and_then(|n| n.checked_mul(PACKED_LEN))
            .is_some();
        if !bounded {
            return false;
        }
        let header = generation
            .record_strategy()
            .byte_len(scan::HALF_WORD_FIELDS + self.locators);
        let (last, _) = generation.swath_span(
            self.swaths_per_record.saturating_sub(1),
            self.swath_block,
        );
        header.checked_add(last).is_some_and(|end| end <= len)
    }
}

/// Scale a word by `1/factor`.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn scale(word: Word, factor: f64) -> Option<f64> {
    word.map(|w| w as f64 / factor)
}

/// Scale a word by `1/factor`, discarding results outside `[min, max]`.
pub(crate) fn scale_checked(word: Word, factor: f64, min: f64, max: f64) -> Option<f64> {
    scale(word, factor).filter(|v| (min..=max).contains(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: RecordLayout = RecordLayout {
        swath_block: 10,
        swaths_per_record: 4,
        locators: 3,
    };

    #[test]
    fn layout_fits() {
        // header 10 words, last swath starts 30 words later
        assert!(LAYOUT.fits(Generation::A, 40 * 6));
        assert!(!LAYOUT.fits(Generation::A, 40 * 6 - 1));
        // header 45 bytes, last pair at 90 bytes, second of the pair 45 bytes later
        assert!(LAYOUT.fits(Generation::B, 180));
        assert!(!LAYOUT.fits(Generation::B, 179));
    }

    #[test]
    fn oversized_layout_does_not_fit() {
        let huge = RecordLayout {
            locators: 1 << 28,
            ..LAYOUT
        };
        assert!(!huge.fits(Generation::B, 90));
        let huge = RecordLayout {
            swaths_per_record: 1 << 30,
            ..LAYOUT
        };
        assert!(!huge.fits(Generation::A, 4800));
        let huge = RecordLayout {
            swath_block: usize::MAX,
            swaths_per_record: usize::MAX,
            locators: 1,
        };
        assert!(!huge.fits(Generation::B, usize::MAX));
    }

    #[test]
    fn scaling() {
        assert_eq!(scale(Some(1024), TIME_SCALE), Some(2.0));
        assert_eq!(scale(None, TIME_SCALE), None);
        assert_eq!(scale_checked(Some(64 * 180), ANGLE_SCALE, 0.0, 180.0), Some(180.0));
        assert_eq!(scale_checked(Some(64 * 180 + 1), ANGLE_SCALE, 0.0, 180.0), None);
        assert_eq!(scale_checked(Some(-1), ANGLE_SCALE, 0.0, 180.0), None);
    }
}
