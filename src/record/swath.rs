use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{scale, scale_checked, RecordLayout, ANGLE_SCALE, EIGHTHS, TIME_SCALE};
use crate::bytes::Span;
use crate::interp::GeoInterpolator;
use crate::words::{halves, Strategy, Word};

/// Largest valid brightness value.
const MAX_BRIGHTNESS: f64 = 400.0;

/// Instrument health flags carried by each swath.
///
/// Decoded from a 13 bit mask where bit 0 is the least significant. Bits 6, 9, 10
/// and 12 are unassigned.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwathFlags {
    /// At least one other flag is set.
    pub summary: bool,
    /// Sample rate, vehicle time and ground time are inconsistent.
    pub consistency: bool,
    pub bad_vehicle_time: bool,
    /// Vehicle time was inserted by the flywheel.
    pub flywheel_time: bool,
    /// Vehicle time carrier is absent.
    pub carrier_absent: bool,
    /// Vehicle time has skipped.
    pub time_skipped: bool,
    /// Bad sync pulse recognition.
    pub bad_sync: bool,
    /// Data signal dropout.
    pub dropout: bool,
    pub bad_swath_size: bool,
}

impl SwathFlags {
    /// Number of flags.
    pub const COUNT: usize = 9;
    /// Mask bit for each flag, in [SwathFlags::to_array] order.
    pub const BITS: [u32; SwathFlags::COUNT] = [0, 1, 2, 3, 4, 5, 7, 8, 11];

    #[must_use]
    pub fn from_word(word: i64) -> Self {
        let bit = |n: u32| word & (1 << n) != 0;
        let [
            summary,
            consistency,
            bad_vehicle_time,
            flywheel_time,
            carrier_absent,
            time_skipped,
            bad_sync,
            dropout,
            bad_swath_size,
        ] = SwathFlags::BITS.map(bit);
        SwathFlags {
            summary,
            consistency,
            bad_vehicle_time,
            flywheel_time,
            carrier_absent,
            time_skipped,
            bad_sync,
            dropout,
            bad_swath_size,
        }
    }

    /// Flags in mask bit order.
    #[must_use]
    pub fn to_array(&self) -> [bool; SwathFlags::COUNT] {
        [
            self.summary,
            self.consistency,
            self.bad_vehicle_time,
            self.flywheel_time,
            self.carrier_absent,
            self.time_skipped,
            self.bad_sync,
            self.dropout,
            self.bad_swath_size,
        ]
    }
}

/// One scan line of samples and their geolocation.
///
/// An empty swath, i.e., one whose population is missing, zero or implausibly large,
/// has `population` 0, no offset, flags or sub-satellite point, missing anchors, and
/// no samples.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SwathRecord {
    /// Seconds from the record time to this swath.
    pub offset: Option<f64>,
    /// Number of samples.
    pub population: usize,
    /// Sub-satellite colatitude.
    pub subsat_lat: Option<f64>,
    /// Sub-satellite west longitude.
    pub subsat_lon: Option<f64>,
    pub flags: Option<SwathFlags>,
    pub anchor_lats: Vec<Option<f64>>,
    pub anchor_lons: Vec<Option<f64>>,
    /// Brightness samples, `population` long.
    pub samples: Vec<Option<f64>>,
    /// Interpolated colatitude per sample.
    pub lats: Vec<Option<f64>>,
    /// Interpolated west longitude per sample.
    pub lons: Vec<Option<f64>>,
}

impl SwathRecord {
    /// Empty swath with anchors for `locators` anchor points.
    #[must_use]
    pub fn empty(locators: usize) -> Self {
        SwathRecord {
            offset: None,
            population: 0,
            subsat_lat: None,
            subsat_lon: None,
            flags: None,
            anchor_lats: vec![None; locators],
            anchor_lons: vec![None; locators],
            samples: Vec::new(),
            lats: Vec::new(),
            lons: Vec::new(),
        }
    }

    /// Decode a swath from its byte span. `nadir_angles` are the anchor nadir angles
    /// of the containing scan record.
    #[must_use]
    pub fn decode(
        span: Span<'_>,
        strategy: Strategy,
        layout: &RecordLayout,
        nadir_angles: &[Option<f64>],
        max_population: i64,
        interpolator: &GeoInterpolator,
    ) -> Self {
        let [offset, population] = halves(strategy.words(span).next().flatten());
        let population = match population {
            Some(pop) if pop > 0 && pop < max_population => usize::try_from(pop).ok(),
            _ => None,
        };
        let Some(population) = population else {
            trace!(?population, "empty swath");
            return SwathRecord::empty(layout.locators);
        };

        let sample_words = population.div_ceil(2);
        let words = strategy.assemble(span, 3 + layout.locators + sample_words);

        let [subsat_lat, subsat_lon] = halves(words[1]);
        let anchors = &words[3..3 + layout.locators];
        let (anchor_lats, anchor_lons): (Vec<_>, Vec<_>) = anchors
            .iter()
            .map(|w| {
                let [lat, lon] = halves(*w);
                (
                    scale_checked(lat, ANGLE_SCALE, 0.0, 180.0),
                    scale_checked(lon, ANGLE_SCALE, 0.0, 360.0),
                )
            })
            .unzip();
        let samples: Vec<Option<f64>> = words[3 + layout.locators..]
            .iter()
            .flat_map(|w| halves(*w))
            .take(population)
            .map(|w: Word| scale_checked(w, EIGHTHS, 0.0, MAX_BRIGHTNESS))
            .collect();

        let (lats, lons) =
            interpolator.interpolate(nadir_angles, &anchor_lats, &anchor_lons, population);

        SwathRecord {
            offset: scale(offset, TIME_SCALE),
            population,
            subsat_lat: scale_checked(subsat_lat, ANGLE_SCALE, 0.0, 180.0),
            subsat_lon: scale_checked(subsat_lon, ANGLE_SCALE, 0.0, 360.0),
            flags: words[2].map(SwathFlags::from_word),
            anchor_lats,
            anchor_lons,
            samples,
            lats,
            lons,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.population == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::RawBlock;
    use crate::config::Parity;
    use crate::words::testing::{encode_packed, encode_six_bit_words};

    const LAYOUT: RecordLayout = RecordLayout {
        swath_block: 12,
        swaths_per_record: 1,
        locators: 3,
    };

    fn half(high: i64, low: i64) -> i64 {
        (high << 18) | low
    }

    fn swath_words(population: i64) -> Vec<i64> {
        let mut words = vec![
            half(2 * 512, population),
            half(90 * 64, 10 * 64),
            0b1001_0000_0011,
        ];
        for i in 0..3 {
            words.push(half((89 + i) * 64, (9 + i) * 64));
        }
        // brightness values 200.0, 200.5, ...
        for i in 0..(population + 1) / 2 {
            words.push(half(1600 + 8 * i, 1604 + 8 * i));
        }
        words
    }

    fn nadirs() -> Vec<Option<f64>> {
        vec![Some(-10.0), Some(0.0), Some(10.0)]
    }

    #[test]
    fn decode_six_bit() {
        let block = RawBlock::tagged(encode_six_bit_words(&swath_words(5)), Parity::Even);
        let swath = SwathRecord::decode(
            block.all(),
            Strategy::SixBit,
            &LAYOUT,
            &nadirs(),
            600,
            &GeoInterpolator::default(),
        );

        assert_eq!(swath.offset, Some(2.0));
        assert_eq!(swath.population, 5);
        assert_eq!(swath.subsat_lat, Some(90.0));
        assert_eq!(swath.subsat_lon, Some(10.0));
        let flags = swath.flags.unwrap();
        assert!(flags.summary);
        assert!(flags.consistency);
        assert!(!flags.bad_vehicle_time);
        assert!(flags.dropout);
        assert!(flags.bad_swath_size);
        assert_eq!(swath.anchor_lats, vec![Some(89.0), Some(90.0), Some(91.0)]);
        assert_eq!(swath.anchor_lons, vec![Some(9.0), Some(10.0), Some(11.0)]);
        assert_eq!(
            swath.samples,
            vec![Some(200.0), Some(200.5), Some(201.0), Some(201.5), Some(202.0)]
        );
        assert_eq!(swath.lats.len(), 5);
        assert!((swath.lats[2].unwrap() - 90.0).abs() < 1e-9);
        assert!((swath.lons[4].unwrap() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn decode_packed() {
        let bytes = encode_packed(&swath_words(4));
        let swath = SwathRecord::decode(
            Span::new(&bytes),
            Strategy::Packed,
            &LAYOUT,
            &nadirs(),
            600,
            &GeoInterpolator::default(),
        );
        assert_eq!(swath.population, 4);
        assert_eq!(swath.samples.len(), 4);
        assert_eq!(swath.anchor_lats[1], Some(90.0));
    }

    #[test]
    fn invalid_population_is_empty() {
        for population in [0, 600, 1000] {
            let bytes = encode_packed(&swath_words(population));
            let swath = SwathRecord::decode(
                Span::new(&bytes),
                Strategy::Packed,
                &LAYOUT,
                &nadirs(),
                600,
                &GeoInterpolator::default(),
            );
            assert_eq!(swath, SwathRecord::empty(3), "population {population}");
            assert_eq!(swath.anchor_lats.len(), 3);
            assert!(swath.is_empty());
        }
    }

    #[test]
    fn corrupt_first_word_is_empty() {
        let mut bytes = encode_six_bit_words(&swath_words(5));
        bytes[0] |= 0x80;
        let block = RawBlock::tagged(bytes, Parity::Even);
        let swath = SwathRecord::decode(
            block.all(),
            Strategy::SixBit,
            &LAYOUT,
            &nadirs(),
            600,
            &GeoInterpolator::default(),
        );
        assert!(swath.is_empty());
    }

    #[test]
    fn truncated_samples_are_missing() {
        let words = swath_words(6);
        // drop the last sample word
        let bytes = encode_six_bit_words(&words[..words.len() - 1]);
        let block = RawBlock::tagged(bytes, Parity::Even);
        let swath = SwathRecord::decode(
            block.all(),
            Strategy::SixBit,
            &LAYOUT,
            &nadirs(),
            600,
            &GeoInterpolator::default(),
        );
        assert_eq!(swath.samples.len(), 6);
        assert_eq!(swath.samples[3], Some(201.5));
        assert_eq!(swath.samples[4], None);
        assert_eq!(swath.samples[5], None);
    }

    #[test]
    fn out_of_range_values() {
        let mut words = swath_words(2);
        words[1] = half(181 * 64, 361 * 64);
        words[6] = half(401 * 8, 8);
        let block = RawBlock::tagged(encode_six_bit_words(&words), Parity::Even);
        let swath = SwathRecord::decode(
            block.all(),
            Strategy::SixBit,
            &LAYOUT,
            &nadirs(),
            600,
            &GeoInterpolator::default(),
        );
        assert_eq!(swath.subsat_lat, None);
        assert_eq!(swath.subsat_lon, None);
        assert_eq!(swath.samples, vec![None, Some(1.0)]);
    }

    #[test]
    fn flag_bits() {
        let flags = SwathFlags::from_word(1 << 6 | 1 << 9 | 1 << 10 | 1 << 12);
        assert_eq!(flags, SwathFlags::default());
        let flags = SwathFlags::from_word(1 << 7);
        assert_eq!(
            flags.to_array(),
            [false, false, false, false, false, false, true, false, false]
        );
    }
}
