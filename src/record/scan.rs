use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{scale, RecordLayout, SwathRecord, ANGLE_SCALE, EIGHTHS};
use crate::bytes::RawBlock;
use crate::config::DecodeConfig;
use crate::interp::GeoInterpolator;
use crate::satellite::Generation;
use crate::words::{halves, sign_magnitude, Word};

/// Number of leading words split into half-word fields.
pub(super) const HALF_WORD_FIELDS: usize = 7;

/// One scan record, i.e., every block after the orbit document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScanRecord {
    /// Day of year.
    pub day: Word,
    pub hour: Word,
    pub minute: Word,
    pub second: Word,
    /// Roll attitude error in degrees.
    pub roll: Option<f64>,
    /// Pitch attitude error in degrees.
    pub pitch: Option<f64>,
    /// Yaw attitude error in degrees.
    pub yaw: Option<f64>,
    /// Spacecraft height in km.
    pub height: Word,
    pub cell_temp: Word,
    pub electronics_temp: Word,
    /// Housing reference temperatures A through D.
    pub reference_temps: [Word; 4],
    /// Scan mirror nadir angle in degrees at each anchor point.
    pub nadir_angles: Vec<Option<f64>>,
    pub swaths: Vec<SwathRecord>,
}

impl ScanRecord {
    /// Decode a scan record and its swaths from a block.
    #[must_use]
    pub fn decode(
        block: &RawBlock,
        generation: Generation,
        layout: &RecordLayout,
        config: &DecodeConfig,
    ) -> Self {
        let strategy = generation.record_strategy();
        let header_words = HALF_WORD_FIELDS + layout.locators;
        let words = strategy.assemble(block.all(), header_words);

        let fields: Vec<Word> = words[..HALF_WORD_FIELDS]
            .iter()
            .flat_map(|w| halves(*w))
            .collect();
        let nadir_angles: Vec<Option<f64>> = words[HALF_WORD_FIELDS..]
            .iter()
            .map(|w| nadir_angle(*w, config.nadir_limit))
            .collect();

        let marker = strategy.byte_len(header_words);
        let interpolator = GeoInterpolator::with_config(config);
        let swaths: Vec<SwathRecord> = (0..layout.swaths_per_record)
            .map(|idx| {
                let (start, len) = generation.swath_span(idx, layout.swath_block);
                SwathRecord::decode(
                    block.span(marker + start, len),
                    generation.swath_strategy(idx, layout.swath_block),
                    layout,
                    &nadir_angles,
                    config.max_population,
                    &interpolator,
                )
            })
            .collect();

        let record = ScanRecord {
            day: fields[0],
            hour: fields[1],
            minute: fields[2],
            second: fields[3],
            roll: scale(fields[4], EIGHTHS),
            pitch: scale(fields[5], EIGHTHS),
            yaw: scale(fields[6], EIGHTHS),
            height: fields[7],
            cell_temp: fields[8],
            electronics_temp: fields[9],
            reference_temps: [fields[10], fields[11], fields[12], fields[13]],
            nadir_angles,
            swaths,
        };
        trace!(
            day = ?record.day,
            hour = ?record.hour,
            minute = ?record.minute,
            second = ?record.second,
            swaths = record.swaths.len(),
            "decoded scan record"
        );
        record
    }
}

/// Decode an anchor nadir angle from a sign-magnitude word, discarding raw magnitudes
/// beyond `limit`.
#[must_use]
pub fn nadir_angle(word: Word, limit: i64) -> Option<f64> {
    let raw = sign_magnitude(word?);
    if raw.abs() > limit {
        return None;
    }
    scale(Some(raw), ANGLE_SCALE)
}
