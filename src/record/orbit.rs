use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{scale, RecordLayout, TIME_SCALE};
use crate::bytes::Span;
use crate::timecode::compose;
use crate::words::{Strategy, Word};

/// Number of words in an orbit document.
pub const ORBIT_DOCUMENT_WORDS: usize = 17;

/// Radiometer channel, identified by the orbit document data type code.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// 11.5µm atmospheric window channel.
    Window,
    /// 6.7µm water vapour channel.
    Vapour,
}

impl Channel {
    #[must_use]
    pub fn from_data_type(code: Word) -> Option<Self> {
        match code {
            Some(115) => Some(Channel::Window),
            Some(67) => Some(Channel::Vapour),
            _ => None,
        }
    }

    /// Nominal wavelength in micrometres.
    #[must_use]
    pub fn wavelength(&self) -> f64 {
        match self {
            Channel::Window => 11.5,
            Channel::Vapour => 6.7,
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Window => write!(f, "window"),
            Channel::Vapour => write!(f, "vapour"),
        }
    }
}

/// Per-file metadata decoded from the first block of a tape file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrbitDocument {
    pub data_type: Word,
    pub channel: Option<Channel>,
    pub start: Option<DateTime<Utc>>,
    pub start_day: Word,
    pub start_hour: Word,
    pub start_minute: Word,
    pub start_second: Word,
    /// End time; never before `start` when both are present.
    pub end: Option<DateTime<Utc>>,
    /// Scan mirror rotation rate in degrees per second.
    pub mirror_rate: Option<f64>,
    pub sample_frequency: Word,
    pub orbit: Word,
    pub station: Word,
    pub swath_block: Word,
    pub swaths_per_record: Word,
    pub locators: Word,
}

impl OrbitDocument {
    /// Decode an orbit document from a block. `year` is the year the tape was recorded,
    /// which the block itself does not contain.
    #[must_use]
    pub fn decode(span: Span<'_>, strategy: Strategy, year: i32) -> Self {
        let words = strategy.assemble(span, ORBIT_DOCUMENT_WORDS);

        let start = compose(year, words[2], words[3], words[4], words[5]);
        let mut end = compose(year, words[6], words[7], words[8], words[9]);
        if let (Some(s), Some(e)) = (start, end) {
            if e < s {
                warn!(start=%s, end=%e, "orbit document end precedes start; dropping end");
                end = None;
            }
        }

        let doc = OrbitDocument {
            data_type: words[0],
            channel: Channel::from_data_type(words[0]),
            start,
            start_day: words[2],
            start_hour: words[3],
            start_minute: words[4],
            start_second: words[5],
            end,
            mirror_rate: scale(words[10], TIME_SCALE).filter(|r| *r != 0.0),
            sample_frequency: words[11],
            orbit: words[12],
            station: words[13],
            swath_block: words[14],
            swaths_per_record: words[15],
            locators: words[16],
        };
        debug!(
            orbit = ?doc.orbit,
            channel = ?doc.channel,
            start = ?doc.start,
            end = ?doc.end,
            "decoded orbit document"
        );
        doc
    }

    /// The record layout, if all of its fields decoded to positive values.
    #[must_use]
    pub fn layout(&self) -> Option<RecordLayout> {
        let positive = |w: Word| w.filter(|v| *v > 0).and_then(|v| usize::try_from(v).ok());
        Some(RecordLayout {
            swath_block: positive(self.swath_block)?,
            swaths_per_record: positive(self.swaths_per_record)?,
            locators: positive(self.locators)?,
        })
    }

    /// Seconds per mirror rotation, i.e., per scan line.
    #[must_use]
    pub fn scan_period(&self) -> Option<f64> {
        self.mirror_rate.map(|rate| 360.0 / rate)
    }
}
