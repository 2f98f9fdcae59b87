//! Single pass decoding of a tape stream into the record model.
use std::{fs::File, io::BufReader, io::Read, path::Path};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bytes::RawBlock;
use crate::config::DecodeConfig;
use crate::framing::{Block, FrameScanner};
use crate::record::{OrbitDocument, RecordLayout, ScanRecord};
use crate::satellite::{year_from_file_name, Generation, Satellite};
use crate::{Error, Result};

/// The decoded contents of a tape file.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Decoded {
    pub satellite: Satellite,
    /// Year the tape was recorded.
    pub year: i32,
    pub orbit: OrbitDocument,
    /// Scan records in file order.
    pub records: Vec<ScanRecord>,
    /// Number of blocks after the orbit document that were not decoded.
    pub skipped: usize,
}

/// Decodes tape files for one satellite.
///
/// # Example
/// ```
/// use thir::{DecodeConfig, Satellite, TapeDecoder};
///
/// let decoder = TapeDecoder::new(Satellite::Nimbus4, 1970, DecodeConfig::default());
/// let zult = decoder.decode(std::io::empty());
/// assert!(zult.is_err());
/// ```
#[derive(Debug, Clone)]
pub struct TapeDecoder {
    satellite: Satellite,
    year: i32,
    config: DecodeConfig,
}

impl TapeDecoder {
    #[must_use]
    pub fn new(satellite: Satellite, year: i32, config: DecodeConfig) -> Self {
        TapeDecoder {
            satellite,
            year,
            config,
        }
    }

    /// Create a decoder using the satellite and year from a tape file's name.
    ///
    /// # Errors
    /// [Error::UnknownSatellite] or [Error::FileName] if the name does not follow the
    /// tape naming convention.
    pub fn for_file<P: AsRef<Path>>(path: P, config: DecodeConfig) -> Result<Self> {
        let satellite = Satellite::from_file_name(&path)?;
        let year = year_from_file_name(&path)?;
        Ok(TapeDecoder::new(satellite, year, config))
    }

    #[must_use]
    pub fn satellite(&self) -> Satellite {
        self.satellite
    }

    #[must_use]
    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decode a complete tape stream.
    ///
    /// # Errors
    /// [Error::NoOrbitDocument] if the stream contains no blocks, or [Error::Io] on
    /// read failures other than the stream ending.
    pub fn decode<R: Read>(&self, reader: R) -> Result<Decoded> {
        let mut scanner = FrameScanner::new(reader);

        let Some(first) = scanner.next_block()? else {
            return Err(Error::NoOrbitDocument);
        };
        if first.corrupt {
            warn!(
                offset = first.offset,
                "orbit document block is flagged corrupt, decoding anyway"
            );
        }
        let mut builder = DecodedBuilder::new(self, first);

        while let Some(block) = scanner.next_block()? {
            builder.push(self, block);
        }

        let decoded = builder.build(self);
        info!(
            satellite = %decoded.satellite,
            records = decoded.records.len(),
            skipped = decoded.skipped,
            "decoded tape"
        );
        Ok(decoded)
    }

    /// Open and decode the tape file at `path`.
    ///
    /// # Errors
    /// See [TapeDecoder::decode].
    pub fn decode_file<P: AsRef<Path>>(&self, path: P) -> Result<Decoded> {
        let file = File::open(path)?;
        self.decode(BufReader::new(file))
    }

    fn raw_block(&self, data: Vec<u8>) -> RawBlock {
        match self.satellite.generation() {
            Generation::A => RawBlock::tagged(data, self.config.parity),
            Generation::B => RawBlock::untagged(data),
        }
    }
}

/// Decoding state accumulated over a single pass.
struct DecodedBuilder {
    orbit: OrbitDocument,
    layout: Option<RecordLayout>,
    records: Vec<ScanRecord>,
    skipped: usize,
}

impl DecodedBuilder {
    fn new(decoder: &TapeDecoder, first: Block) -> Self {
        let raw = decoder.raw_block(first.data);
        let orbit = OrbitDocument::decode(
            raw.all(),
            decoder.satellite.generation().record_strategy(),
            decoder.year,
        );
        let layout = orbit.layout();
        if layout.is_none() {
            warn!(
                swath_block = ?orbit.swath_block,
                swaths_per_record = ?orbit.swaths_per_record,
                locators = ?orbit.locators,
                "orbit document has no usable record layout; scan records will be skipped"
            );
        }
        DecodedBuilder {
            orbit,
            layout,
            records: Vec::new(),
            skipped: 0,
        }
    }

    fn push(&mut self, decoder: &TapeDecoder, block: Block) {
        if block.corrupt {
            debug!(offset = block.offset, "skipping corrupt block");
            self.skipped += 1;
            return;
        }
        let Some(layout) = self.layout else {
            self.skipped += 1;
            return;
        };
        let offset = block.offset;
        if !layout.fits(decoder.satellite.generation(), block.data.len()) {
            warn!(
                offset,
                len = block.data.len(),
                swath_block = layout.swath_block,
                swaths_per_record = layout.swaths_per_record,
                locators = layout.locators,
                "record layout does not fit block; skipping"
            );
            self.skipped += 1;
            return;
        }
        let raw = decoder.raw_block(block.data);
        if raw.invalid_count() > 0 {
            debug!(
                offset,
                invalid = raw.invalid_count(),
                "block contains invalid bytes"
            );
        }
        self.records.push(ScanRecord::decode(
            &raw,
            decoder.satellite.generation(),
            &layout,
            &decoder.config,
        ));
    }

    fn build(self, decoder: &TapeDecoder) -> Decoded {
        Decoded {
            satellite: decoder.satellite,
            year: decoder.year,
            orbit: self.orbit,
            records: self.records,
            skipped: self.skipped,
        }
    }
}
