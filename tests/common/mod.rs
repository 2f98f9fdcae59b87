//! Synthetic tape construction.
#![allow(dead_code)]

pub const SIGN_BIT: i64 = 1 << 35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Nimbus 4 6-bit bytes with even parity.
    SixBit,
    /// Nimbus 5 and 6 packed 36-bit words.
    Packed,
}

#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub swath_block: usize,
    pub swaths_per_record: usize,
    pub locators: usize,
}

pub fn half(high: i64, low: i64) -> i64 {
    (high << 18) | low
}

pub fn sign_magnitude(value: i64) -> i64 {
    if value < 0 {
        SIGN_BIT | -value
    } else {
        value
    }
}

fn with_parity(data: u8) -> u8 {
    if data.count_ones() % 2 == 1 {
        data | 0x40
    } else {
        data
    }
}

pub fn encode_six_bit(words: &[i64]) -> Vec<u8> {
    words
        .iter()
        .flat_map(|w| (0..6).rev().map(move |i| with_parity(((w >> (6 * i)) & 0x3f) as u8)))
        .collect()
}

pub fn encode_packed(words: &[i64]) -> Vec<u8> {
    let mut out = Vec::new();
    for pair in words.chunks(2) {
        let first = pair[0] as u128;
        let second = pair.get(1).copied().unwrap_or(0) as u128;
        let bits = (first << 36) | second;
        out.extend((0..9).map(|i| (bits >> (8 * (8 - i))) as u8));
    }
    out
}

impl Format {
    pub fn encode(&self, words: &[i64]) -> Vec<u8> {
        match self {
            Format::SixBit => encode_six_bit(words),
            Format::Packed => encode_packed(words),
        }
    }
}

/// Orbit document for day 110, 00:38:37 through 00:40:00, with a 1.25 second scan
/// period.
pub fn orbit_words(data_type: i64, layout: &Layout) -> Vec<i64> {
    vec![
        data_type,
        0,
        110,
        0,
        38,
        37,
        110,
        0,
        40,
        0,
        288 * 512,
        4,
        159,
        7,
        layout.swath_block as i64,
        layout.swaths_per_record as i64,
        layout.locators as i64,
    ]
}

/// Scan record header words for day 110 00:38:`second`, followed by `nadir_angles`.
pub fn record_header(second: i64, nadir_angles: &[f64]) -> Vec<i64> {
    let mut words = vec![
        half(110, 0),
        half(38, second),
        half(90 * 8, 91 * 8),
        half(89 * 8, 1100),
        half(250, 251),
        half(252, 253),
        half(254, 255),
    ];
    words.extend(
        nadir_angles
            .iter()
            .map(|a| sign_magnitude((a * 64.0).round() as i64)),
    );
    words
}

#[derive(Debug, Clone)]
pub struct Swath {
    /// Seconds from the record time.
    pub offset: f64,
    pub samples: Vec<f64>,
    /// Anchor colatitudes.
    pub anchor_lats: Vec<f64>,
    /// Anchor west longitudes.
    pub anchor_lons: Vec<f64>,
}

impl Swath {
    pub fn words(&self, swath_block: usize) -> Vec<i64> {
        let population = self.samples.len() as i64;
        let mut words = vec![
            half((self.offset * 512.0).round() as i64, population),
            half(100 * 64, 350 * 64),
            0b11,
        ];
        for (lat, lon) in self.anchor_lats.iter().zip(&self.anchor_lons) {
            words.push(half((lat * 64.0).round() as i64, (lon * 64.0).round() as i64));
        }
        let samples: Vec<i64> = self
            .samples
            .iter()
            .map(|s| (s * 8.0).round() as i64)
            .collect();
        for pair in samples.chunks(2) {
            words.push(half(pair[0], pair.get(1).copied().unwrap_or(0)));
        }
        assert!(words.len() <= swath_block, "swath does not fit its block");
        words.resize(swath_block, 0);
        words
    }
}

/// Block bytes for a scan record.
pub fn record_block(
    format: Format,
    header: &[i64],
    swaths: &[Swath],
    swath_block: usize,
) -> Vec<u8> {
    let swath_words: Vec<i64> = swaths.iter().flat_map(|s| s.words(swath_block)).collect();
    match format {
        Format::SixBit => {
            let mut words = header.to_vec();
            words.extend(swath_words);
            encode_six_bit(&words)
        }
        Format::Packed => {
            let mut bytes = encode_packed(header);
            bytes.extend(encode_packed(&swath_words));
            bytes
        }
    }
}

/// Builds a framed tape byte stream.
#[derive(Debug, Default)]
pub struct Tape {
    buf: Vec<u8>,
}

impl Tape {
    pub fn new() -> Self {
        Tape::default()
    }

    /// Append a block with a matching header and footer.
    pub fn block(self, data: &[u8]) -> Self {
        let len = data.len() as u32;
        self.framed(len, data, Some(len))
    }

    /// Append a block with an explicit header and optional footer.
    pub fn framed(mut self, header: u32, data: &[u8], footer: Option<u32>) -> Self {
        self.buf.extend(header.to_le_bytes());
        self.buf.extend(data);
        if let Some(footer) = footer {
            self.buf.extend(footer.to_le_bytes());
        }
        self
    }

    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.buf.extend(data);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}
