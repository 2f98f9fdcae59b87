//! Two-line element set catalogs.
//!
//! A catalog is a text file of consecutive element set line pairs, as distributed by
//! element set archives. Name lines, i.e., 3-line format, and blank lines are
//! ignored. Only the epoch is decoded; the element lines themselves are passed
//! through to the propagator.
use std::{fs, path::Path};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::satellite::Satellite;
use crate::{Error, Result};

/// Element set lines are truncated to this many characters, dropping anything past
/// the checksum column.
pub const LINE_LEN: usize = 69;

/// A single two-line element set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Tle {
    pub line1: String,
    pub line2: String,
    pub epoch: DateTime<Utc>,
}

impl Tle {
    /// Create an element set from its two lines.
    ///
    /// # Errors
    /// [Error::Tle] if the lines are not numbered 1 and 2 or the epoch cannot be
    /// decoded.
    pub fn new(line1: &str, line2: &str) -> Result<Self> {
        let line1 = truncate(line1);
        let line2 = truncate(line2);
        if !line1.starts_with("1 ") {
            return Err(Error::Tle(format!("expected line 1, got {line1:?}")));
        }
        if !line2.starts_with("2 ") {
            return Err(Error::Tle(format!("expected line 2, got {line2:?}")));
        }
        let epoch = epoch(&line1)?;
        Ok(Tle {
            line1,
            line2,
            epoch,
        })
    }
}

fn truncate(line: &str) -> String {
    line.trim_end().chars().take(LINE_LEN).collect()
}

/// Decode the epoch from line 1: a 2 digit year in columns 19-20, where years before
/// 50 are 20xx, and a fractional day of year in columns 21-32, where day 1.0 is
/// midnight on January 1st.
///
/// Tools that add the day number to January 1st as a duration place every epoch one
/// day later, so nearest set lookups close to the midpoint between two epochs will not
/// always agree with theirs.
fn epoch(line1: &str) -> Result<DateTime<Utc>> {
    let invalid = || Error::Tle(format!("invalid epoch in {line1:?}"));

    let year: i32 = line1
        .get(18..20)
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(invalid)?;
    let year = if year < 50 { 2000 + year } else { 1900 + year };
    let day: f64 = line1
        .get(20..32)
        .and_then(|s| s.trim().parse().ok())
        .filter(|d: &f64| d.is_finite() && *d >= 0.0)
        .ok_or_else(invalid)?;

    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(invalid)?;
    #[allow(clippy::cast_possible_truncation)]
    let millis = ((day - 1.0) * 86_400_000.0).round() as i64;
    Utc.from_utc_datetime(&jan1)
        .checked_add_signed(Duration::try_milliseconds(millis).ok_or_else(invalid)?)
        .ok_or_else(invalid)
}

/// An ordered collection of element sets for one satellite.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct TleCatalog {
    tles: Vec<Tle>,
}

impl TleCatalog {
    /// Parse catalog text.
    ///
    /// # Errors
    /// [Error::Tle] if a line 1 is not followed by its line 2, or an epoch is invalid.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text
            .lines()
            .map(str::trim_end)
            .filter(|l| l.starts_with("1 ") || l.starts_with("2 "));
        let mut tles = Vec::new();
        while let Some(line1) = lines.next() {
            let Some(line2) = lines.next() else {
                return Err(Error::Tle(format!("missing line 2 after {line1:?}")));
            };
            tles.push(Tle::new(line1, line2)?);
        }
        debug!(count = tles.len(), "parsed element sets");
        Ok(TleCatalog { tles })
    }

    /// Read and parse a catalog file.
    ///
    /// # Errors
    /// [Error::Io] if the file cannot be read, otherwise see [TleCatalog::parse].
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        TleCatalog::parse(&fs::read_to_string(path)?)
    }

    /// Read the catalog for `satellite` from `dir`, e.g., `<dir>/nimbus-5.txt`.
    ///
    /// # Errors
    /// See [TleCatalog::with_file].
    pub fn for_satellite<P: AsRef<Path>>(dir: P, satellite: Satellite) -> Result<Self> {
        TleCatalog::with_file(dir.as_ref().join(catalog_file_name(satellite)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tle> {
        self.tles.iter()
    }

    /// The element set whose epoch is closest to `t`, the first if there are several.
    #[must_use]
    pub fn nearest(&self, t: &DateTime<Utc>) -> Option<&Tle> {
        self.tles
            .iter()
            .min_by_key(|tle| (tle.epoch - *t).num_milliseconds().abs())
    }
}

/// Conventional catalog file name for `satellite`.
#[must_use]
pub fn catalog_file_name(satellite: Satellite) -> String {
    let number = match satellite {
        Satellite::Nimbus4 => 4,
        Satellite::Nimbus5 => 5,
        Satellite::Nimbus6 => 6,
    };
    format!("nimbus-{number}.txt")
}
