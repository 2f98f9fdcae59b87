//! Decoder tuning knobs.
use std::{fs::File, path::Path};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{Error, Result};

/// Sense of the per-byte parity bit used by the 6-bit tape format.
///
/// With [Parity::Even] a byte whose low 6 bits contain an even number of set bits must
/// have its parity bit (bit 6) clear, and an odd number requires it set.
/// [Parity::Odd] inverts that expectation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    Even,
    Odd,
}

/// Decoding configuration.
///
/// # Example
/// ```
/// use thir::{DecodeConfig, Parity};
///
/// let config = DecodeConfig::builder()
///     .parity(Parity::Odd)
///     .longitude_tolerance(10.0)
///     .build();
/// assert_eq!(config.interpolation_points, 5);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TypedBuilder)]
#[serde(default)]
pub struct DecodeConfig {
    #[builder(default)]
    pub parity: Parity,
    /// Degrees an interpolated longitude may overshoot [0, 360] and still be folded
    /// back into range.
    #[builder(default = 15.0)]
    pub longitude_tolerance: f64,
    /// Number of anchor points used for each Lagrange interpolation. Must be odd.
    #[builder(default = 5)]
    pub interpolation_points: usize,
    /// Swath data populations at or above this are treated as corrupt.
    #[builder(default = 600)]
    pub max_population: i64,
    /// Largest valid magnitude of a raw anchor nadir angle word.
    #[builder(default = 4000)]
    pub nadir_limit: i64,
    /// Scan period in seconds used when the orbit document has no usable mirror
    /// rotation rate.
    #[builder(default = 1.25)]
    pub default_scan_period: f64,
    /// Upper bound on the number of scan lines in an assembled grid.
    #[builder(default = 200_000)]
    pub max_scan_lines: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DecodeConfig {
    /// Load configuration from a JSON file. Missing keys take their default values.
    ///
    /// # Errors
    /// [Error::Io] if the file cannot be read, [Error::Json] if it is not valid, or
    /// [Error::Config] if a value is out of range.
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: DecodeConfig = serde_json::from_reader(File::open(path)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values for internal consistency.
    ///
    /// # Errors
    /// [Error::Config] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.interpolation_points == 0 || self.interpolation_points % 2 == 0 {
            return Err(Error::Config(format!(
                "interpolation_points must be odd and positive, got {}",
                self.interpolation_points
            )));
        }
        if !(self.longitude_tolerance >= 0.0) {
            return Err(Error::Config(format!(
                "longitude_tolerance must be >= 0, got {}",
                self.longitude_tolerance
            )));
        }
        if !(self.default_scan_period > 0.0) {
            return Err(Error::Config(format!(
                "default_scan_period must be > 0, got {}",
                self.default_scan_period
            )));
        }
        if self.max_population <= 0 {
            return Err(Error::Config(format!(
                "max_population must be > 0, got {}",
                self.max_population
            )));
        }
        if self.max_scan_lines == 0 {
            return Err(Error::Config("max_scan_lines must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn defaults() {
        let config = DecodeConfig::default();
        assert_eq!(config.parity, Parity::Even);
        assert_eq!(config.longitude_tolerance, 15.0);
        assert_eq!(config.interpolation_points, 5);
        assert_eq!(config.max_population, 600);
        assert_eq!(config.nadir_limit, 4000);
        assert_eq!(config.default_scan_period, 1.25);
        config.validate().unwrap();
    }

    #[test]
    fn with_file_fills_missing_keys() {
        let tmpdir = tempfile::tempdir().unwrap();
        let path = tmpdir.path().join("thir.json");
        fs::write(&path, r#"{"parity": "odd", "longitude_tolerance": 5.0}"#).unwrap();

        let config = DecodeConfig::with_file(&path).unwrap();
        assert_eq!(config.parity, Parity::Odd);
        assert_eq!(config.longitude_tolerance, 5.0);
        assert_eq!(config.interpolation_points, 5);
    }

    #[test]
    fn with_file_rejects_even_window() {
        let tmpdir = tempfile::tempdir().unwrap();
        let path = tmpdir.path().join("thir.json");
        fs::write(&path, r#"{"interpolation_points": 4}"#).unwrap();

        let zult = DecodeConfig::with_file(&path);
        assert!(matches!(zult, Err(Error::Config(_))), "got {zult:?}");
    }

    #[test]
    fn with_file_missing() {
        let zult = DecodeConfig::with_file("/no/such/thir.json");
        assert!(matches!(zult, Err(Error::Io(_))), "got {zult:?}");
    }
}
