//! Seam for an external orbit propagation service.
//!
//! The grid assembler can cross-check the tape's own geolocation against positions
//! computed independently from orbital elements. This crate does no propagation
//! itself; callers supply a [Geolocator], typically backed by an SGP4 implementation
//! and a [crate::tle::TleCatalog].
use serde::{Deserialize, Serialize};

use crate::interp::linspace;
use crate::satellite::Satellite;
use crate::Result;

/// Everything needed to locate one scan line.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeolocationRequest {
    /// Scan line time in Unix seconds.
    pub epoch: f64,
    /// Number of samples in the scan line.
    pub population: usize,
    /// Anchor nadir angles in degrees, in anchor order.
    pub nadir_angles: Vec<f64>,
    /// Roll attitude in degrees.
    pub roll: f64,
    /// Pitch attitude in degrees.
    pub pitch: f64,
    /// Yaw attitude in degrees.
    pub yaw: f64,
    /// Spacecraft height in km, if known.
    pub height: Option<f64>,
    pub satellite: Satellite,
    /// Seconds per mirror rotation.
    pub scan_period: f64,
}

/// Per-sample positions for one scan line. Values a service could not compute are NaN.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Geolocation {
    /// East longitude in degrees.
    pub lon: Vec<f64>,
    /// Geodetic latitude in degrees.
    pub lat: Vec<f64>,
    /// Altitude in km.
    pub alt: Vec<f64>,
}

impl Geolocation {
    /// A geolocation of `len` NaN samples.
    #[must_use]
    pub fn missing(len: usize) -> Self {
        Geolocation {
            lon: vec![f64::NAN; len],
            lat: vec![f64::NAN; len],
            alt: vec![f64::NAN; len],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lon.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lon.is_empty()
    }
}

/// Computes per-sample positions for a scan line.
pub trait Geolocator {
    /// Locate every sample of the scan line described by `request`.
    ///
    /// # Errors
    /// [crate::Error::Geolocation] or [crate::Error::Tle] if the line cannot be
    /// located. The grid assembler logs the error and leaves the line missing.
    fn estimate_geolocation(&self, request: &GeolocationRequest) -> Result<Geolocation>;
}

impl<F> Geolocator for F
where
    F: Fn(&GeolocationRequest) -> Result<Geolocation>,
{
    fn estimate_geolocation(&self, request: &GeolocationRequest) -> Result<Geolocation> {
        self(request)
    }
}

/// Instrument viewing geometry for one scan line.
///
/// The mirror sweeps from the last anchor's nadir angle to the first, so sample 0
/// views `nadir_angles[last]`. Sample times are seconds from the line time, derived
/// from the mirror position at each end of the sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanGeometry {
    /// Across track view angle per sample, in radians.
    pub angles: Vec<f64>,
    /// Seconds from the line time per sample.
    pub times: Vec<f64>,
}

impl ScanGeometry {
    #[must_use]
    pub fn new(request: &GeolocationRequest) -> Self {
        let (Some(first), Some(last)) = (
            request.nadir_angles.first().copied(),
            request.nadir_angles.last().copied(),
        ) else {
            return ScanGeometry {
                angles: Vec::new(),
                times: Vec::new(),
            };
        };
        let per_degree = request.scan_period / 360.0;
        let start = per_degree * (180.0 + first);
        let end = per_degree * (180.0 + last);
        ScanGeometry {
            angles: linspace(last, first, request.population)
                .into_iter()
                .map(f64::to_radians)
                .collect(),
            times: linspace(start, end, request.population),
        }
    }

    /// View angles in degrees.
    #[must_use]
    pub fn view_angles(&self) -> Vec<f64> {
        self.angles.iter().map(|a| a.to_degrees()).collect()
    }
}
