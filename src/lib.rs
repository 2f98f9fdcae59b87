#![doc = include_str!("../README.md")]

mod error;

pub mod astronomy;
pub mod bytes;
pub mod config;
pub mod decoder;
pub mod framing;
pub mod geoloc;
pub mod grid;
pub mod interp;
pub mod record;
pub mod satellite;
pub mod timecode;
pub mod tle;
pub mod words;

pub use config::{DecodeConfig, Parity};
pub use decoder::{Decoded, TapeDecoder};
pub use error::{Error, Result};
pub use geoloc::{Geolocation, GeolocationRequest, Geolocator};
pub use grid::{TimeSeriesAssembler, TimeSeriesGrid};
pub use satellite::{Generation, Satellite};
