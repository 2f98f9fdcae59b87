#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The satellite, and therefore the tape format, could not be determined. This is
    /// caller misuse rather than data corruption and is never recovered from.
    #[error("unrecognized satellite: {0}")]
    UnknownSatellite(String),

    #[error("cannot determine year from file name: {0}")]
    FileName(String),

    /// The stream ended before the first block could be read.
    #[error("no orbit documentation record found")]
    NoOrbitDocument,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid element set: {0}")]
    Tle(String),

    /// Failure reported by an external geolocation service.
    #[error("geolocation failed: {0}")]
    Geolocation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
