//! Error types for fetching, geometry evaluation and configuration.

use thiserror::Error;

/// Errors that abort a single refresh cycle.
///
/// Both variants drive the coordinator's backoff and are reported to the
/// caller that triggered the cycle. Neither discards the last published
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure, timeout, or an unexpected HTTP status.
    #[error("communication with warning feed failed: {0}")]
    Communication(String),

    /// The body of a 200 response could not be decoded.
    #[error("invalid response from warning feed: {0}")]
    InvalidResponse(String),
}

/// A warning-area geometry that could not be evaluated.
///
/// Never fatal: the area simply does not match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("geometry has no type")]
    MissingType,

    #[error("unsupported geometry type: {0}")]
    UnsupportedType(String),

    #[error("malformed coordinates in {0}")]
    MalformedCoordinates(&'static str),
}

/// Rejected user configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("radius {0} km is outside 1..=250 km")]
    RadiusOutOfRange(f64),

    #[error("latitude {0} is outside -90..=90")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside -180..=180")]
    LongitudeOutOfRange(f64),

    #[error("district code must not be empty")]
    EmptyDistrict,
}
