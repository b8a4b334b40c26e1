//! Error types for data parsing in atmotube-types.

use thiserror::Error;

/// Errors that can occur when parsing Atmotube sensor data or identifiers.
///
/// Frame decoding itself never fails (unknown frames are reported as
/// unrecognized by the decoder); this type covers the fallible conversions
/// around it, such as hex input and characteristic names.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Data could not be interpreted.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A characteristic name or UUID that does not belong to the Atmotube PRO.
    #[error("Unknown characteristic: {0}")]
    UnknownCharacteristic(String),
}

/// Result type alias using atmotube-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
