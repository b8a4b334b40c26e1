//! Error types for atmotube-core.
//!
//! Frame decoding never fails; unknown frames are reported as
//! [`Unrecognized`](crate::decode::Unrecognized) values instead. The errors
//! here cover the fallible edges of the crate: reading characteristics over
//! BLE, talking to PlanetWatch and building configuration.
//!
//! None of these errors are fatal to a [`DeviceSession`](crate::DeviceSession).
//! A failed poll simply means no upload happens on that tick.

use thiserror::Error;

use crate::sync::RemoteError;

/// Errors that can occur in atmotube-core.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Operation attempted while the peripheral is not connected.
    #[error("Not connected to device")]
    NotConnected,

    /// Required BLE characteristic not found on the peripheral.
    #[error("Characteristic not found: {uuid} ({available} characteristics discovered)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of characteristics the peripheral exposes.
        available: usize,
    },

    /// Reading from the device transport failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A PlanetWatch request failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, available: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            available,
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type alias using atmotube-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
