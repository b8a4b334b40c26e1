//! Trait abstractions for the collaborators of a device session.
//!
//! A [`DeviceSession`](crate::DeviceSession) never talks to the BLE stack, the
//! network or the system clock directly. It goes through these traits, which
//! have real implementations ([`BlePeripheralReader`](crate::ble::BlePeripheralReader),
//! `HttpTransport`, [`SystemClock`]) and mocks for testing.

use async_trait::async_trait;
use time::OffsetDateTime;

use atmotube_types::CharacteristicKind;

use crate::error::Result;
use crate::sync::{OutboundRequest, RemoteError, RemoteResponse};

/// Reads raw characteristic values from a connected device.
///
/// # Example
///
/// ```ignore
/// use atmotube_core::{CharacteristicReader, Result};
/// use atmotube_types::CharacteristicKind;
///
/// async fn dump<R: CharacteristicReader>(reader: &R) -> Result<()> {
///     let bytes = reader.read_characteristic(CharacteristicKind::Environmental).await?;
///     println!("{:02X?}", bytes);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait CharacteristicReader: Send + Sync {
    /// Read the current value of a characteristic.
    async fn read_characteristic(&self, kind: CharacteristicKind) -> Result<Vec<u8>>;
}

/// Executes outbound PlanetWatch requests.
///
/// Every HTTP status is an `Ok` response; only delivery failures are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the response.
    async fn send(
        &self,
        request: &OutboundRequest,
    ) -> std::result::Result<RemoteResponse, RemoteError>;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> OffsetDateTime;
}

/// Wall-clock time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
