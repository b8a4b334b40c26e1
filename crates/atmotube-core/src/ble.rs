//! Glue between `btleplug` and the device session.
//!
//! Scanning and connection management stay with the caller. This module only
//! turns advertisement properties into [`RawFrame`]s and reads
//! characteristics from a peripheral the caller already connected.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Peripheral, PeripheralProperties};
use tokio::time::timeout;

use atmotube_types::{CharacteristicKind, RawFrame, uuid::MANUFACTURER_ID};

use crate::error::{Error, Result};
use crate::traits::CharacteristicReader;

/// Default timeout for one characteristic read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Extract the Atmotube payload from advertised manufacturer data.
///
/// Only manufacturer id `0xFFFF` is considered.
pub fn frame_from_manufacturer_data(data: &HashMap<u16, Vec<u8>>) -> Option<RawFrame> {
    data.get(&MANUFACTURER_ID)
        .map(|bytes| RawFrame::advertisement(bytes.as_slice()))
}

/// Extract the Atmotube payload from peripheral properties.
pub fn frame_from_properties(properties: &PeripheralProperties) -> Option<RawFrame> {
    frame_from_manufacturer_data(&properties.manufacturer_data)
}

/// [`CharacteristicReader`] over a connected `btleplug` peripheral.
#[derive(Debug, Clone)]
pub struct BlePeripheralReader<P> {
    peripheral: P,
    read_timeout: Duration,
}

impl<P: Peripheral> BlePeripheralReader<P> {
    /// Wrap a connected peripheral whose services have been discovered.
    pub fn new(peripheral: P) -> Self {
        Self {
            peripheral,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Set the per-read timeout.
    #[must_use]
    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// The wrapped peripheral.
    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }
}

#[async_trait]
impl<P: Peripheral> CharacteristicReader for BlePeripheralReader<P> {
    async fn read_characteristic(&self, kind: CharacteristicKind) -> Result<Vec<u8>> {
        if !self.peripheral.is_connected().await? {
            return Err(Error::NotConnected);
        }

        let uuid = kind.uuid();
        let characteristics = self.peripheral.characteristics();
        let characteristic = characteristics
            .iter()
            .find(|c| c.uuid == uuid)
            .ok_or_else(|| Error::characteristic_not_found(uuid.to_string(), characteristics.len()))?;

        timeout(self.read_timeout, self.peripheral.read(characteristic))
            .await
            .map_err(|_| {
                Error::transport(format!(
                    "read of {} characteristic timed out after {:?}",
                    kind, self.read_timeout
                ))
            })?
            .map_err(Error::from)
    }
}
