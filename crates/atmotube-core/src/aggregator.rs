//! Per-device accumulation of decoded readings.
//!
//! Advertisements and characteristic reads each carry only part of the
//! device state. [`ReadingAggregator`] keeps the latest value of every field
//! and hands out immutable [`SensorSnapshot`] copies.

use atmotube_types::{ReadingPatch, SensorSnapshot};

use crate::aqs::aqs_for_snapshot;

/// Manufacturer reported for every Atmotube PRO.
pub const MANUFACTURER: &str = "Atmo";

/// Model reported for every Atmotube PRO.
pub const MODEL: &str = "Atmotube PRO";

/// Static identity of a device, as surfaced to the host platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Display name, `"Atmotube PRO {address}"`.
    pub name: String,
    /// Always [`MANUFACTURER`].
    pub manufacturer: &'static str,
    /// Always [`MODEL`].
    pub model: &'static str,
    /// Firmware version, once a 9-byte advertisement has been seen.
    pub sw_version: Option<String>,
}

/// Accumulator of the latest value of every field for one device.
#[derive(Debug, Clone)]
pub struct ReadingAggregator {
    snapshot: SensorSnapshot,
    device_id: Option<String>,
}

impl ReadingAggregator {
    /// Create an empty aggregator for a device address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            snapshot: SensorSnapshot::new(address),
            device_id: None,
        }
    }

    /// Device address.
    pub fn address(&self) -> &str {
        &self.snapshot.address
    }

    /// Merge a decoded patch.
    ///
    /// Only fields present in the patch are overwritten. A particulate group
    /// overwrites PM1, PM2.5 and PM10 together, nulls included. Merging the
    /// same patch twice leaves the same state as merging it once.
    pub fn merge(&mut self, patch: &ReadingPatch) {
        self.snapshot.apply(patch);
        if let Some(device_id) = &patch.device_id {
            self.device_id = Some(device_id.clone());
        }
    }

    /// Name the device after its address. Idempotent.
    pub fn identify(&mut self) {
        if self.snapshot.name.is_none() {
            self.snapshot.name = Some(format!("{} {}", MODEL, self.snapshot.address));
        }
    }

    /// Device identity, once [`identify`](Self::identify) has run.
    pub fn identity(&self) -> Option<DeviceIdentity> {
        let name = self.snapshot.name.clone()?;
        Some(DeviceIdentity {
            name,
            manufacturer: MANUFACTURER,
            model: MODEL,
            sw_version: self.snapshot.firmware.clone(),
        })
    }

    /// Opaque device id from the last 12-byte advertisement.
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Immutable copy of the current state.
    pub fn snapshot(&self) -> SensorSnapshot {
        self.snapshot.clone()
    }

    /// Borrow the current state.
    pub fn current(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    /// True when VOC, PM1, PM2.5 and PM10 are all known.
    pub fn has_all_aqs_inputs(&self) -> bool {
        self.snapshot.voc.is_some()
            && self.snapshot.pm1().is_some()
            && self.snapshot.pm25().is_some()
            && self.snapshot.pm10().is_some()
    }

    /// Current Air Quality Score, if all inputs are known.
    pub fn air_quality_score(&self) -> Option<u8> {
        aqs_for_snapshot(&self.snapshot)
    }

    /// Forget everything except the address.
    pub fn reset(&mut self) {
        let address = std::mem::take(&mut self.snapshot.address);
        self.snapshot = SensorSnapshot::new(address);
        self.device_id = None;
    }
}
