//! Core types for Atmotube sensor data.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of flags packed into the Atmotube info byte (bit 7 is unused).
pub const INFO_FLAG_COUNT: usize = 7;

/// Decode an info byte into its seven raw flags.
///
/// Returns, in bit order: `pm_on`, `error`, `bonded`, `charging`, `timer`,
/// reserved, `voc_ready`. The reserved flag is decoded so the layout stays
/// aligned but it carries no meaning.
///
/// # Examples
///
/// ```
/// use atmotube_types::decode_info;
///
/// assert_eq!(
///     decode_info(0x41),
///     [true, false, false, false, false, false, true]
/// );
/// ```
#[must_use]
pub fn decode_info(info_byte: u8) -> [bool; INFO_FLAG_COUNT] {
    core::array::from_fn(|bit| (info_byte >> bit) & 0x01 == 0x01)
}

/// Device status flags carried in the info byte.
///
/// The info byte arrives both in the 12-byte advertisement and in the status
/// characteristic. Bit 5 is reserved and intentionally has no field here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InfoFlags {
    /// Particulate sensor is powered on.
    pub pm_on: bool,
    /// Device reports an internal error.
    pub error: bool,
    /// Device is bonded.
    pub bonded: bool,
    /// Battery is charging.
    pub charging: bool,
    /// Measurement timer is active.
    pub timer: bool,
    /// VOC sensor has finished warming up.
    pub voc_ready: bool,
}

impl From<u8> for InfoFlags {
    fn from(info_byte: u8) -> Self {
        let [pm_on, error, bonded, charging, timer, _reserved, voc_ready] = decode_info(info_byte);
        Self {
            pm_on,
            error,
            bonded,
            charging,
            timer,
            voc_ready,
        }
    }
}

/// One decoded group of particulate concentrations in µg/m³.
///
/// Each value is `None` when the device sent the "unavailable" sentinel for
/// it, which happens when the particulate sensor is switched off. PM4 is only
/// present in the particulate characteristic and is not a primary reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Particulates {
    /// PM1 concentration.
    pub pm1: Option<f64>,
    /// PM2.5 concentration.
    pub pm25: Option<f64>,
    /// PM10 concentration.
    pub pm10: Option<f64>,
    /// PM4 concentration (particulate characteristic only).
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub pm4: Option<f64>,
}

impl Particulates {
    /// True when PM1, PM2.5 and PM10 all carry a value.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pm1.is_some() && self.pm25.is_some() && self.pm10.is_some()
    }
}

/// Field assignments produced by decoding a single frame.
///
/// Only the fields present in the frame are `Some`. A patch is applied onto a
/// [`SensorSnapshot`] with [`SensorSnapshot::apply`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReadingPatch {
    /// VOC concentration in ppb.
    pub voc: Option<i32>,
    /// Relative humidity in percent.
    pub humidity: Option<i16>,
    /// Temperature in degrees Celsius.
    pub temperature: Option<f64>,
    /// Atmospheric pressure in Pa.
    pub pressure: Option<i64>,
    /// Particulate group; overwrites all particulate fields, nulls included.
    pub particulates: Option<Particulates>,
    /// Battery level in percent.
    pub battery: Option<i16>,
    /// Decoded info byte.
    pub info: Option<InfoFlags>,
    /// Firmware version (uppercase hex).
    pub firmware: Option<String>,
    /// Opaque device id from the advertisement (lowercase hex). Not merged.
    pub device_id: Option<String>,
}

impl ReadingPatch {
    /// True when the patch assigns nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voc.is_none()
            && self.humidity.is_none()
            && self.temperature.is_none()
            && self.pressure.is_none()
            && self.particulates.is_none()
            && self.battery.is_none()
            && self.info.is_none()
            && self.firmware.is_none()
    }
}

/// The current belief about one device, built up from many frames.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorSnapshot {
    /// Device address (MAC address or platform identifier).
    pub address: String,
    /// Device display name, set once the device has been recognised.
    pub name: Option<String>,
    /// VOC concentration in ppb.
    pub voc: Option<i32>,
    /// Relative humidity in percent.
    pub humidity: Option<i16>,
    /// Temperature in degrees Celsius.
    pub temperature: Option<f64>,
    /// Atmospheric pressure in Pa.
    pub pressure: Option<i64>,
    /// Last particulate group. `None` until one has been observed.
    pub particulates: Option<Particulates>,
    /// Battery level in percent.
    pub battery: Option<i16>,
    /// Last decoded info byte.
    pub info: Option<InfoFlags>,
    /// Firmware version.
    pub firmware: Option<String>,
}

impl SensorSnapshot {
    /// Create an empty snapshot for a device address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Apply a decoded patch, overwriting only the fields it carries.
    pub fn apply(&mut self, patch: &ReadingPatch) {
        if let Some(voc) = patch.voc {
            self.voc = Some(voc);
        }
        if let Some(humidity) = patch.humidity {
            self.humidity = Some(humidity);
        }
        if let Some(temperature) = patch.temperature {
            self.temperature = Some(temperature);
        }
        if let Some(pressure) = patch.pressure {
            self.pressure = Some(pressure);
        }
        if let Some(particulates) = patch.particulates {
            self.particulates = Some(particulates);
        }
        if let Some(battery) = patch.battery {
            self.battery = Some(battery);
        }
        if let Some(info) = patch.info {
            self.info = Some(info);
        }
        if let Some(firmware) = &patch.firmware {
            self.firmware = Some(firmware.clone());
        }
    }

    /// PM1 in µg/m³, if observed and the sensor was on.
    #[must_use]
    pub fn pm1(&self) -> Option<f64> {
        self.particulates.and_then(|p| p.pm1)
    }

    /// PM2.5 in µg/m³, if observed and the sensor was on.
    #[must_use]
    pub fn pm25(&self) -> Option<f64> {
        self.particulates.and_then(|p| p.pm25)
    }

    /// PM10 in µg/m³, if observed and the sensor was on.
    #[must_use]
    pub fn pm10(&self) -> Option<f64> {
        self.particulates.and_then(|p| p.pm10)
    }

    /// VOC in parts per million.
    #[must_use]
    pub fn voc_ppm(&self) -> Option<f64> {
        self.voc.map(|ppb| f64::from(ppb) / 1000.0)
    }

    /// Pressure in hPa.
    #[must_use]
    pub fn pressure_hpa(&self) -> Option<f64> {
        self.pressure.map(|pa| pa as f64 / 100.0)
    }

    /// Named values for every field that currently holds a reading.
    #[must_use]
    pub fn values(&self) -> Vec<(SensorKey, SensorValue)> {
        let mut values = Vec::new();
        if let Some(voc) = self.voc {
            values.push((SensorKey::VolatileOrganicCompounds, SensorValue::Integer(i64::from(voc))));
        }
        if let Some(humidity) = self.humidity {
            values.push((SensorKey::Humidity, SensorValue::Integer(i64::from(humidity))));
        }
        if let Some(temperature) = self.temperature {
            values.push((SensorKey::Temperature, SensorValue::Float(temperature)));
        }
        if let Some(pressure) = self.pressure {
            values.push((SensorKey::Pressure, SensorValue::Integer(pressure)));
        }
        if let Some(battery) = self.battery {
            values.push((SensorKey::Battery, SensorValue::Integer(i64::from(battery))));
        }
        if let Some(info) = self.info {
            values.push((SensorKey::BatteryCharging, SensorValue::Bool(info.charging)));
        }
        for (key, value) in [
            (SensorKey::Pm1, self.pm1()),
            (SensorKey::Pm25, self.pm25()),
            (SensorKey::Pm10, self.pm10()),
        ] {
            if let Some(value) = value {
                values.push((key, SensorValue::Float(value)));
            }
        }
        values
    }
}

/// Name of a value exposed to the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum SensorKey {
    VolatileOrganicCompounds,
    Humidity,
    Temperature,
    Pressure,
    Battery,
    BatteryCharging,
    Pm1,
    Pm25,
    Pm10,
    AirQualityScore,
    PlanetwatchDataCollected,
    PlanetwatchLastUpdated,
}

impl SensorKey {
    /// Stable machine-readable key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKey::VolatileOrganicCompounds => "volatile_organic_compounds",
            SensorKey::Humidity => "humidity",
            SensorKey::Temperature => "temperature",
            SensorKey::Pressure => "pressure",
            SensorKey::Battery => "battery",
            SensorKey::BatteryCharging => "battery_charging",
            SensorKey::Pm1 => "pm1",
            SensorKey::Pm25 => "pm25",
            SensorKey::Pm10 => "pm10",
            SensorKey::AirQualityScore => "air_quality_score",
            SensorKey::PlanetwatchDataCollected => "planetwatch_data_collected",
            SensorKey::PlanetwatchLastUpdated => "planetwatch_last_updated",
        }
    }

    /// Unit of measurement, if the value has one.
    #[must_use]
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            SensorKey::VolatileOrganicCompounds => Some("ppb"),
            SensorKey::Humidity | SensorKey::Battery => Some("%"),
            SensorKey::Temperature => Some("°C"),
            SensorKey::Pressure => Some("Pa"),
            SensorKey::Pm1 | SensorKey::Pm25 | SensorKey::Pm10 => Some("µg/m³"),
            _ => None,
        }
    }
}

impl fmt::Display for SensorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Native value of a named sensor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum SensorValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Timestamp(#[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))] time::OffsetDateTime),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Integer(v) => write!(f, "{v}"),
            SensorValue::Float(v) => write!(f, "{v}"),
            SensorValue::Bool(v) => write!(f, "{v}"),
            SensorValue::Text(v) => f.write_str(v),
            SensorValue::Timestamp(v) => write!(f, "{v}"),
        }
    }
}
