//! Binary decoding of Atmotube PRO frames.
//!
//! Frames are classified by source and length first. A frame that matches a
//! known layout becomes a [`ReadingPatch`]; anything else is reported as
//! [`Decoded::Unrecognized`]. Decoding never fails and never panics.
//!
//! # Advertisement layouts
//!
//! The Atmotube PRO alternates between two manufacturer payloads under
//! manufacturer id `0xFFFF`:
//!
//! | Length | Contents |
//! |--------|----------|
//! | 12 | VOC (u16 BE, ppb), device id (2 bytes), humidity (u8), temperature (i8), pressure (u32 BE, Pa), info byte, battery (u8) |
//! | 9 | PM1, PM2.5, PM10 (u16 BE each), firmware (3 bytes) |
//!
//! # Characteristic layouts
//!
//! | Characteristic | Length | Contents |
//! |----------------|--------|----------|
//! | environmental | 8 | humidity (i8), temperature (i8), pressure (i32 LE), temperature ×100 (i16 LE) |
//! | particulate | 12 | PM1, PM2.5, PM10, PM4 (u24 LE ÷ 100 each) |
//! | status | 2 | info byte (i8), battery (i8) |
//! | voc | 4 | VOC (i16 LE), unused (i16 LE) |

use core::fmt;

use bytes::Buf;
use uuid::Uuid;

use atmotube_types::{
    CharacteristicKind, FrameSource, InfoFlags, Particulates, RawFrame, ReadingPatch,
    to_hex_lower, to_hex_upper,
};

/// Length of the advertisement carrying VOC, climate and status.
pub const ADV_STATUS_LEN: usize = 12;

/// Length of the advertisement carrying particulates and firmware.
pub const ADV_PM_LEN: usize = 9;

/// Result of decoding a single frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// The frame matched a known layout.
    Patch(ReadingPatch),
    /// The frame did not match any known layout.
    Unrecognized(Unrecognized),
}

impl Decoded {
    /// The decoded patch, if the frame was recognised.
    #[must_use]
    pub fn patch(&self) -> Option<&ReadingPatch> {
        match self {
            Decoded::Patch(patch) => Some(patch),
            Decoded::Unrecognized(_) => None,
        }
    }

    /// Consume into the decoded patch, if the frame was recognised.
    #[must_use]
    pub fn into_patch(self) -> Option<ReadingPatch> {
        match self {
            Decoded::Patch(patch) => Some(patch),
            Decoded::Unrecognized(_) => None,
        }
    }
}

/// Why a frame was not recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unrecognized {
    /// Advertisement payload with a length other than 9 or 12.
    AdvertisementLength(usize),
    /// Characteristic UUID that does not belong to the Atmotube PRO.
    UnknownCharacteristic(Uuid),
    /// Known characteristic with an unexpected payload length.
    CharacteristicLength {
        kind: CharacteristicKind,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for Unrecognized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unrecognized::AdvertisementLength(len) => {
                write!(f, "advertisement of {} bytes (expected 9 or 12)", len)
            }
            Unrecognized::UnknownCharacteristic(uuid) => {
                write!(f, "unknown characteristic {}", uuid)
            }
            Unrecognized::CharacteristicLength {
                kind,
                expected,
                actual,
            } => write!(
                f,
                "{} characteristic of {} bytes (expected {})",
                kind, actual, expected
            ),
        }
    }
}

/// Decode one frame from either channel.
#[must_use]
pub fn decode_frame(frame: &RawFrame) -> Decoded {
    match frame.source {
        FrameSource::Advertisement => decode_advertisement(&frame.bytes),
        FrameSource::Characteristic(uuid) => match CharacteristicKind::from_uuid(uuid) {
            Some(kind) => decode_characteristic(kind, &frame.bytes),
            None => Decoded::Unrecognized(Unrecognized::UnknownCharacteristic(uuid)),
        },
    }
}

/// Decode an advertisement manufacturer payload (without the manufacturer id).
#[must_use]
pub fn decode_advertisement(data: &[u8]) -> Decoded {
    match data.len() {
        ADV_STATUS_LEN => Decoded::Patch(decode_status_advertisement(data)),
        ADV_PM_LEN => Decoded::Patch(decode_pm_advertisement(data)),
        other => Decoded::Unrecognized(Unrecognized::AdvertisementLength(other)),
    }
}

/// Decode the value of a known characteristic.
///
/// The payload must have exactly the characteristic's length.
#[must_use]
pub fn decode_characteristic(kind: CharacteristicKind, data: &[u8]) -> Decoded {
    let expected = kind.frame_len();
    if data.len() != expected {
        return Decoded::Unrecognized(Unrecognized::CharacteristicLength {
            kind,
            expected,
            actual: data.len(),
        });
    }

    let patch = match kind {
        CharacteristicKind::Environmental => decode_environmental(data),
        CharacteristicKind::Particulate => decode_particulate(data),
        CharacteristicKind::Status => decode_status(data),
        CharacteristicKind::Voc => decode_voc(data),
    };
    Decoded::Patch(patch)
}

fn decode_status_advertisement(data: &[u8]) -> ReadingPatch {
    let mut buf = data;
    let voc = buf.get_u16();
    let device_id = to_hex_lower(&buf[..2]);
    buf.advance(2);
    let humidity = buf.get_u8();
    let temperature = buf.get_i8();
    let pressure = buf.get_u32();
    let info = InfoFlags::from(buf.get_u8());
    let battery = buf.get_u8();

    ReadingPatch {
        voc: Some(i32::from(voc)),
        humidity: Some(i16::from(humidity)),
        temperature: Some(f64::from(temperature)),
        pressure: Some(i64::from(pressure)),
        battery: Some(i16::from(battery)),
        info: Some(info),
        device_id: Some(device_id),
        ..ReadingPatch::default()
    }
}

fn decode_pm_advertisement(data: &[u8]) -> ReadingPatch {
    let [pm1, pm25, pm10] = decode_pms::<3>(&data[..6], 2);
    ReadingPatch {
        particulates: Some(Particulates {
            pm1,
            pm25,
            pm10,
            pm4: None,
        }),
        firmware: Some(to_hex_upper(&data[6..9])),
        ..ReadingPatch::default()
    }
}

fn decode_environmental(data: &[u8]) -> ReadingPatch {
    let mut buf = data;
    let humidity = buf.get_i8();
    // Whole-degree temperature is superseded by the extended field.
    let _temperature = buf.get_i8();
    let pressure = buf.get_i32_le();
    let temperature_extended = buf.get_i16_le();

    ReadingPatch {
        humidity: Some(i16::from(humidity)),
        temperature: Some(f64::from(temperature_extended) / 100.0),
        pressure: Some(i64::from(pressure)),
        ..ReadingPatch::default()
    }
}

fn decode_particulate(data: &[u8]) -> ReadingPatch {
    let [pm1, pm25, pm10, pm4] = decode_pms::<4>(data, 3);
    ReadingPatch {
        particulates: Some(Particulates {
            pm1,
            pm25,
            pm10,
            pm4,
        }),
        ..ReadingPatch::default()
    }
}

fn decode_status(data: &[u8]) -> ReadingPatch {
    let mut buf = data;
    let info_byte = buf.get_i8();
    let battery = buf.get_i8();
    ReadingPatch {
        info: Some(InfoFlags::from(info_byte as u8)),
        battery: Some(i16::from(battery)),
        ..ReadingPatch::default()
    }
}

fn decode_voc(data: &[u8]) -> ReadingPatch {
    let mut buf = data;
    let voc = buf.get_i16_le();
    ReadingPatch {
        voc: Some(i32::from(voc)),
        ..ReadingPatch::default()
    }
}

/// Decode one particulate element.
///
/// An element whose bytes are all `0xFF` is the "unavailable" sentinel and
/// decodes to `None`. Two-byte elements are big-endian whole µg/m³; every
/// other width is little-endian hundredths of µg/m³.
///
/// # Examples
///
/// ```
/// use atmotube_core::decode::decode_pm;
///
/// assert_eq!(decode_pm(&[0xFF, 0xFF]), None);
/// assert_eq!(decode_pm(&[0x00, 0x02]), Some(2.0));
/// assert_eq!(decode_pm(&[0x64, 0x00, 0x00]), Some(1.0));
/// ```
#[must_use]
pub fn decode_pm(data: &[u8]) -> Option<f64> {
    if !data.is_empty() && data.iter().all(|&b| b == 0xFF) {
        return None;
    }
    let value = if data.len() == 2 {
        data.iter().fold(0.0_f64, |acc, &b| acc * 256.0 + f64::from(b))
    } else {
        data.iter()
            .rev()
            .fold(0.0_f64, |acc, &b| acc * 256.0 + f64::from(b))
            / 100.0
    };
    Some(value)
}

/// Decode `N` consecutive particulate elements of `size` bytes each.
///
/// If `data` is shorter than `N * size` bytes, all `N` values are `None`
/// and no byte is inspected.
#[must_use]
pub fn decode_pms<const N: usize>(data: &[u8], size: usize) -> [Option<f64>; N] {
    if data.len() < N * size {
        return [None; N];
    }
    core::array::from_fn(|i| decode_pm(&data[i * size..(i + 1) * size]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use atmotube_types::parse_hex;

    fn hex(s: &str) -> Vec<u8> {
        parse_hex(s).unwrap()
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("value should be present");
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    // --- decode_pm / decode_pms ---

    #[test]
    fn test_decode_pm_sentinel() {
        assert_eq!(decode_pm(&[0xFF]), None);
        assert_eq!(decode_pm(&[0xFF, 0xFF]), None);
        assert_eq!(decode_pm(&[0xFF, 0xFF, 0xFF]), None);
    }

    #[test]
    fn test_decode_pm_partial_sentinel_is_a_value() {
        assert_eq!(decode_pm(&[0xFF, 0xFE]), Some(65534.0));
        assert_close(decode_pm(&[0x00, 0xFF, 0xFF]), 167_769.6);
    }

    #[test]
    fn test_decode_pm_empty_is_zero() {
        assert_eq!(decode_pm(&[]), Some(0.0));
    }

    #[test]
    fn test_decode_pms_truncated() {
        assert_eq!(decode_pms::<1>(&[0xFF], 1), [None]);
        assert_eq!(decode_pms::<2>(&[0xFF], 1), [None, None]);
        assert_eq!(decode_pms::<2>(&[0xFF, 0xFF, 0xFF, 0xFF], 2), [None, None]);
        // Valid bytes but one short: nothing is decoded.
        assert_eq!(decode_pms::<3>(&[0x00, 0x01, 0x00, 0x01, 0x00], 2), [None; 3]);
    }

    #[test]
    fn test_decode_pms_advertisement_vector() {
        let data = hex("00010001000274051F");
        assert_eq!(decode_pms::<3>(&data, 2), [Some(1.0), Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_decode_pms_characteristic_vector() {
        let data = hex("640000A30000E30000640000");
        let [pm1, pm25, pm10, pm4] = decode_pms::<4>(&data, 3);
        assert_close(pm1, 1.0);
        assert_close(pm25, 1.63);
        assert_close(pm10, 2.27);
        assert_close(pm4, 1.0);
    }

    // --- Advertisements ---

    #[test]
    fn test_decode_status_advertisement() {
        let decoded = decode_advertisement(&hex("01039e321a19000140ea4164"));
        let patch = decoded.into_patch().unwrap();

        assert_eq!(patch.voc, Some(259));
        assert_eq!(patch.device_id.as_deref(), Some("9e32"));
        assert_eq!(patch.humidity, Some(26));
        assert_eq!(patch.temperature, Some(25.0));
        assert_eq!(patch.pressure, Some(82_154));
        assert_eq!(patch.battery, Some(100));
        let info = patch.info.unwrap();
        assert!(info.pm_on);
        assert!(info.voc_ready);
        assert!(!info.charging);
        assert_eq!(patch.particulates, None);
    }

    #[test]
    fn test_decode_status_advertisement_negative_temperature() {
        let mut data = hex("01039e321a19000140ea4164");
        data[5] = 0xF6; // -10 °C
        let patch = decode_advertisement(&data).into_patch().unwrap();
        assert_eq!(patch.temperature, Some(-10.0));
    }

    #[test]
    fn test_decode_pm_advertisement() {
        let patch = decode_advertisement(&hex("00010001000274051E"))
            .into_patch()
            .unwrap();
        let pm = patch.particulates.unwrap();
        assert_eq!(pm.pm1, Some(1.0));
        assert_eq!(pm.pm25, Some(1.0));
        assert_eq!(pm.pm10, Some(2.0));
        assert_eq!(pm.pm4, None);
        assert_eq!(patch.firmware.as_deref(), Some("74051E"));
        assert_eq!(patch.voc, None);
    }

    #[test]
    fn test_decode_pm_advertisement_sensor_off() {
        let patch = decode_advertisement(&hex("FFFFFFFFFFFF74051E"))
            .into_patch()
            .unwrap();
        assert_eq!(patch.particulates, Some(Particulates::default()));
        assert_eq!(patch.firmware.as_deref(), Some("74051E"));
    }

    #[test]
    fn test_decode_advertisement_wrong_length() {
        for len in [0, 1, 8, 10, 11, 13, 22] {
            assert_eq!(
                decode_advertisement(&vec![0u8; len]),
                Decoded::Unrecognized(Unrecognized::AdvertisementLength(len))
            );
        }
    }

    // --- Characteristics ---

    #[test]
    fn test_decode_environmental() {
        // humidity 40, temperature 22, pressure 101325 Pa, extended 2234
        let data = [0x28, 0x16, 0xCD, 0x8B, 0x01, 0x00, 0xBA, 0x08];
        let patch = decode_characteristic(CharacteristicKind::Environmental, &data)
            .into_patch()
            .unwrap();
        assert_eq!(patch.humidity, Some(40));
        assert_close(patch.temperature, 22.34);
        assert_eq!(patch.pressure, Some(101_325));
    }

    #[test]
    fn test_decode_environmental_negative_extended_temperature() {
        // extended -550 -> -5.5 °C
        let ext = (-550_i16).to_le_bytes();
        let data = [0x28, 0xFB, 0xCD, 0x8B, 0x01, 0x00, ext[0], ext[1]];
        let patch = decode_characteristic(CharacteristicKind::Environmental, &data)
            .into_patch()
            .unwrap();
        assert_close(patch.temperature, -5.5);
    }

    #[test]
    fn test_decode_particulate() {
        let patch = decode_characteristic(
            CharacteristicKind::Particulate,
            &hex("640000A30000E30000640000"),
        )
        .into_patch()
        .unwrap();
        let pm = patch.particulates.unwrap();
        assert_close(pm.pm1, 1.0);
        assert_close(pm.pm25, 1.63);
        assert_close(pm.pm10, 2.27);
        assert_close(pm.pm4, 1.0);
    }

    #[test]
    fn test_decode_status_characteristic() {
        let patch = decode_characteristic(CharacteristicKind::Status, &[0x49, 0x50])
            .into_patch()
            .unwrap();
        let info = patch.info.unwrap();
        assert!(info.pm_on);
        assert!(info.charging);
        assert!(info.voc_ready);
        assert_eq!(patch.battery, Some(80));
    }

    #[test]
    fn test_decode_voc_characteristic() {
        let patch = decode_characteristic(CharacteristicKind::Voc, &[0xFA, 0x00, 0x12, 0x34])
            .into_patch()
            .unwrap();
        assert_eq!(patch.voc, Some(250));
        assert_eq!(patch.humidity, None);
    }

    #[test]
    fn test_decode_characteristic_wrong_length() {
        let decoded = decode_characteristic(CharacteristicKind::Particulate, &[0x64, 0x00, 0x00]);
        assert_eq!(
            decoded,
            Decoded::Unrecognized(Unrecognized::CharacteristicLength {
                kind: CharacteristicKind::Particulate,
                expected: 12,
                actual: 3,
            })
        );
    }

    #[test]
    fn test_decode_frame_unknown_uuid() {
        let uuid = atmotube_types::uuids::ATMOTUBE_SERVICE;
        let frame = RawFrame::characteristic(uuid, vec![0u8; 4]);
        assert_eq!(
            decode_frame(&frame),
            Decoded::Unrecognized(Unrecognized::UnknownCharacteristic(uuid))
        );
    }

    #[test]
    fn test_decode_frame_dispatch() {
        let frame = RawFrame::from_kind(CharacteristicKind::Voc, vec![0x0A, 0x00, 0x00, 0x00]);
        assert_eq!(decode_frame(&frame).patch().and_then(|p| p.voc), Some(10));

        let frame = RawFrame::advertisement(hex("00010001000274051E"));
        assert!(decode_frame(&frame).patch().is_some());
    }

    #[test]
    fn test_unrecognized_display() {
        let msg = Unrecognized::AdvertisementLength(5).to_string();
        assert!(msg.contains("5 bytes"));

        let msg = Unrecognized::CharacteristicLength {
            kind: CharacteristicKind::Status,
            expected: 2,
            actual: 1,
        }
        .to_string();
        assert!(msg.contains("status"));
    }
}
