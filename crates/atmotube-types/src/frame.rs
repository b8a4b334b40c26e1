//! Raw frames as they arrive from the radio.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ParseError, ParseResult};
use crate::uuid as uuids;

/// GATT characteristics exposed by the Atmotube PRO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CharacteristicKind {
    /// VOC concentration and a reserved word.
    Voc,
    /// Humidity, temperature, pressure and extended temperature.
    Environmental,
    /// Info byte and battery level.
    Status,
    /// PM1, PM2.5, PM10 and PM4.
    Particulate,
}

impl CharacteristicKind {
    /// Every known characteristic.
    pub const ALL: [CharacteristicKind; 4] = [
        CharacteristicKind::Voc,
        CharacteristicKind::Environmental,
        CharacteristicKind::Status,
        CharacteristicKind::Particulate,
    ];

    /// GATT UUID of the characteristic.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        match self {
            CharacteristicKind::Voc => uuids::VOC,
            CharacteristicKind::Environmental => uuids::ENVIRONMENTAL,
            CharacteristicKind::Status => uuids::STATUS,
            CharacteristicKind::Particulate => uuids::PARTICULATE,
        }
    }

    /// Look up a characteristic by UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.uuid() == uuid)
    }

    /// Short lowercase name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CharacteristicKind::Voc => "voc",
            CharacteristicKind::Environmental => "environmental",
            CharacteristicKind::Status => "status",
            CharacteristicKind::Particulate => "particulate",
        }
    }

    /// Exact payload length in bytes.
    #[must_use]
    pub fn frame_len(&self) -> usize {
        match self {
            CharacteristicKind::Voc => 4,
            CharacteristicKind::Environmental => 8,
            CharacteristicKind::Status => 2,
            CharacteristicKind::Particulate => 12,
        }
    }
}

impl fmt::Display for CharacteristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CharacteristicKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Some(kind) = Self::ALL.into_iter().find(|kind| kind.name() == lower) {
            return Ok(kind);
        }
        // Full UUIDs are accepted as well.
        Uuid::parse_str(&lower)
            .ok()
            .and_then(Self::from_uuid)
            .ok_or_else(|| ParseError::UnknownCharacteristic(s.to_string()))
    }
}

/// Where a frame came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FrameSource {
    /// Manufacturer data of a passive advertisement.
    Advertisement,
    /// Value read from a GATT characteristic.
    Characteristic(Uuid),
}

/// A payload plus the source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawFrame {
    pub source: FrameSource,
    pub bytes: Vec<u8>,
}

impl RawFrame {
    /// Frame from advertisement manufacturer data.
    pub fn advertisement(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            source: FrameSource::Advertisement,
            bytes: bytes.into(),
        }
    }

    /// Frame from a characteristic identified by UUID.
    pub fn characteristic(uuid: Uuid, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            source: FrameSource::Characteristic(uuid),
            bytes: bytes.into(),
        }
    }

    /// Frame from a known characteristic.
    pub fn from_kind(kind: CharacteristicKind, bytes: impl Into<Vec<u8>>) -> Self {
        Self::characteristic(kind.uuid(), bytes)
    }

    /// The known characteristic this frame was read from, if any.
    #[must_use]
    pub fn kind(&self) -> Option<CharacteristicKind> {
        match self.source {
            FrameSource::Advertisement => None,
            FrameSource::Characteristic(uuid) => CharacteristicKind::from_uuid(uuid),
        }
    }
}

/// Format bytes as uppercase hex with no separators.
#[must_use]
pub fn to_hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// Format bytes as lowercase hex with no separators.
#[must_use]
pub fn to_hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parse a hex string into bytes.
///
/// Whitespace, `:` and `-` separators are ignored, as is a leading `0x`.
pub fn parse_hex(input: &str) -> ParseResult<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = trimmed
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':' && *b != b'-')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(ParseError::InvalidData(format!(
            "hex string has an odd number of digits ({})",
            digits.len()
        )));
    }

    digits
        .chunks_exact(2)
        .map(|pair| {
            let hi = hex_value(pair[0])?;
            let lo = hex_value(pair[1])?;
            Ok((hi << 4) | lo)
        })
        .collect()
}

fn hex_value(digit: u8) -> ParseResult<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        other => Err(ParseError::InvalidData(format!(
            "invalid hex digit '{}'",
            other as char
        ))),
    }
}
