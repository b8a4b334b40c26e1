//! Platform-agnostic types for Atmotube PRO air-quality sensors.
//!
//! This crate provides the shared data model used by `atmotube-core` and
//! `atmotube-cli`.
//!
//! # Features
//!
//! - Decoded reading patches and the merged sensor snapshot
//! - Info byte flags
//! - Raw frame and characteristic identifiers
//! - UUID constants for BLE characteristics
//! - Error types for data parsing
//!
//! # Example
//!
//! ```
//! use atmotube_types::{InfoFlags, ReadingPatch, SensorSnapshot};
//!
//! let mut snapshot = SensorSnapshot::new("CC:61:37:BB:02:02");
//! snapshot.apply(&ReadingPatch {
//!     voc: Some(250),
//!     info: Some(InfoFlags::from(0x41)),
//!     ..ReadingPatch::default()
//! });
//! assert_eq!(snapshot.voc, Some(250));
//! ```

pub mod error;
pub mod frame;
pub mod types;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use frame::{
    CharacteristicKind, FrameSource, RawFrame, parse_hex, to_hex_lower, to_hex_upper,
};
pub use types::{
    INFO_FLAG_COUNT, InfoFlags, Particulates, ReadingPatch, SensorKey, SensorSnapshot,
    SensorValue, decode_info,
};
pub use uuid as uuids;
