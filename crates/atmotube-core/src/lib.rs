//! Core library for the Atmotube PRO air-quality sensor.
//!
//! This crate turns raw Bluetooth Low Energy payloads from an Atmotube PRO
//! into readings, scores them, and keeps a PlanetWatch registration and
//! upload cycle running for each device.
//!
//! # Features
//!
//! - **Decoding**: 9- and 12-byte advertisements plus the VOC, environmental,
//!   status and particulate GATT characteristics
//! - **Air Quality Score**: 0-100 score from VOC and PM1/PM2.5/PM10
//! - **Aggregation**: latest value of every field, per device
//! - **PlanetWatch sync**: rate-limited registration checks and uploads
//! - **Active polling**: read characteristics and upload immediately
//!
//! # Data sources
//!
//! | Source | Payload | Fields |
//! |--------|---------|--------|
//! | Advertisement | 12 bytes | VOC, humidity, temperature, pressure, info, battery |
//! | Advertisement | 9 bytes | PM1, PM2.5, PM10, firmware |
//! | Environmental | 8 bytes | humidity, temperature, pressure |
//! | Particulate | 12 bytes | PM1, PM2.5, PM10, PM4 |
//! | Status | 2 bytes | info, battery |
//! | VOC | 4 bytes | VOC |
//!
//! The crate does no scanning or connection management. Callers feed
//! advertisement payloads to a [`DeviceSession`] and hand it a
//! [`CharacteristicReader`] for a connected device when they want to poll.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use atmotube_core::{DeviceSession, MockTransport, SyncSettings};
//!
//! let session = DeviceSession::new(
//!     "CC:61:37:BB:02:02",
//!     SyncSettings::disabled(),
//!     Arc::new(MockTransport::new()),
//! );
//!
//! session.on_advertisement(&[
//!     0x01, 0x03, 0x9e, 0x32, 0x1a, 0x19, 0x00, 0x01, 0x40, 0xea, 0x41, 0x64,
//! ]);
//! let outcome = session.on_advertisement(&[
//!     0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x74, 0x05, 0x1e,
//! ]);
//!
//! assert!(outcome.air_quality_score.is_some());
//! assert_eq!(session.snapshot().firmware.as_deref(), Some("74051E"));
//! ```

pub mod aggregator;
pub mod aqs;
pub mod ble;
pub mod decode;
pub mod error;
pub mod guard;
pub mod mock;
#[cfg(feature = "planetwatch-client")]
pub mod planetwatch;
pub mod session;
pub mod sync;
pub mod traits;

// Re-export types and uuid modules from atmotube-types
pub use atmotube_types::types;
pub use atmotube_types::uuid;

// Core exports
pub use aggregator::{DeviceIdentity, ReadingAggregator};
pub use aqs::{AqsLevel, calc_aqs};
pub use decode::{Decoded, Unrecognized, decode_advertisement, decode_characteristic, decode_frame};
pub use error::{Error, Result};
pub use mock::{MockClock, MockReader, MockReaderBuilder, MockTransport};
pub use session::{DeviceSession, IngestOutcome, PollReport, SessionOptions, SyncReport};
pub use sync::{
    Geolocation, OutboundRequest, Registration, RemoteError, RemoteResponse, RemoteSyncState,
    SyncScheduler, SyncSettings,
};
pub use traits::{CharacteristicReader, Clock, SystemClock, Transport};

// Re-export from atmotube-types
pub use atmotube_types::uuid as uuids;
pub use atmotube_types::{
    CharacteristicKind, InfoFlags, ParseError, Particulates, RawFrame, ReadingPatch, SensorKey,
    SensorSnapshot, SensorValue,
};
