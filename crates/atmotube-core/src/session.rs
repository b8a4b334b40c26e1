//! Per-device orchestration of decoding, aggregation and PlanetWatch sync.
//!
//! A [`DeviceSession`] owns the [`ReadingAggregator`] and [`SyncScheduler`]
//! of one Atmotube PRO. Passive frames go through [`DeviceSession::ingest`],
//! which never awaits and tells the caller whether a sync is wanted. The
//! caller then runs [`DeviceSession::sync`] on its own task. An active poll
//! ([`DeviceSession::poll`]) reads characteristics through a
//! [`CharacteristicReader`] and uploads without waiting for the upload
//! interval.
//!
//! # Example
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
//! let outcome = session.on_advertisement(&[
//!     0x01, 0x03, 0x9e, 0x32, 0x1a, 0x19, 0x00, 0x01, 0x40, 0xea, 0x41, 0x64,
//! ]);
//! assert!(outcome.recognized);
//! assert!(!outcome.sync_wanted);
//! assert_eq!(session.snapshot().voc, Some(259));
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use atmotube_types::{
    CharacteristicKind, FrameSource, RawFrame, SensorKey, SensorSnapshot, SensorValue,
};

use crate::aggregator::{DeviceIdentity, ReadingAggregator};
use crate::decode::{Decoded, decode_frame};
use crate::error::Result;
use crate::guard::InFlightGuard;
use crate::sync::{Registration, RemoteError, RemoteSyncState, SyncScheduler, SyncSettings};
use crate::traits::{CharacteristicReader, Clock, SystemClock, Transport};

/// Characteristics read by a poll unless configured otherwise.
pub const DEFAULT_POLL_CHARACTERISTICS: [CharacteristicKind; 2] =
    [CharacteristicKind::Environmental, CharacteristicKind::Particulate];

/// Options for a [`DeviceSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Characteristics read, in order, by every poll.
    pub poll_characteristics: Vec<CharacteristicKind>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_characteristics: DEFAULT_POLL_CHARACTERISTICS.to_vec(),
        }
    }
}

impl SessionOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the characteristics read by a poll.
    #[must_use]
    pub fn poll_characteristics(
        mut self,
        kinds: impl IntoIterator<Item = CharacteristicKind>,
    ) -> Self {
        self.poll_characteristics = kinds.into_iter().collect();
        self
    }
}

/// Result of ingesting one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Whether the frame was decoded and merged.
    pub recognized: bool,
    /// Air Quality Score after the merge, if all inputs are known.
    pub air_quality_score: Option<u8>,
    /// The caller should run [`DeviceSession::sync`].
    pub sync_wanted: bool,
}

/// What one sync pass did.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncReport {
    /// Outcome of the registration check, if one was sent.
    pub check: Option<std::result::Result<Registration, RemoteError>>,
    /// Outcome of the upload, if one was sent.
    pub upload: Option<std::result::Result<(), RemoteError>>,
}

impl SyncReport {
    /// True when an upload request was sent.
    pub fn upload_sent(&self) -> bool {
        self.upload.is_some()
    }

    /// True when an upload was sent and accepted.
    pub fn upload_accepted(&self) -> bool {
        matches!(self.upload, Some(Ok(())))
    }
}

/// What one poll did.
#[derive(Debug, Clone, PartialEq)]
pub struct PollReport {
    /// Characteristics read and recognised.
    pub merged: Vec<CharacteristicKind>,
    /// Air Quality Score after the poll.
    pub air_quality_score: Option<u8>,
    /// The sync that followed the reads. `None` when no score could be
    /// computed, in which case nothing is sent.
    pub sync: Option<SyncReport>,
}

/// State and collaborators for one Atmotube PRO.
pub struct DeviceSession {
    address: String,
    options: SessionOptions,
    aggregator: Mutex<ReadingAggregator>,
    scheduler: Mutex<SyncScheduler>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    poll_in_flight: AtomicBool,
    sync_in_flight: AtomicBool,
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("address", &self.address)
            .field("options", &self.options)
            .field("poll_in_flight", &self.poll_in_flight.load(Ordering::Relaxed))
            .field("sync_in_flight", &self.sync_in_flight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    /// Create a session using the system clock and default options.
    pub fn new(
        address: impl Into<String>,
        settings: SyncSettings,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::with_clock(address, settings, transport, Arc::new(SystemClock))
    }

    /// Create a session with an explicit clock.
    pub fn with_clock(
        address: impl Into<String>,
        settings: SyncSettings,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let address = address.into();
        Self {
            aggregator: Mutex::new(ReadingAggregator::new(address.clone())),
            scheduler: Mutex::new(SyncScheduler::new(address.clone(), settings)),
            address,
            options: SessionOptions::default(),
            transport,
            clock,
            poll_in_flight: AtomicBool::new(false),
            sync_in_flight: AtomicBool::new(false),
        }
    }

    /// Replace the session options.
    #[must_use]
    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Device address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Options in use.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    fn aggregator(&self) -> MutexGuard<'_, ReadingAggregator> {
        self.aggregator.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn scheduler(&self) -> MutexGuard<'_, SyncScheduler> {
        self.scheduler.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Decode and merge one frame. Never blocks on I/O.
    pub fn ingest(&self, frame: &RawFrame) -> IngestOutcome {
        let decoded = decode_frame(frame);
        let air_quality_score = {
            let mut aggregator = self.aggregator();
            if let Decoded::Patch(patch) = &decoded {
                aggregator.merge(patch);
                if frame.source == FrameSource::Advertisement {
                    aggregator.identify();
                }
            }
            aggregator.air_quality_score()
        };

        let recognized = match decoded {
            Decoded::Patch(_) => true,
            Decoded::Unrecognized(reason) => {
                debug!("{}: Ignoring {}", self.address, reason);
                false
            }
        };

        let sync_wanted = recognized
            && air_quality_score.is_some()
            && !self.scheduler().is_disabled()
            && !self.sync_in_flight.load(Ordering::Acquire);

        IngestOutcome {
            recognized,
            air_quality_score,
            sync_wanted,
        }
    }

    /// Ingest an advertisement manufacturer payload.
    pub fn on_advertisement(&self, payload: &[u8]) -> IngestOutcome {
        self.ingest(&RawFrame::advertisement(payload))
    }

    /// Run a passive sync pass.
    ///
    /// Returns `None` if another passive sync for this device is still in
    /// flight.
    pub async fn sync(&self) -> Option<SyncReport> {
        let Some(_guard) = InFlightGuard::try_acquire(&self.sync_in_flight) else {
            debug!("{}: Sync already in flight, skipping", self.address);
            return None;
        };
        Some(self.run_sync(false).await)
    }

    /// Read the configured characteristics, merge them, then sync without
    /// waiting for the upload interval.
    ///
    /// Returns `Ok(None)` if a poll for this device is already in flight. A
    /// read failure aborts the poll before anything is uploaded.
    pub async fn poll<R>(&self, reader: &R) -> Result<Option<PollReport>>
    where
        R: CharacteristicReader + ?Sized,
    {
        let Some(_guard) = InFlightGuard::try_acquire(&self.poll_in_flight) else {
            debug!("{}: Poll already in flight, skipping", self.address);
            return Ok(None);
        };

        let mut merged = Vec::with_capacity(self.options.poll_characteristics.len());
        for &kind in &self.options.poll_characteristics {
            let bytes = match reader.read_characteristic(kind).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("{}: Failed to read {} characteristic: {}", self.address, kind, e);
                    return Err(e);
                }
            };
            debug!("{}: {} = {:02X?}", self.address, kind, bytes);
            if self.ingest(&RawFrame::from_kind(kind, bytes)).recognized {
                merged.push(kind);
            }
        }

        let air_quality_score = self.air_quality_score();
        let sync = if air_quality_score.is_some() {
            Some(self.run_sync(true).await)
        } else {
            debug!("{}: No score after poll, skipping sync", self.address);
            None
        };
        Ok(Some(PollReport {
            merged,
            air_quality_score,
            sync,
        }))
    }

    async fn run_sync(&self, bypass_rate_limit: bool) -> SyncReport {
        let mut report = SyncReport::default();

        let check = self.scheduler().check_due(self.clock.now());
        if let Some(request) = check {
            let previous = self.scheduler().state().registration;
            let result = self.transport.send(&request).await;
            let outcome = self.scheduler().on_check_response(result);
            match &outcome {
                Ok(registration) if *registration != previous => {
                    info!(
                        "{}: PlanetWatch registration {:?} -> {:?}",
                        self.address, previous, registration
                    );
                }
                Ok(_) => {}
                Err(e) => warn!("{}: Registration check failed: {}", self.address, e),
            }
            report.check = Some(outcome);
        }

        let (snapshot, aqs) = {
            let aggregator = self.aggregator();
            (aggregator.snapshot(), aggregator.air_quality_score())
        };
        let upload = self
            .scheduler()
            .upload_due(&snapshot, aqs, self.clock.now(), bypass_rate_limit);
        if let Some(request) = upload {
            let result = self.transport.send(&request).await;
            let outcome = self.scheduler().on_upload_response(result);
            match &outcome {
                Ok(()) => debug!("{}: Reading uploaded", self.address),
                Err(e) => warn!("{}: Upload failed: {}", self.address, e),
            }
            report.upload = Some(outcome);
        }

        report
    }

    /// Immutable copy of the current readings.
    pub fn snapshot(&self) -> SensorSnapshot {
        self.aggregator().snapshot()
    }

    /// Current Air Quality Score, if all inputs are known.
    pub fn air_quality_score(&self) -> Option<u8> {
        self.aggregator().air_quality_score()
    }

    /// Device identity, once an advertisement has been recognised.
    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.aggregator().identity()
    }

    /// Current PlanetWatch state.
    pub fn sync_state(&self) -> RemoteSyncState {
        self.scheduler().state().clone()
    }

    /// Every named value: readings, score and PlanetWatch diagnostics.
    pub fn values(&self) -> Vec<(SensorKey, SensorValue)> {
        let (mut values, aqs) = {
            let aggregator = self.aggregator();
            (aggregator.current().values(), aggregator.air_quality_score())
        };
        if let Some(aqs) = aqs {
            values.push((SensorKey::AirQualityScore, SensorValue::Integer(i64::from(aqs))));
        }
        values.extend(self.scheduler().state().values());
        values
    }

    /// Forget all readings. Sync state is kept.
    pub fn reset(&self) {
        self.aggregator().reset();
    }
}
