//! PlanetWatch synchronisation scheduling.
//!
//! [`SyncScheduler`] is a pure state machine. It never performs I/O: it
//! decides when a registration check or a reading upload is due, hands the
//! caller an [`OutboundRequest`], and is told the result afterwards.
//!
//! ```text
//!            check ok, sensorfound = true
//!   Unknown ──────────────────────────────▶ Registered ──▶ uploads allowed
//!      │                                       ▲   │
//!      │  check ok, sensorfound = false        │   │ periodic re-check
//!      ▼                                       │   ▼
//!  NotRegistered ◀─────────────────────────────┴───┘
//! ```
//!
//! While the state is `Unknown` every tick emits a check. Once a check has
//! succeeded, checks are rate-limited by [`SyncSettings::check_interval`].
//! Uploads are rate-limited by [`SyncSettings::upload_interval`] unless the
//! caller bypasses the upload limit (after an active poll). A failed remote
//! call never changes the registration state, but the timestamp of the
//! attempt is kept.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;
use tracing::debug;

use atmotube_types::{SensorKey, SensorSnapshot, SensorValue};

use crate::error::{Error, Result};

/// Default base URL of the registration check endpoint.
pub const DEFAULT_CHECK_BASE_URL: &str = "https://algorandapi.planetwatch.io/api/planetwatch";

/// Default base URL of the upload endpoint.
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://sensorsws.planetwatch.io/atmo";

/// Minimum time between two registration checks.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Minimum time between two uploads (unless bypassed).
pub const UPLOAD_INTERVAL: Duration = Duration::from_secs(20);

/// Value of `company_name` in every upload.
pub const COMPANY_NAME: &str = "ATMOTUBE";

/// Where the sensor is, as reported in uploads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in metres.
    pub altitude: f64,
}

impl Geolocation {
    /// Create a new geolocation.
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }
}

/// Configuration for PlanetWatch synchronisation.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// Whether synchronisation is enabled at all.
    pub enabled: bool,
    /// Base URL for `checkSensor` requests.
    pub check_base_url: String,
    /// Base URL for uploads.
    pub upload_base_url: String,
    /// Minimum time between registration checks.
    pub check_interval: Duration,
    /// Minimum time between uploads.
    pub upload_interval: Duration,
    /// Sensor location. Required when enabled.
    pub geolocation: Option<Geolocation>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            check_base_url: DEFAULT_CHECK_BASE_URL.to_string(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
            check_interval: CHECK_INTERVAL,
            upload_interval: UPLOAD_INTERVAL,
            geolocation: None,
        }
    }
}

impl SyncSettings {
    /// Settings with synchronisation disabled.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Settings with synchronisation enabled at a location.
    pub fn enabled_at(geolocation: Geolocation) -> Self {
        Self {
            enabled: true,
            geolocation: Some(geolocation),
            ..Self::default()
        }
    }

    /// Set the check endpoint base URL.
    #[must_use]
    pub fn check_base_url(mut self, url: impl Into<String>) -> Self {
        self.check_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the upload endpoint base URL.
    #[must_use]
    pub fn upload_base_url(mut self, url: impl Into<String>) -> Self {
        self.upload_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the check interval.
    #[must_use]
    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Set the upload interval.
    #[must_use]
    pub fn upload_interval(mut self, interval: Duration) -> Self {
        self.upload_interval = interval;
        self
    }

    /// Check that enabled settings are usable.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        for url in [&self.check_base_url, &self.upload_base_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::invalid_config(format!(
                    "URL must start with http:// or https://, got: {}",
                    url
                )));
            }
        }
        if self.check_interval.is_zero() || self.upload_interval.is_zero() {
            return Err(Error::invalid_config("sync intervals must be non-zero"));
        }
        if self.geolocation.is_none() {
            return Err(Error::invalid_config(
                "a location is required when PlanetWatch sync is enabled",
            ));
        }
        Ok(())
    }
}

/// HTTP method of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// What an outbound request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Registration check.
    CheckRegistration,
    /// Reading upload.
    UploadReading,
}

/// A request the caller should execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub kind: RequestKind,
    pub method: HttpMethod,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// A response from the remote service, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

impl RemoteResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> std::result::Result<T, RemoteError> {
        serde_json::from_str(&self.body).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

/// Failure of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RemoteError {
    /// The request could not be delivered.
    #[error("PlanetWatch not reachable at {url}: {message}")]
    Unreachable { url: String, message: String },

    /// The service answered with an unexpected status.
    #[error("PlanetWatch returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be parsed.
    #[error("Invalid PlanetWatch response: {0}")]
    Decode(String),
}

/// Registration state of a sensor on PlanetWatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Registration {
    /// No successful check yet.
    #[default]
    Unknown,
    /// The sensor is registered; uploads are allowed.
    Registered,
    /// The sensor is not registered; uploads are never sent.
    NotRegistered,
}

/// Body of a successful `checkSensor` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct CheckSensorResponse {
    sensorfound: bool,
    #[serde(default)]
    sensor: Option<CheckSensorDetails>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct CheckSensorDetails {
    data_collected: u64,
}

/// Synchronisation state owned by the scheduler.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemoteSyncState {
    /// Last known registration state.
    pub registration: Registration,
    /// When the last check was emitted.
    pub last_checked_at: Option<OffsetDateTime>,
    /// When the last upload was emitted.
    pub last_uploaded_at: Option<OffsetDateTime>,
    /// When the last upload was accepted by the service.
    pub last_upload_confirmed_at: Option<OffsetDateTime>,
    /// Readings collected so far, as reported by the last check.
    pub data_collected: Option<u64>,
}

impl RemoteSyncState {
    /// Named diagnostic values for the host platform.
    pub fn values(&self) -> Vec<(SensorKey, SensorValue)> {
        let mut values = Vec::new();
        if let Some(count) = self.data_collected {
            values.push((
                SensorKey::PlanetwatchDataCollected,
                SensorValue::Integer(i64::try_from(count).unwrap_or(i64::MAX)),
            ));
        }
        if let Some(at) = self.last_upload_confirmed_at {
            values.push((SensorKey::PlanetwatchLastUpdated, SensorValue::Timestamp(at)));
        }
        values
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A complete upload body. Only constructible when every field is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadPayload {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// VOC in ppm.
    pub voc: f64,
    pub aqs: u8,
    pub pm1: f64,
    pub pm25: f64,
    pub pm10: f64,
    /// Temperature in °C.
    pub temp: f64,
    /// Relative humidity in percent.
    pub humidity: i64,
    /// Pressure in hPa.
    pub pressure: f64,
    pub device_id: String,
    pub company_name: String,
}

impl UploadPayload {
    /// Build the payload, or `None` if any field is missing.
    pub fn from_snapshot(
        snapshot: &SensorSnapshot,
        aqs: Option<u8>,
        geolocation: &Geolocation,
    ) -> Option<Self> {
        Some(Self {
            latitude: geolocation.latitude,
            longitude: geolocation.longitude,
            altitude: geolocation.altitude,
            voc: snapshot.voc_ppm()?,
            aqs: aqs?,
            pm1: round2(snapshot.pm1()?),
            pm25: round2(snapshot.pm25()?),
            pm10: round2(snapshot.pm10()?),
            temp: round2(snapshot.temperature?),
            humidity: i64::from(snapshot.humidity?),
            pressure: snapshot.pressure_hpa()?,
            device_id: snapshot.address.clone(),
            company_name: COMPANY_NAME.to_string(),
        })
    }

    /// JSON body for the upload request.
    pub fn to_json(&self) -> Value {
        json!({
            "latitude": self.latitude,
            "longitude": self.longitude,
            "altitude": self.altitude,
            "voc": self.voc,
            "aqs": self.aqs,
            "pm1": self.pm1,
            "pm25": self.pm25,
            "pm10": self.pm10,
            "temp": self.temp,
            "humidity": self.humidity,
            "pressure": self.pressure,
            "device_id": self.device_id,
            "company_name": self.company_name,
        })
    }
}

/// Rate-limited PlanetWatch state machine for one device.
#[derive(Debug, Clone)]
pub struct SyncScheduler {
    address: String,
    settings: SyncSettings,
    state: RemoteSyncState,
}

impl SyncScheduler {
    /// Create a scheduler for a device address.
    pub fn new(address: impl Into<String>, settings: SyncSettings) -> Self {
        Self {
            address: address.into(),
            settings,
            state: RemoteSyncState::default(),
        }
    }

    /// True when synchronisation is switched off for this device.
    pub fn is_disabled(&self) -> bool {
        !self.settings.enabled
    }

    /// Current state.
    pub fn state(&self) -> &RemoteSyncState {
        &self.state
    }

    /// Settings in use.
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// URL of the registration check for this device.
    pub fn check_url(&self) -> String {
        format!("{}/checkSensor/{}", self.settings.check_base_url, self.address)
    }

    /// URL of the upload endpoint.
    pub fn upload_url(&self) -> String {
        format!("{}/v1", self.settings.upload_base_url)
    }

    fn elapsed(last: Option<OffsetDateTime>, now: OffsetDateTime, interval: Duration) -> bool {
        match last {
            None => true,
            Some(last) => now - last >= interval,
        }
    }

    fn advance(slot: &mut Option<OffsetDateTime>, now: OffsetDateTime) {
        *slot = Some(slot.map_or(now, |prev| prev.max(now)));
    }

    /// Emit a registration check if one is due, recording the attempt.
    ///
    /// A check is always due while the registration is still `Unknown`.
    pub fn check_due(&mut self, now: OffsetDateTime) -> Option<OutboundRequest> {
        if self.is_disabled() {
            return None;
        }
        if self.state.registration != Registration::Unknown
            && !Self::elapsed(self.state.last_checked_at, now, self.settings.check_interval)
        {
            return None;
        }
        Self::advance(&mut self.state.last_checked_at, now);
        Some(OutboundRequest {
            kind: RequestKind::CheckRegistration,
            method: HttpMethod::Get,
            url: self.check_url(),
            body: None,
        })
    }

    /// Apply the result of a registration check.
    ///
    /// Returns the new registration state, or the reason the check failed.
    /// A failure leaves the registration state untouched.
    pub fn on_check_response(
        &mut self,
        result: std::result::Result<RemoteResponse, RemoteError>,
    ) -> std::result::Result<Registration, RemoteError> {
        let response = result?;
        if response.status != 200 {
            return Err(RemoteError::Status {
                status: response.status,
                body: response.body,
            });
        }
        let parsed: CheckSensorResponse = response.json()?;
        self.state.registration = if parsed.sensorfound {
            Registration::Registered
        } else {
            Registration::NotRegistered
        };
        if parsed.sensorfound {
            if let Some(sensor) = parsed.sensor {
                self.state.data_collected = Some(sensor.data_collected);
            }
        }
        Ok(self.state.registration)
    }

    /// Emit an upload if one is due, recording the attempt.
    ///
    /// `bypass_rate_limit` skips the upload interval, never the registration
    /// gate or the completeness check.
    pub fn upload_due(
        &mut self,
        snapshot: &SensorSnapshot,
        aqs: Option<u8>,
        now: OffsetDateTime,
        bypass_rate_limit: bool,
    ) -> Option<OutboundRequest> {
        if self.is_disabled() || self.state.registration != Registration::Registered {
            return None;
        }
        if !bypass_rate_limit
            && !Self::elapsed(self.state.last_uploaded_at, now, self.settings.upload_interval)
        {
            return None;
        }
        let geolocation = self.settings.geolocation.as_ref()?;
        let Some(payload) = UploadPayload::from_snapshot(snapshot, aqs, geolocation) else {
            debug!("{}: Upload skipped, reading incomplete", self.address);
            return None;
        };
        Self::advance(&mut self.state.last_uploaded_at, now);
        Some(OutboundRequest {
            kind: RequestKind::UploadReading,
            method: HttpMethod::Post,
            url: self.upload_url(),
            body: Some(payload.to_json()),
        })
    }

    /// Apply the result of an upload.
    pub fn on_upload_response(
        &mut self,
        result: std::result::Result<RemoteResponse, RemoteError>,
    ) -> std::result::Result<(), RemoteError> {
        let response = result?;
        if !response.is_success() {
            return Err(RemoteError::Status {
                status: response.status,
                body: response.body,
            });
        }
        self.state.last_upload_confirmed_at = self.state.last_uploaded_at;
        Ok(())
    }
}
