//! Mock collaborators for testing.
//!
//! These mocks implement [`CharacteristicReader`], [`Transport`] and
//! [`Clock`] so a [`DeviceSession`](crate::DeviceSession) can be driven
//! without BLE hardware or network access.
//!
//! # Features
//!
//! - **Failure injection**: make reads or sends fail
//! - **Latency simulation**: add artificial delays to reads
//! - **Request capture**: inspect every request a session emitted

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use atmotube_types::CharacteristicKind;

use crate::error::{Error, Result};
use crate::sync::{OutboundRequest, RemoteError, RemoteResponse, RequestKind};
use crate::traits::{CharacteristicReader, Clock, Transport};

/// A mock connected Atmotube PRO.
///
/// # Example
///
/// ```
/// use atmotube_core::{CharacteristicReader, MockReader};
/// use atmotube_types::CharacteristicKind;
///
/// #[tokio::main]
/// async fn main() {
///     let reader = MockReader::builder()
///         .value(CharacteristicKind::Status, vec![0x41, 0x50])
///         .build();
///     let bytes = reader.read_characteristic(CharacteristicKind::Status).await.unwrap();
///     assert_eq!(bytes, vec![0x41, 0x50]);
/// }
/// ```
#[derive(Debug, Default)]
pub struct MockReader {
    values: RwLock<HashMap<CharacteristicKind, Vec<u8>>>,
    should_fail: AtomicBool,
    read_count: AtomicU32,
    /// Simulated read latency in milliseconds (0 = no delay).
    read_latency_ms: AtomicU64,
}

impl MockReader {
    /// Create a reader with no characteristic values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a reader.
    pub fn builder() -> MockReaderBuilder {
        MockReaderBuilder::new()
    }

    /// Set the value of a characteristic.
    pub async fn set_value(&self, kind: CharacteristicKind, bytes: Vec<u8>) {
        self.values.write().await.insert(kind, bytes);
    }

    /// Make every read fail (or succeed again).
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Set simulated read latency.
    pub fn set_read_latency(&self, latency: Duration) {
        self.read_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of reads performed.
    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CharacteristicReader for MockReader {
    async fn read_characteristic(&self, kind: CharacteristicKind) -> Result<Vec<u8>> {
        let latency = self.read_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        self.read_count.fetch_add(1, Ordering::Relaxed);

        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::transport("mock read failure"));
        }
        self.values
            .read()
            .await
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::characteristic_not_found(kind.uuid().to_string(), 0))
    }
}

/// Builder for [`MockReader`].
#[derive(Debug, Default)]
pub struct MockReaderBuilder {
    values: HashMap<CharacteristicKind, Vec<u8>>,
    should_fail: bool,
    read_latency: Duration,
}

impl MockReaderBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value of a characteristic.
    #[must_use]
    pub fn value(mut self, kind: CharacteristicKind, bytes: Vec<u8>) -> Self {
        self.values.insert(kind, bytes);
        self
    }

    /// Make every read fail.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Delay every read.
    #[must_use]
    pub fn read_latency(mut self, latency: Duration) -> Self {
        self.read_latency = latency;
        self
    }

    /// Build the reader.
    #[must_use]
    pub fn build(self) -> MockReader {
        let reader = MockReader {
            values: RwLock::new(self.values),
            ..MockReader::default()
        };
        reader.set_should_fail(self.should_fail);
        reader.set_read_latency(self.read_latency);
        reader
    }
}

/// A mock PlanetWatch endpoint that records requests.
///
/// Responses are queued per [`RequestKind`]. When a queue is empty the
/// transport answers with the default response for that kind, or with an
/// `Unreachable` error if none is set.
#[derive(Debug, Default)]
pub struct MockTransport {
    queued: StdMutex<HashMap<RequestKind, VecDeque<std::result::Result<RemoteResponse, RemoteError>>>>,
    defaults: StdMutex<HashMap<RequestKind, RemoteResponse>>,
    requests: StdMutex<Vec<OutboundRequest>>,
}

impl MockTransport {
    /// Create a transport with no responses configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport for a registered sensor that accepts every upload.
    pub fn registered() -> Self {
        let transport = Self::new();
        transport.set_default(
            RequestKind::CheckRegistration,
            RemoteResponse::new(200, r#"{"sensorfound": true, "sensor": {"data_collected": 1}}"#),
        );
        transport.set_default(RequestKind::UploadReading, RemoteResponse::new(200, "{}"));
        transport
    }

    /// A transport for a sensor that is not registered.
    pub fn not_registered() -> Self {
        let transport = Self::new();
        transport.set_default(
            RequestKind::CheckRegistration,
            RemoteResponse::new(200, r#"{"sensorfound": false}"#),
        );
        transport
    }

    /// Set the response used when no queued response is left.
    pub fn set_default(&self, kind: RequestKind, response: RemoteResponse) {
        if let Ok(mut defaults) = self.defaults.lock() {
            defaults.insert(kind, response);
        }
    }

    /// Queue a one-shot result.
    pub fn push(&self, kind: RequestKind, result: std::result::Result<RemoteResponse, RemoteError>) {
        if let Ok(mut queued) = self.queued.lock() {
            queued.entry(kind).or_default().push_back(result);
        }
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Requests of one kind sent so far.
    pub fn requests_of(&self, kind: RequestKind) -> Vec<OutboundRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.kind == kind)
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        request: &OutboundRequest,
    ) -> std::result::Result<RemoteResponse, RemoteError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let queued = self
            .queued
            .lock()
            .ok()
            .and_then(|mut q| q.get_mut(&request.kind).and_then(VecDeque::pop_front));
        if let Some(result) = queued {
            return result;
        }
        self.defaults
            .lock()
            .ok()
            .and_then(|d| d.get(&request.kind).cloned())
            .ok_or_else(|| RemoteError::Unreachable {
                url: request.url.clone(),
                message: "no mock response configured".to_string(),
            })
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct MockClock {
    now: StdMutex<OffsetDateTime>,
}

impl MockClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: StdMutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    /// Jump to a specific time.
    pub fn set(&self, at: OffsetDateTime) {
        if let Ok(mut now) = self.now.lock() {
            *now = at;
        }
    }
}

impl Clock for MockClock {
    fn now(&self) -> OffsetDateTime {
        self.now
            .lock()
            .map(|now| *now)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::HttpMethod;
    use time::macros::datetime;

    fn request(kind: RequestKind) -> OutboundRequest {
        OutboundRequest {
            kind,
            method: HttpMethod::Get,
            url: "http://localhost/checkSensor/aa".to_string(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_mock_reader_values() {
        let reader = MockReader::builder()
            .value(CharacteristicKind::Voc, vec![0x0A, 0x00, 0x00, 0x00])
            .build();

        let bytes = reader
            .read_characteristic(CharacteristicKind::Voc)
            .await
            .unwrap();
        assert_eq!(bytes, vec![0x0A, 0x00, 0x00, 0x00]);
        assert_eq!(reader.read_count(), 1);

        let missing = reader.read_characteristic(CharacteristicKind::Status).await;
        assert!(matches!(missing, Err(Error::CharacteristicNotFound { .. })));
    }

    #[tokio::test]
    async fn test_mock_reader_fail() {
        let reader = MockReader::builder()
            .value(CharacteristicKind::Voc, vec![0; 4])
            .failing()
            .build();
        let result = reader.read_characteristic(CharacteristicKind::Voc).await;
        assert!(matches!(result, Err(Error::Transport(_))));

        reader.set_should_fail(false);
        assert!(reader.read_characteristic(CharacteristicKind::Voc).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_transport_queue_then_default() {
        let transport = MockTransport::registered();
        transport.push(
            RequestKind::CheckRegistration,
            Ok(RemoteResponse::new(500, "boom")),
        );

        let first = transport
            .send(&request(RequestKind::CheckRegistration))
            .await
            .unwrap();
        assert_eq!(first.status, 500);

        let second = transport
            .send(&request(RequestKind::CheckRegistration))
            .await
            .unwrap();
        assert_eq!(second.status, 200);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_transport_unconfigured_is_unreachable() {
        let transport = MockTransport::new();
        let result = transport.send(&request(RequestKind::UploadReading)).await;
        assert!(matches!(result, Err(RemoteError::Unreachable { .. })));
        assert_eq!(transport.requests_of(RequestKind::UploadReading).len(), 1);
    }

    #[test]
    fn test_mock_clock() {
        let clock = MockClock::new(datetime!(2024-05-01 12:00:00 UTC));
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now(), datetime!(2024-05-01 12:01:30 UTC));

        clock.set(datetime!(2024-06-01 00:00:00 UTC));
        assert_eq!(clock.now(), datetime!(2024-06-01 00:00:00 UTC));
    }
}
