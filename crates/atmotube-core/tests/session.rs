//! End-to-end tests driving a full device session with mock collaborators.
//!
//! Run with: `cargo test --package atmotube-core --test session`

use std::sync::Arc;
use std::time::Duration;

use atmotube_core::sync::RequestKind;
use atmotube_core::{
    CharacteristicKind, CharacteristicReader, DeviceSession, Geolocation, MockClock, MockReader,
    MockTransport, RawFrame, Registration, RemoteError, RemoteResponse, SensorKey, SensorValue,
    SessionOptions, SyncSettings,
};
use time::macros::datetime;

const ADDRESS: &str = "CC:61:37:BB:02:02";

const ADV_STATUS: [u8; 12] = [
    0x01, 0x03, 0x9e, 0x32, 0x1a, 0x19, 0x00, 0x01, 0x40, 0xea, 0x41, 0x64,
];

const ADV_PM: [u8; 9] = [0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x74, 0x05, 0x1e];

fn settings() -> SyncSettings {
    SyncSettings::enabled_at(Geolocation::new(40.448394775390625, -111.87195105656713, 1649.0))
        .check_base_url("http://localhost:8080/api/planetwatch/")
        .upload_base_url("http://localhost:8080/atmo")
}

fn start(transport: Arc<MockTransport>) -> (DeviceSession, Arc<MockClock>) {
    let clock = Arc::new(MockClock::new(datetime!(2024-05-01 12:00:00 UTC)));
    let session = DeviceSession::with_clock(ADDRESS, settings(), transport, clock.clone());
    (session, clock)
}

#[tokio::test]
async fn test_advertisements_to_upload() {
    let transport = Arc::new(MockTransport::registered());
    let (session, _) = start(transport.clone());

    assert!(!session.on_advertisement(&ADV_STATUS).sync_wanted);
    let outcome = session.on_advertisement(&ADV_PM);
    assert!(outcome.sync_wanted);
    let score = outcome.air_quality_score.unwrap();

    let report = session.sync().await.unwrap();
    assert_eq!(report.check, Some(Ok(Registration::Registered)));
    assert!(report.upload_accepted());

    let requests = transport.requests();
    assert_eq!(
        requests[0].url,
        "http://localhost:8080/api/planetwatch/checkSensor/CC:61:37:BB:02:02"
    );
    assert_eq!(requests[1].url, "http://localhost:8080/atmo/v1");

    let body = requests[1].body.as_ref().unwrap();
    assert_eq!(body["voc"], 0.259);
    assert_eq!(body["aqs"], u64::from(score));
    assert_eq!(body["pm1"], 1.0);
    assert_eq!(body["pm25"], 2.0);
    assert_eq!(body["pm10"], 3.0);
    assert_eq!(body["temp"], 25.0);
    assert_eq!(body["humidity"], 26);
    assert_eq!(body["pressure"], 821.54);
    assert_eq!(body["device_id"], ADDRESS);
    assert_eq!(body["company_name"], "ATMOTUBE");
    assert_eq!(body["altitude"], 1649.0);
}

#[tokio::test]
async fn test_diagnostics_after_upload() {
    let transport = Arc::new(MockTransport::new());
    transport.set_default(
        RequestKind::CheckRegistration,
        RemoteResponse::new(200, r#"{"sensorfound": true, "sensor": {"data_collected": 4242}}"#),
    );
    transport.set_default(RequestKind::UploadReading, RemoteResponse::new(201, ""));
    let (session, _) = start(transport);

    session.on_advertisement(&ADV_STATUS);
    session.on_advertisement(&ADV_PM);
    session.sync().await.unwrap();

    let values = session.values();
    let collected = values
        .iter()
        .find(|(key, _)| *key == SensorKey::PlanetwatchDataCollected)
        .map(|(_, value)| value.clone());
    assert_eq!(collected, Some(SensorValue::Integer(4242)));
    assert_eq!(
        values
            .iter()
            .find(|(key, _)| *key == SensorKey::PlanetwatchLastUpdated)
            .map(|(_, value)| value.clone()),
        Some(SensorValue::Timestamp(datetime!(2024-05-01 12:00:00 UTC)))
    );
}

#[tokio::test]
async fn test_unreachable_service_recovers() {
    let transport = Arc::new(MockTransport::registered());
    transport.push(
        RequestKind::CheckRegistration,
        Err(RemoteError::Unreachable {
            url: "http://localhost:8080".to_string(),
            message: "connection refused".to_string(),
        }),
    );
    let (session, clock) = start(transport.clone());
    session.on_advertisement(&ADV_STATUS);
    session.on_advertisement(&ADV_PM);

    let report = session.sync().await.unwrap();
    assert!(matches!(report.check, Some(Err(RemoteError::Unreachable { .. }))));
    assert!(!report.upload_sent());

    // Registration is still unknown, so the next tick checks again.
    clock.advance(Duration::from_secs(20));
    let report = session.sync().await.unwrap();
    assert_eq!(report.check, Some(Ok(Registration::Registered)));
    assert!(report.upload_accepted());
    assert_eq!(transport.requests_of(RequestKind::CheckRegistration).len(), 2);

    // Now registered: checks fall back to the check interval.
    clock.advance(Duration::from_secs(60));
    assert_eq!(session.sync().await.unwrap().check, None);
}

#[tokio::test]
async fn test_disabled_sync_never_sends() {
    let transport = Arc::new(MockTransport::registered());
    let clock = Arc::new(MockClock::new(datetime!(2024-05-01 12:00:00 UTC)));
    let session =
        DeviceSession::with_clock(ADDRESS, SyncSettings::disabled(), transport.clone(), clock);
    session.on_advertisement(&ADV_STATUS);
    session.on_advertisement(&ADV_PM);

    let report = session.sync().await.unwrap();
    assert_eq!(report.check, None);
    assert_eq!(report.upload, None);

    let reader = MockReader::builder()
        .value(CharacteristicKind::Environmental, vec![0; 8])
        .value(CharacteristicKind::Particulate, vec![0; 12])
        .build();
    session.poll(&reader).await.unwrap();
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_poll_with_configured_characteristics() {
    let transport = Arc::new(MockTransport::registered());
    let (session, _) = start(transport.clone());
    let session = session.with_options(SessionOptions::new().poll_characteristics([
        CharacteristicKind::Voc,
        CharacteristicKind::Status,
        CharacteristicKind::Environmental,
        CharacteristicKind::Particulate,
    ]));

    let reader = MockReader::builder()
        .value(CharacteristicKind::Voc, vec![0x11, 0x01, 0x00, 0x00])
        .value(CharacteristicKind::Status, vec![0x49, 0x5A])
        .value(
            CharacteristicKind::Environmental,
            vec![0x1C, 0x16, 0xC8, 0x48, 0x01, 0x00, 0xE8, 0x08],
        )
        .value(
            CharacteristicKind::Particulate,
            vec![
                0x64, 0x00, 0x00, 0x8C, 0x00, 0x00, 0xF5, 0x00, 0x00, 0x2C, 0x01, 0x00,
            ],
        )
        .build();

    let report = session.poll(&reader).await.unwrap().unwrap();
    assert_eq!(report.merged.len(), 4);
    assert!(report.sync.unwrap().upload_accepted());

    let snapshot = session.snapshot();
    assert_eq!(snapshot.voc, Some(273));
    assert_eq!(snapshot.battery, Some(90));
    assert!(snapshot.info.unwrap().charging);
    assert_eq!(snapshot.humidity, Some(28));
    assert_eq!(snapshot.pressure, Some(84_168));
    assert_eq!(snapshot.pm25(), Some(1.4));

    let upload = &transport.requests_of(RequestKind::UploadReading)[0];
    let body = upload.body.as_ref().unwrap();
    assert_eq!(body["temp"], 22.8);
    assert_eq!(body["pm10"], 2.45);
    assert_eq!(body["pressure"], 841.68);
}

#[tokio::test]
async fn test_wrong_length_characteristic_is_ignored() {
    let transport = Arc::new(MockTransport::registered());
    let (session, _) = start(transport);
    let session =
        session.with_options(SessionOptions::new().poll_characteristics([CharacteristicKind::Voc]));
    let reader = MockReader::builder()
        .value(CharacteristicKind::Voc, vec![0x11, 0x01])
        .build();

    let report = session.poll(&reader).await.unwrap().unwrap();
    assert!(report.merged.is_empty());
    assert_eq!(report.sync, None);
    assert_eq!(session.snapshot().voc, None);
}

#[tokio::test]
async fn test_unknown_characteristic_frame() {
    let (session, _) = start(Arc::new(MockTransport::new()));
    let outcome = session.ingest(&RawFrame::characteristic(
        uuid::Uuid::nil(),
        vec![0x00, 0x01, 0x02, 0x03],
    ));
    assert!(!outcome.recognized);
}

#[tokio::test]
async fn test_reader_is_object_safe() {
    let reader: Box<dyn CharacteristicReader> = Box::new(
        MockReader::builder()
            .value(CharacteristicKind::Status, vec![0x41, 0x50])
            .build(),
    );
    let (session, _) = start(Arc::new(MockTransport::new()));
    let session =
        session.with_options(SessionOptions::new().poll_characteristics([CharacteristicKind::Status]));

    let report = session.poll(reader.as_ref()).await.unwrap().unwrap();
    assert_eq!(report.merged, vec![CharacteristicKind::Status]);
    assert_eq!(session.snapshot().battery, Some(80));
}
