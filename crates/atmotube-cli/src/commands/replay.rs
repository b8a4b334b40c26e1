//! Replay command - feed a captured frame log through a device session.
//!
//! Each non-empty line of the log is
//!
//! ```text
//! [timestamp] source hex
//! ```
//!
//! where `timestamp` is an optional RFC 3339 time, `source` is `adv` for an
//! advertisement payload or a characteristic name or UUID, and `hex` is the
//! payload. Lines starting with `#` are ignored. Without `--send`, requests
//! are printed and answered as if the sensor were registered.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

use atmotube_core::planetwatch::HttpTransport;
use atmotube_core::sync::OutboundRequest;
use atmotube_core::{
    CharacteristicKind, Clock, DeviceSession, MockClock, MockTransport, RawFrame, RemoteError,
    RemoteResponse, SyncReport, Transport,
};
use atmotube_types::parse_hex;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::format::{FormatOptions, format_request_text, format_values_text, values_json};
use crate::util::{require_device, write_output};

/// Arguments for the replay command.
pub struct ReplayArgs {
    pub file: PathBuf,
    pub device: Option<String>,
    pub send: bool,
    pub format: OutputFormat,
}

/// One parsed line of a frame log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// 1-based line number.
    pub line: usize,
    pub at: Option<OffsetDateTime>,
    pub frame: RawFrame,
}

fn parse_source(source: &str, bytes: Vec<u8>) -> Result<RawFrame> {
    if source.eq_ignore_ascii_case("adv") || source.eq_ignore_ascii_case("advertisement") {
        return Ok(RawFrame::advertisement(bytes));
    }
    if let Ok(kind) = source.parse::<CharacteristicKind>() {
        return Ok(RawFrame::from_kind(kind, bytes));
    }
    // Unknown UUIDs are kept so the session can report them.
    let uuid = source
        .parse::<uuid::Uuid>()
        .with_context(|| format!("unknown frame source '{}'", source))?;
    Ok(RawFrame::characteristic(uuid, bytes))
}

/// Parse one log line. Returns `None` for blank lines and comments.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<LogEntry>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut fields = line.split_whitespace();
    let first = fields.next().unwrap_or_default();
    let (at, source) = match OffsetDateTime::parse(first, &Rfc3339) {
        Ok(at) => (Some(at), fields.next()),
        Err(_) => (None, Some(first)),
    };
    let Some(source) = source else {
        bail!("line {}: missing frame source", line_no);
    };
    let hex: String = fields.collect();
    if hex.is_empty() {
        bail!("line {}: missing payload", line_no);
    }

    let bytes = parse_hex(&hex).with_context(|| format!("line {}: invalid payload", line_no))?;
    let frame = parse_source(source, bytes).with_context(|| format!("line {}", line_no))?;
    Ok(Some(LogEntry {
        line: line_no,
        at,
        frame,
    }))
}

/// Parse a whole frame log.
pub fn parse_log(content: &str) -> Result<Vec<LogEntry>> {
    let mut entries = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if let Some(entry) = parse_line(i + 1, line)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Transport wrapper that keeps every exchange for display.
pub struct RecordingTransport {
    inner: Arc<dyn Transport>,
    log: Mutex<Vec<Exchange>>,
}

/// A request and its result.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub request: OutboundRequest,
    pub result: std::result::Result<RemoteResponse, RemoteError>,
}

impl RecordingTransport {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self {
            inner,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Remove and return the exchanges recorded so far.
    pub fn take(&self) -> Vec<Exchange> {
        self.log
            .lock()
            .map(|mut log| std::mem::take(&mut *log))
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        request: &OutboundRequest,
    ) -> std::result::Result<RemoteResponse, RemoteError> {
        let result = self.inner.send(request).await;
        if let Ok(mut log) = self.log.lock() {
            log.push(Exchange {
                request: request.clone(),
                result: result.clone(),
            });
        }
        result
    }
}

/// What happened for one log entry.
#[derive(Debug, Clone)]
pub struct ReplayEvent {
    pub line: usize,
    pub at: OffsetDateTime,
    pub recognized: bool,
    pub air_quality_score: Option<u8>,
    pub sync: Option<SyncReport>,
    pub exchanges: Vec<Exchange>,
}

/// Feed entries through a session, running a sync whenever one is wanted.
pub async fn replay(
    entries: &[LogEntry],
    session: &DeviceSession,
    clock: &MockClock,
    transport: &RecordingTransport,
) -> Vec<ReplayEvent> {
    let mut events = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(at) = entry.at {
            clock.set(at);
        }
        let outcome = session.ingest(&entry.frame);
        let sync = if outcome.sync_wanted {
            session.sync().await
        } else {
            None
        };
        events.push(ReplayEvent {
            line: entry.line,
            at: clock.now(),
            recognized: outcome.recognized,
            air_quality_score: outcome.air_quality_score,
            sync,
            exchanges: transport.take(),
        });
    }
    events
}

fn result_text(result: &std::result::Result<RemoteResponse, RemoteError>) -> String {
    match result {
        Ok(response) => format!("HTTP {}", response.status),
        Err(e) => e.to_string(),
    }
}

fn render_text(events: &[ReplayEvent], session: &DeviceSession) -> String {
    let mut out = String::new();
    for event in events {
        let status = if event.recognized {
            "recognized"
        } else {
            "not recognized"
        };
        out.push_str(&format!("line {}: {}", event.line, status));
        if let Some(aqs) = event.air_quality_score {
            out.push_str(&format!(", AQS {}", aqs));
        }
        out.push('\n');
        for exchange in &event.exchanges {
            out.push_str("  -> ");
            out.push_str(&format_request_text(&exchange.request));
            out.push_str(&format!("  <- {}\n", result_text(&exchange.result)));
        }
    }

    out.push_str(&format!("\n{}\n", session.address()));
    if let Some(identity) = session.identity() {
        out.push_str(&format!("  {:<28} {}\n", "name", identity.name));
        if let Some(version) = identity.sw_version {
            out.push_str(&format!("  {:<28} {}\n", "firmware", version));
        }
    }
    out.push_str(&format!(
        "  {:<28} {:?}\n",
        "registration",
        session.sync_state().registration
    ));
    out.push_str(&format_values_text(&session.values()));
    out
}

fn render_json(events: &[ReplayEvent], session: &DeviceSession) -> Value {
    let events: Vec<Value> = events
        .iter()
        .map(|event| {
            let exchanges: Vec<Value> = event
                .exchanges
                .iter()
                .map(|x| {
                    json!({
                        "request": x.request,
                        "result": result_text(&x.result),
                    })
                })
                .collect();
            json!({
                "line": event.line,
                "at": event.at.format(&Rfc3339).ok(),
                "recognized": event.recognized,
                "aqs": event.air_quality_score,
                "upload_accepted": event.sync.as_ref().map(SyncReport::upload_accepted),
                "requests": exchanges,
            })
        })
        .collect();

    json!({
        "device": session.address(),
        "name": session.identity().map(|i| i.name),
        "registration": session.sync_state().registration,
        "values": values_json(&session.values()),
        "events": events,
    })
}

/// Read, replay and render a frame log.
pub async fn run(
    args: &ReplayArgs,
    config: &Config,
    transport: Arc<dyn Transport>,
    opts: &FormatOptions,
) -> Result<String> {
    let address = require_device(config.resolve_device(args.device.as_deref()))?;
    let content = read_log(&args.file)?;
    let entries = parse_log(&content)?;

    let start = entries
        .iter()
        .find_map(|e| e.at)
        .unwrap_or_else(OffsetDateTime::now_utc);
    let clock = Arc::new(MockClock::new(start));
    let recorder = Arc::new(RecordingTransport::new(transport));
    let settings = config.sync_settings();
    settings.validate()?;
    let session = DeviceSession::with_clock(address, settings, recorder.clone(), clock.clone())
        .with_options(config.session_options());

    info!(
        "Replaying {} frames for {}",
        entries.len(),
        session.address()
    );
    let events = replay(&entries, &session, &clock, &recorder).await;

    match args.format {
        OutputFormat::Json => opts.as_json(&render_json(&events, &session)),
        OutputFormat::Text => Ok(render_text(&events, &session)),
    }
}

fn read_log(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read frame log {}", path.display()))
}

/// Execute the replay command.
pub async fn cmd_replay(
    args: ReplayArgs,
    config: &Config,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    config.validate()?;
    let transport: Arc<dyn Transport> = if args.send {
        if !config.planetwatch.enabled {
            bail!("--send requires planetwatch.enabled = true in the configuration");
        }
        Arc::new(HttpTransport::new(config.request_timeout())?)
    } else {
        Arc::new(MockTransport::registered())
    };

    let content = run(&args, config, transport, opts).await?;
    write_output(output, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeviceConfig, LocationConfig};
    use atmotube_core::sync::RequestKind;
    use atmotube_types::FrameSource;
    use time::macros::datetime;

    const LOG: &str = "\
# captured in the bedroom
2024-05-01T12:00:00Z adv 01039e321a19000140ea4164
2024-05-01T12:00:01Z adv 00 01 00 02 00 03 74 05 1e
2024-05-01T12:00:05Z adv 01039e321a19000140ea4164

2024-05-01T12:00:25Z adv 01039e321a19000140ea4164
2024-05-01T12:00:26Z status 4150
";

    fn config() -> Config {
        let mut config = Config::default();
        config.planetwatch.enabled = true;
        config.location = Some(LocationConfig {
            latitude: 40.4483,
            longitude: -111.8719,
            altitude: 1649.0,
        });
        config.devices.push(DeviceConfig {
            address: "CC:61:37:BB:02:02".to_string(),
            alias: Some("bedroom".to_string()),
        });
        config
    }

    #[test]
    fn test_parse_line_variants() {
        assert_eq!(parse_line(1, "   ").unwrap(), None);
        assert_eq!(parse_line(1, "# comment").unwrap(), None);

        let entry = parse_line(2, "adv 0102").unwrap().unwrap();
        assert_eq!(entry.at, None);
        assert_eq!(entry.frame, RawFrame::advertisement(vec![0x01, 0x02]));

        let entry = parse_line(3, "2024-05-01T12:00:00Z particulate 00 01")
            .unwrap()
            .unwrap();
        assert_eq!(entry.at, Some(datetime!(2024-05-01 12:00:00 UTC)));
        assert_eq!(entry.frame.kind(), Some(CharacteristicKind::Particulate));

        let entry = parse_line(4, "00000000-0000-0000-0000-000000000000 00")
            .unwrap()
            .unwrap();
        assert_eq!(
            entry.frame.source,
            FrameSource::Characteristic(uuid::Uuid::nil())
        );
    }

    #[test]
    fn test_parse_line_errors() {
        assert!(parse_line(1, "adv").is_err());
        assert!(parse_line(1, "co2 0102").is_err());
        assert!(parse_line(1, "adv 0g").is_err());
        assert!(parse_line(1, "2024-05-01T12:00:00Z").is_err());
    }

    #[test]
    fn test_parse_log_skips_blank_lines() {
        let entries = parse_log(LOG).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].line, 2);
        assert_eq!(entries[3].line, 6);
    }

    #[tokio::test]
    async fn test_replay_dry_run() {
        let entries = parse_log(LOG).unwrap();
        let config = config();
        let clock = Arc::new(MockClock::new(datetime!(2024-05-01 12:00:00 UTC)));
        let recorder = Arc::new(RecordingTransport::new(Arc::new(
            MockTransport::registered(),
        )));
        let session = DeviceSession::with_clock(
            "CC:61:37:BB:02:02",
            config.sync_settings(),
            recorder.clone(),
            clock.clone(),
        );

        let events = replay(&entries, &session, &clock, &recorder).await;
        assert_eq!(events.len(), 5);

        // No score until the PM advertisement arrives.
        assert!(events[0].exchanges.is_empty());

        // Check then upload.
        let kinds: Vec<RequestKind> = events[1]
            .exchanges
            .iter()
            .map(|x| x.request.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![RequestKind::CheckRegistration, RequestKind::UploadReading]
        );

        // Within the upload interval: nothing sent.
        assert!(events[2].exchanges.is_empty());

        // 24 s after the first upload: upload again, no check.
        let kinds: Vec<RequestKind> = events[3]
            .exchanges
            .iter()
            .map(|x| x.request.kind)
            .collect();
        assert_eq!(kinds, vec![RequestKind::UploadReading]);

        assert_eq!(session.snapshot().battery, Some(80));
    }

    #[tokio::test]
    async fn test_run_renders_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.log");
        std::fs::write(&path, LOG).unwrap();

        let args = ReplayArgs {
            file: path,
            device: Some("bedroom".to_string()),
            send: false,
            format: OutputFormat::Json,
        };
        let out = run(
            &args,
            &config(),
            Arc::new(MockTransport::registered()),
            &FormatOptions::default(),
        )
        .await
        .unwrap();

        let json: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["device"], "CC:61:37:BB:02:02");
        assert_eq!(json["registration"], "registered");
        assert_eq!(json["events"].as_array().unwrap().len(), 5);
        assert_eq!(json["events"][1]["upload_accepted"], true);
        assert_eq!(json["values"]["planetwatch_data_collected"], 1);
    }

    #[tokio::test]
    async fn test_run_rejects_sync_without_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.log");
        std::fs::write(&path, LOG).unwrap();

        let mut config = config();
        config.location = None;
        let args = ReplayArgs {
            file: path,
            device: None,
            send: false,
            format: OutputFormat::Text,
        };
        let err = run(
            &args,
            &config,
            Arc::new(MockTransport::registered()),
            &FormatOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("location"));
    }

    #[tokio::test]
    async fn test_run_without_device_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.log");
        std::fs::write(&path, LOG).unwrap();

        let args = ReplayArgs {
            file: path,
            device: None,
            send: false,
            format: OutputFormat::Text,
        };
        let result = run(
            &args,
            &Config::default(),
            Arc::new(MockTransport::registered()),
            &FormatOptions::default(),
        )
        .await;
        assert!(result.is_err());
    }
}
