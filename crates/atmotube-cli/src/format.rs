//! Output formatting utilities for text and JSON output.

use std::fmt::Write as _;

use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};

use atmotube_core::sync::OutboundRequest;
use atmotube_core::{AqsLevel, ReadingPatch, SensorKey, SensorSnapshot, SensorValue};

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
}

impl FormatOptions {
    /// Create with compact JSON option.
    #[must_use]
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }
}

/// Named values of a decoded patch, in snapshot order.
pub fn patch_values(patch: &ReadingPatch) -> Vec<(SensorKey, SensorValue)> {
    let mut scratch = SensorSnapshot::default();
    scratch.apply(patch);
    scratch.values()
}

/// Named values as a JSON object keyed by value name.
pub fn values_json(values: &[(SensorKey, SensorValue)]) -> Map<String, Value> {
    values
        .iter()
        .map(|(key, value)| {
            let value = serde_json::to_value(value).unwrap_or(Value::Null);
            (key.as_str().to_string(), value)
        })
        .collect()
}

/// One line per value: name, value and unit.
pub fn format_values_text(values: &[(SensorKey, SensorValue)]) -> String {
    let mut out = String::new();
    for (key, value) in values {
        let _ = match key.unit() {
            Some(unit) => writeln!(out, "  {:<28} {} {}", key.as_str(), value, unit),
            None => writeln!(out, "  {:<28} {}", key.as_str(), value),
        };
    }
    out
}

/// Text rendering of a decoded patch.
pub fn format_patch_text(patch: &ReadingPatch) -> String {
    let mut out = format_values_text(&patch_values(patch));
    if let Some(particulates) = &patch.particulates
        && let Some(pm4) = particulates.pm4
    {
        let _ = writeln!(out, "  {:<28} {} µg/m³", "pm4", pm4);
    }
    if let Some(device_id) = &patch.device_id {
        let _ = writeln!(out, "  {:<28} {}", "device_id", device_id);
    }
    if let Some(firmware) = &patch.firmware {
        let _ = writeln!(out, "  {:<28} {}", "firmware", firmware);
    }
    out
}

/// Text rendering of an Air Quality Score.
pub fn format_score_text(score: u8) -> String {
    let level = AqsLevel::from_score(score);
    format!("AQS {} ({})\n", score, level.description())
}

/// One-line rendering of an outbound request, with its body if any.
pub fn format_request_text(request: &OutboundRequest) -> String {
    let mut out = format!("{} {}\n", request.method, request.url);
    if let Some(body) = &request.body {
        let _ = writeln!(out, "  {}", body);
    }
    out
}
