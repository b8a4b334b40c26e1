//! Decode command - decode hex-encoded payloads without a device.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::{Value, json};

use atmotube_core::decode::decode_frame;
use atmotube_core::{CharacteristicKind, Decoded, RawFrame};
use atmotube_types::parse_hex;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_patch_text, patch_values, values_json};
use crate::util::write_output;

/// Arguments for the decode command.
pub struct DecodeArgs {
    pub frames: Vec<String>,
    pub characteristic: Option<CharacteristicKind>,
    pub format: OutputFormat,
}

/// Build a frame from a hex payload.
pub fn frame_from_hex(hex: &str, characteristic: Option<CharacteristicKind>) -> Result<RawFrame> {
    let bytes = parse_hex(hex).with_context(|| format!("Invalid hex payload '{}'", hex))?;
    Ok(match characteristic {
        Some(kind) => RawFrame::from_kind(kind, bytes),
        None => RawFrame::advertisement(bytes),
    })
}

fn decoded_json(hex: &str, decoded: &Decoded) -> Value {
    match decoded {
        Decoded::Patch(patch) => {
            let mut values = values_json(&patch_values(patch));
            if let Some(pm4) = patch.particulates.and_then(|p| p.pm4) {
                values.insert("pm4".to_string(), json!(pm4));
            }
            json!({
                "payload": hex,
                "recognized": true,
                "values": values,
                "device_id": patch.device_id,
                "firmware": patch.firmware,
            })
        }
        Decoded::Unrecognized(reason) => json!({
            "payload": hex,
            "recognized": false,
            "reason": reason.to_string(),
        }),
    }
}

/// Render decoded frames in the requested format.
pub fn render(args: &DecodeArgs, opts: &FormatOptions) -> Result<String> {
    let mut decoded = Vec::with_capacity(args.frames.len());
    for hex in &args.frames {
        let frame = frame_from_hex(hex, args.characteristic)?;
        decoded.push((hex.as_str(), decode_frame(&frame)));
    }

    match args.format {
        OutputFormat::Json => {
            let items: Vec<Value> = decoded
                .iter()
                .map(|(hex, d)| decoded_json(hex, d))
                .collect();
            opts.as_json(&items)
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for (hex, d) in &decoded {
                match d {
                    Decoded::Patch(patch) => {
                        out.push_str(&format!("{}:\n", hex));
                        out.push_str(&format_patch_text(patch));
                    }
                    Decoded::Unrecognized(reason) => {
                        out.push_str(&format!("{}: not recognized ({})\n", hex, reason));
                    }
                }
            }
            Ok(out)
        }
    }
}

/// Execute the decode command.
pub fn cmd_decode(args: DecodeArgs, output: Option<&PathBuf>, opts: &FormatOptions) -> Result<()> {
    let content = render(&args, opts)?;
    write_output(output, &content)
}
