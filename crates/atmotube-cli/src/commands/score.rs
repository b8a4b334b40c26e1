//! Score command - compute the Air Quality Score from raw values.

use std::path::PathBuf;

use anyhow::{Result, bail};
use serde_json::json;

use atmotube_core::aqs::{PM1_LADDER, PM10_LADDER, PM25_LADDER, aqs_from_pm, aqs_from_voc};
use atmotube_core::{AqsLevel, calc_aqs};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_score_text};
use crate::util::write_output;

/// Arguments for the score command.
pub struct ScoreArgs {
    /// VOC in ppb.
    pub voc: f64,
    pub pm1: f64,
    pub pm25: f64,
    pub pm10: f64,
    pub format: OutputFormat,
}

/// Render the score and its sub-scores in the requested format.
pub fn render(args: &ScoreArgs, opts: &FormatOptions) -> Result<String> {
    for (name, value) in [
        ("voc", args.voc),
        ("pm1", args.pm1),
        ("pm25", args.pm25),
        ("pm10", args.pm10),
    ] {
        if !value.is_finite() {
            bail!("--{} must be a finite number, got {}", name, value);
        }
    }

    let voc_ppm = args.voc / 1000.0;
    let score = calc_aqs(voc_ppm, args.pm1, args.pm25, args.pm10);
    let components = [
        ("voc", aqs_from_voc(voc_ppm)),
        ("pm1", aqs_from_pm(args.pm1, &PM1_LADDER)),
        ("pm25", aqs_from_pm(args.pm25, &PM25_LADDER)),
        ("pm10", aqs_from_pm(args.pm10, &PM10_LADDER)),
    ];

    match args.format {
        OutputFormat::Json => {
            let components: serde_json::Map<String, serde_json::Value> = components
                .iter()
                .map(|(name, s)| (name.to_string(), json!(s)))
                .collect();
            opts.as_json(&json!({
                "aqs": score,
                "level": AqsLevel::from_score(score),
                "components": components,
            }))
        }
        OutputFormat::Text => {
            let mut out = format_score_text(score);
            for (name, s) in components {
                out.push_str(&format!("  {:<6} {}\n", name, s));
            }
            Ok(out)
        }
    }
}

/// Execute the score command.
pub fn cmd_score(args: ScoreArgs, output: Option<&PathBuf>, opts: &FormatOptions) -> Result<()> {
    let content = render(&args, opts)?;
    write_output(output, &content)
}
