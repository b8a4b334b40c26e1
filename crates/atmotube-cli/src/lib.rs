//! Command-line interface for Atmotube PRO air-quality sensors.
//!
//! The CLI works on captured payloads rather than live radios: it decodes
//! advertisement and characteristic frames, computes the Air Quality Score,
//! and replays frame logs through a full device session, including the
//! PlanetWatch registration check and upload cycle.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `decode` | Decode hex payloads into named values |
//! | `score` | Compute the Air Quality Score from VOC and PM values |
//! | `replay` | Feed a frame log through a device session |
//! | `config` | Show, validate or initialize the configuration |
//! | `completions` | Generate shell completions |
//!
//! # Configuration
//!
//! Configuration lives in `~/.config/atmotube/config.toml` (or the platform
//! equivalent) and can be overridden with `--config` or `ATMOTUBE_CONFIG`:
//!
//! ```toml
//! [planetwatch]
//! enabled = true
//! upload_interval_secs = 20
//!
//! [location]
//! latitude = 40.4484
//! longitude = -111.8720
//! altitude = 1649.0
//!
//! [[devices]]
//! address = "CC:61:37:BB:02:02"
//! alias = "bedroom"
//! ```
//!
//! # Examples
//!
//! ```bash
//! atmotube decode 01039e321a19000140ea4164
//! atmotube decode --characteristic status 4150 --format json
//! atmotube score --voc 250 --pm1 3 --pm25 5 --pm10 8
//! atmotube replay frames.log --device bedroom
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod format;
pub mod util;

// Re-export core dependencies for convenience
pub use atmotube_core;
pub use atmotube_types;
