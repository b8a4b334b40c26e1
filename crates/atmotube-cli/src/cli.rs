//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use atmotube_core::CharacteristicKind;

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "atmotube")]
#[command(author, version, about = "CLI for Atmotube PRO air-quality sensors", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output compact JSON (no pretty-printing)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "ATMOTUBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode hex-encoded advertisement or characteristic payloads
    Decode {
        /// Payloads as hex (separators ':', '-' and spaces are ignored)
        #[arg(required = true)]
        frames: Vec<String>,

        /// Decode as a characteristic (voc, environmental, status, particulate
        /// or a UUID) instead of an advertisement
        #[arg(short = 'C', long)]
        characteristic: Option<CharacteristicKind>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Compute the Air Quality Score from raw values
    Score {
        /// VOC in ppb, as reported by the sensor
        #[arg(long)]
        voc: f64,

        /// PM1 in µg/m³
        #[arg(long)]
        pm1: f64,

        /// PM2.5 in µg/m³
        #[arg(long)]
        pm25: f64,

        /// PM10 in µg/m³
        #[arg(long)]
        pm10: f64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Replay a captured frame log through a device session
    Replay {
        /// Frame log: one `[timestamp] <adv|characteristic> <hex>` per line
        file: PathBuf,

        /// Device address or alias (defaults to the first configured device)
        #[arg(short, long, env = "ATMOTUBE_DEVICE")]
        device: Option<String>,

        /// Send requests to PlanetWatch instead of printing them
        #[arg(long)]
        send: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate the configuration file
    Validate,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
