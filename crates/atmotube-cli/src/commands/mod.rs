//! Command implementations for the CLI.

mod config;
mod decode;
mod replay;
mod score;

pub use config::cmd_config;
pub use decode::{DecodeArgs, cmd_decode};
pub use replay::{LogEntry, ReplayArgs, cmd_replay, parse_log};
pub use score::{ScoreArgs, cmd_score};
