use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use atmotube_cli::cli::{Cli, Commands};
use atmotube_cli::commands::{
    DecodeArgs, ReplayArgs, ScoreArgs, cmd_config, cmd_decode, cmd_replay, cmd_score,
};
use atmotube_cli::format::FormatOptions;
use atmotube_cli::util::load_config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "atmotube", &mut io::stdout());
        return Ok(());
    }

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let opts = FormatOptions::default().with_compact(cli.compact);
    let output = cli.output.as_ref();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Decode {
            frames,
            characteristic,
            format,
        } => cmd_decode(
            DecodeArgs {
                frames,
                characteristic,
                format,
            },
            output,
            &opts,
        ),
        Commands::Score {
            voc,
            pm1,
            pm25,
            pm10,
            format,
        } => cmd_score(
            ScoreArgs {
                voc,
                pm1,
                pm25,
                pm10,
                format,
            },
            output,
            &opts,
        ),
        Commands::Replay {
            file,
            device,
            send,
            format,
        } => {
            let config = load_config(config_path)?;
            cmd_replay(
                ReplayArgs {
                    file,
                    device,
                    send,
                    format,
                },
                &config,
                output,
                &opts,
            )
            .await
        }
        Commands::Config { action } => cmd_config(action, config_path, output, cli.quiet),
        Commands::Completions { .. } => Ok(()),
    }
}
