//! Config command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::cli::ConfigAction;
use crate::config::Config;
use crate::util::{config_path, load_config, write_output};

/// Render the configuration as TOML.
pub fn render_show(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize configuration")
}

/// Validate the configuration at `explicit` or the default location.
pub fn render_validate(explicit: Option<&Path>) -> Result<String> {
    let path = config_path(explicit);
    let config = load_config(explicit)?;
    config.validate()?;
    if path.exists() {
        Ok(format!("Configuration is valid: {}\n", path.display()))
    } else {
        Ok(format!(
            "No configuration file at {}; defaults are valid\n",
            path.display()
        ))
    }
}

/// Write a default configuration file.
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Configuration already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }
    Config::default().save(path)?;
    Ok(())
}

pub fn cmd_config(
    action: ConfigAction,
    explicit: Option<&Path>,
    output: Option<&PathBuf>,
    quiet: bool,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(explicit)?;
            write_output(output, &render_show(&config)?)?;
        }
        ConfigAction::Validate => {
            let message = render_validate(explicit)?;
            if !quiet {
                write_output(output, &message)?;
            }
        }
        ConfigAction::Path => {
            write_output(output, &format!("{}\n", config_path(explicit).display()))?;
        }
        ConfigAction::Init { force } => {
            let path = config_path(explicit);
            init_config(&path, force)?;
            if !quiet {
                println!("Created configuration at {}", path.display());
            }
        }
    }
    Ok(())
}
