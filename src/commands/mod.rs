//! Command implementations for t4gen.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Each handler returns the process exit code.

mod generate;

use crate::cli::{Cli, Command, ScanArgs};
use std::path::Path;
use t4gen::config::Config;
use t4gen::directive;
use t4gen::error::{GenerationError, Result};
use t4gen::exit_codes;
use t4gen::generator::decode_text;

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Generate(args) => generate::cmd_generate(config, args),
        Command::Scan(args) => cmd_scan(&config, args),
        Command::Config => cmd_config(&config),
    }
}

/// Load the explicit config file, or `t4gen.yaml` from the working directory.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => {
            let cwd = std::env::current_dir().map_err(|e| {
                GenerationError::UserError(format!(
                    "failed to get current working directory: {}",
                    e
                ))
            })?;
            Config::load_or_default(cwd)
        }
    }
}

/// Read a template, honoring a byte order mark.
pub(crate) fn read_template(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| {
        GenerationError::UserError(format!(
            "failed to read template '{}': {}",
            path.display(),
            e
        ))
    })?;
    Ok(decode_text(&bytes, None))
}

fn cmd_scan(config: &Config, args: ScanArgs) -> Result<i32> {
    let content = read_template(&args.template)?;
    let found = directive::scan(&content);

    println!(
        "extension: {}",
        found.extension_or(&config.default_extension)
    );
    println!(
        "encoding: {}",
        found.encoding.as_deref().unwrap_or("(default)")
    );

    Ok(exit_codes::SUCCESS)
}

fn cmd_config(config: &Config) -> Result<i32> {
    print!("{}", config.to_yaml()?);
    Ok(exit_codes::SUCCESS)
}
