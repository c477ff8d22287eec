//! CLI argument parsing for t4gen.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// t4gen: run T4 templates through an external template processor.
///
/// Each template is handed to the processor executable; its output is
/// written next to the template and its diagnostics are printed as
/// `file(line,column): error: message`.
#[derive(Parser, Debug)]
#[command(name = "t4gen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file (default: ./t4gen.yaml if present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for t4gen.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate output for templates.
    ///
    /// Files are processed as given; directories are searched with the
    /// configured `include` globs.
    Generate(GenerateArgs),

    /// Show the output directive settings of a template.
    ///
    /// Prints the extension and encoding the template's output will get.
    Scan(ScanArgs),

    /// Print the effective configuration as YAML.
    Config,
}

/// Arguments for the `generate` command.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Template files or directories.
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Processor executable (overrides config).
    #[arg(long)]
    pub processor: Option<PathBuf>,

    /// Seconds before the processor is killed (overrides config).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// How output is read back: bytes or text (overrides config).
    #[arg(long)]
    pub mode: Option<String>,

    /// Number of templates processed in parallel.
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    /// Print a JSON report instead of human-readable diagnostics.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `scan` command.
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Template file to inspect.
    pub template: PathBuf,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
