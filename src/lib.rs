//! t4gen: run T4 templates through an external processor.
//!
//! The processor is a separate executable. t4gen launches it with a deadline,
//! reads the framed diagnostics it writes to standard error, and hands back
//! either the generated output or the diagnostics, never both.
//!
//! ```no_run
//! use t4gen::config::Config;
//! use t4gen::diagnostic::CollectingSink;
//! use t4gen::generator::{GenerationRequest, Generator, RawBytes};
//!
//! let generator = Generator::from_config(&Config::default(), RawBytes)?;
//! let request = GenerationRequest::new("Model.tt", std::fs::read_to_string("Model.tt")?);
//! let mut sink = CollectingSink::new();
//! let result = generator.generate(&request, &mut sink);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod diagnostic;
pub mod directive;
pub mod error;
pub mod escape;
pub mod events;
pub mod exit_codes;
pub mod generator;
pub mod processor;
pub mod temp;

#[cfg(test)]
mod test_support;
