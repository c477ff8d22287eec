//! Template generation pipeline.
//!
//! One generation runs these steps in order:
//!
//! 1. **Scan** the template for an `output` directive (extension, encoding)
//! 2. **Allocate** a temp output path
//! 3. **Invoke** the processor with a deadline
//! 4. **Classify** the exit code, decode diagnostics, read the output back
//!
//! Every failure is turned into a diagnostic for the caller's sink; nothing
//! below [`Generator`] surfaces an error to the caller. Generated content and
//! errors are never returned together.

mod output;


pub use output::{DecodedText, ERROR_OUTPUT, OutputMaterializer, RawBytes, decode_text};

use crate::config::Config;
use crate::diagnostic::{DiagnosticSink, TemplateError};
use crate::directive::{self, OutputDirective};
use crate::error::{GenerationError, Result};
use crate::processor::{ProcessInvoker, ProcessOutcome};
use crate::temp::{self, TempOutput};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// Identity and text of one template.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub input_path: PathBuf,
    pub input_content: String,
}

impl GenerationRequest {
    pub fn new(input_path: impl Into<PathBuf>, input_content: impl Into<String>) -> Self {
        Self {
            input_path: input_path.into(),
            input_content: input_content.into(),
        }
    }
}

/// Outcome of one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult<T> {
    /// Generated content. Warnings, if any, were reported to the sink.
    Succeeded(T),
    /// Every error that was reported to the sink, in order.
    Failed(Vec<TemplateError>),
}

impl<T> GenerationResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Succeeded(_))
    }

    pub fn content(&self) -> Option<&T> {
        match self {
            GenerationResult::Succeeded(content) => Some(content),
            GenerationResult::Failed(_) => None,
        }
    }
}

/// What the processor produced, before anything is reported.
enum Attempt<T> {
    Generated {
        content: T,
        warnings: Vec<TemplateError>,
    },
    Rejected(Vec<TemplateError>),
}

/// Runs templates through the external processor.
///
/// `M` decides how the output file is read back. The generator holds no
/// per-request state; the output extension is resolved for each request.
#[derive(Debug, Clone)]
pub struct Generator<M> {
    invoker: ProcessInvoker,
    materializer: M,
    default_extension: String,
    temp_dir: Option<PathBuf>,
}

impl<M: OutputMaterializer> Generator<M> {
    pub fn new(invoker: ProcessInvoker, materializer: M) -> Self {
        Self {
            invoker,
            materializer,
            default_extension: ".cs".to_string(),
            temp_dir: None,
        }
    }

    /// Build a generator from config.
    ///
    /// # Returns
    ///
    /// * `Ok(Generator)` - Invoker, default extension and temp dir from `config`
    /// * `Err(GenerationError::UserError)` - If the processor path or arguments are invalid
    pub fn from_config(config: &Config, materializer: M) -> Result<Self> {
        let mut generator = Self::new(ProcessInvoker::from_config(config)?, materializer)
            .default_extension(&config.default_extension);
        generator.temp_dir = config.temp_dir.clone();
        Ok(generator)
    }

    /// Extension used when a template has no `output` directive.
    pub fn default_extension(mut self, extension: &str) -> Self {
        self.default_extension = extension.to_string();
        self
    }

    /// Put temp output files in `dir` instead of the platform temp dir.
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// The extension a template's output will get.
    pub fn output_extension(&self, content: &str) -> String {
        directive::resolve_extension(content, &self.default_extension)
    }

    /// Generate one template, reporting diagnostics to `sink`.
    pub fn generate(
        &self,
        request: &GenerationRequest,
        sink: &mut dyn DiagnosticSink,
    ) -> GenerationResult<M::Output> {
        match self.guarded_attempt(request) {
            Ok(Attempt::Generated { content, warnings }) => {
                report_all(sink, &warnings);
                GenerationResult::Succeeded(content)
            }
            Ok(Attempt::Rejected(errors)) => {
                report_all(sink, &errors);
                GenerationResult::Failed(errors)
            }
            Err(e) => {
                let error = infrastructure_error(&request.input_path, &e);
                report_all(sink, std::slice::from_ref(&error));
                GenerationResult::Failed(vec![error])
            }
        }
    }

    /// Host-style entry point.
    ///
    /// Returns the content on success, `None` when the template itself failed,
    /// and the [`ERROR_OUTPUT`] sentinel when generation broke down for any
    /// other reason. Diagnostics are reported to `sink` in every case.
    pub fn generate_code(
        &self,
        request: &GenerationRequest,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<M::Output> {
        match self.guarded_attempt(request) {
            Ok(Attempt::Generated { content, warnings }) => {
                report_all(sink, &warnings);
                Some(content)
            }
            Ok(Attempt::Rejected(errors)) => {
                report_all(sink, &errors);
                None
            }
            Err(e) => {
                let error = infrastructure_error(&request.input_path, &e);
                report_all(sink, std::slice::from_ref(&error));
                Some(self.materializer.sentinel())
            }
        }
    }

    /// Run [`Self::attempt`], turning a panic below it into an error.
    fn guarded_attempt(&self, request: &GenerationRequest) -> Result<Attempt<M::Output>> {
        panic::catch_unwind(AssertUnwindSafe(|| self.attempt(request))).unwrap_or_else(|payload| {
            Err(GenerationError::Infrastructure(format!(
                "generation panicked: {}",
                panic_message(payload.as_ref())
            )))
        })
    }

    fn attempt(&self, request: &GenerationRequest) -> Result<Attempt<M::Output>> {
        let directive = directive::scan(&request.input_content);
        let extension = directive.extension_or(&self.default_extension);

        let temp = self.allocate(extension)?;
        let run = self.invoker.run(&request.input_path, temp.path())?;
        let diagnostics = run.diagnostics()?;
        let outcome = run.outcome();

        if outcome == ProcessOutcome::Clean && diagnostics.iter().all(|d| d.warning) {
            let content = self.read_output(temp, &directive)?;
            return Ok(Attempt::Generated {
                content,
                warnings: diagnostics,
            });
        }

        if diagnostics.is_empty() {
            return Ok(Attempt::Rejected(vec![TemplateError::error(format!(
                "the template processor failed on '{}' without reporting any errors (exit code {})",
                request.input_path.display(),
                run.exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "none".to_string())
            ))]));
        }

        Ok(Attempt::Rejected(diagnostics))
    }

    fn allocate(&self, extension: &str) -> Result<TempOutput> {
        match &self.temp_dir {
            Some(dir) => temp::allocate_in(dir, extension),
            None => temp::allocate(extension),
        }
    }

    fn read_output(&self, temp: TempOutput, directive: &OutputDirective) -> Result<M::Output> {
        let content = self.materializer.materialize(temp.path(), directive)?;
        temp.remove()?;
        Ok(content)
    }
}

/// Synthetic diagnostic for a failure outside the template protocol.
fn infrastructure_error(input_path: &Path, error: &GenerationError) -> TemplateError {
    TemplateError::error(format!(
        "Something went wrong processing the template '{}': {}",
        input_path.display(),
        error
    ))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Forward diagnostics to the sink with 1-based positions.
fn report_all(sink: &mut dyn DiagnosticSink, errors: &[TemplateError]) {
    for error in errors {
        sink.report(
            error.warning,
            0,
            &error.message,
            error.line.saturating_add(1),
            error.column.saturating_add(1),
        );
    }
}
