//! Implementation of the `t4gen generate` command.
//!
//! Templates are collected from the given paths, run through the processor
//! (optionally in parallel), and each successful output is written next to its
//! template as `<stem><extension>`.

use super::read_template;
use crate::cli::GenerateArgs;
use globset::GlobSet;
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use t4gen::config::{Config, OutputMode};
use t4gen::diagnostic::{CollectingSink, DiagnosticSink, ReportedDiagnostic};
use t4gen::error::{GenerationError, Result};
use t4gen::events::{Event, EventAction, append_event};
use t4gen::exit_codes;
use t4gen::generator::{
    DecodedText, GenerationRequest, GenerationResult, Generator, OutputMaterializer, RawBytes,
};

/// Outcome of generating one template.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub template: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub succeeded: bool,
    pub diagnostics: Vec<ReportedDiagnostic>,
    pub duration_ms: u128,
}

pub fn cmd_generate(mut config: Config, args: GenerateArgs) -> Result<i32> {
    if let Some(processor) = args.processor {
        config.processor = Some(processor);
    }
    if let Some(timeout) = args.timeout {
        config.timeout_seconds = timeout;
    }
    if let Some(mode) = &args.mode {
        config.output_mode = OutputMode::from_str(mode).ok_or_else(|| {
            GenerationError::UserError(format!(
                "invalid --mode '{}'\nFix: use 'bytes' or 'text'.",
                mode
            ))
        })?;
    }
    config.validate()?;

    let templates = collect_templates(&args.paths, &config.include_globset()?)?;
    if templates.is_empty() {
        return Err(GenerationError::UserError(
            "no templates found\nFix: pass template files or adjust `include` in t4gen.yaml."
                .to_string(),
        ));
    }

    let jobs = args.jobs.max(1);
    let reports = match config.output_mode {
        OutputMode::Bytes => {
            run_batch(&Generator::from_config(&config, RawBytes)?, &templates, jobs)
        }
        OutputMode::Text => {
            run_batch(&Generator::from_config(&config, DecodedText)?, &templates, jobs)
        }
    };

    if let Some(log) = &config.event_log {
        for report in &reports {
            append_event(log, &report_event(report))?;
        }
    }

    if args.json {
        let json = serde_json::to_string_pretty(&reports).map_err(|e| {
            GenerationError::UserError(format!("failed to serialize report to JSON: {}", e))
        })?;
        println!("{}", json);
    } else {
        print_reports(&reports);
    }

    if reports.iter().all(|r| r.succeeded) {
        Ok(exit_codes::SUCCESS)
    } else {
        Ok(exit_codes::TEMPLATE_FAILURE)
    }
}

/// Expand files and directories into a sorted, de-duplicated template list.
///
/// Files are taken as given. Directories are walked recursively and entries
/// are matched against `include` by their path relative to that directory.
pub fn collect_templates(paths: &[PathBuf], include: &GlobSet) -> Result<Vec<PathBuf>> {
    let mut templates = Vec::new();

    for path in paths {
        if path.is_file() {
            templates.push(path.clone());
        } else if path.is_dir() {
            walk_dir(path, path, include, &mut templates)?;
        } else {
            return Err(GenerationError::UserError(format!(
                "template path '{}' does not exist",
                path.display()
            )));
        }
    }

    templates.sort();
    templates.dedup();
    Ok(templates)
}

fn walk_dir(root: &Path, dir: &Path, include: &GlobSet, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| {
        GenerationError::UserError(format!(
            "failed to read directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_dir(root, &path, include, out)?;
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(&path);
        let relative = relative.to_string_lossy().replace('\\', "/");
        if include.is_match(&relative) {
            out.push(path);
        }
    }

    Ok(())
}

/// Where the output for `template` goes: same directory, same stem.
pub fn output_path_for(template: &Path, extension: &str) -> PathBuf {
    let stem = template
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    template.with_file_name(format!("{}{}", stem, extension))
}

fn run_batch<M>(generator: &Generator<M>, templates: &[PathBuf], jobs: usize) -> Vec<FileReport>
where
    M: OutputMaterializer + Sync,
    M::Output: AsRef<[u8]>,
{
    if jobs == 1 || templates.len() == 1 {
        return templates
            .iter()
            .map(|t| generate_one(generator, t))
            .collect();
    }

    let mut indexed: Vec<(usize, FileReport)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..jobs)
            .map(|worker| {
                scope.spawn(move || {
                    templates
                        .iter()
                        .enumerate()
                        .skip(worker)
                        .step_by(jobs)
                        .map(|(i, t)| (i, generate_one(generator, t)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .flat_map(|(worker, h)| worker_reports(h.join(), worker, jobs, templates))
            .collect()
    });

    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, report)| report).collect()
}

/// Reports from one batch worker.
///
/// A worker that panicked produces a failed report for every template it owned.
fn worker_reports(
    joined: std::thread::Result<Vec<(usize, FileReport)>>,
    worker: usize,
    jobs: usize,
    templates: &[PathBuf],
) -> Vec<(usize, FileReport)> {
    match joined {
        Ok(reports) => reports,
        Err(_) => templates
            .iter()
            .enumerate()
            .skip(worker)
            .step_by(jobs)
            .map(|(i, template)| (i, abandoned_report(template)))
            .collect(),
    }
}

fn abandoned_report(template: &Path) -> FileReport {
    FileReport {
        template: template.to_path_buf(),
        output: None,
        extension: None,
        succeeded: false,
        diagnostics: vec![ReportedDiagnostic {
            warning: false,
            code: 0,
            message: format!(
                "generation of '{}' was abandoned: its worker thread panicked",
                template.display()
            ),
            line: 1,
            column: 1,
        }],
        duration_ms: 0,
    }
}

/// Generate one template and write its output.
pub fn generate_one<M>(generator: &Generator<M>, template: &Path) -> FileReport
where
    M: OutputMaterializer,
    M::Output: AsRef<[u8]>,
{
    let start = Instant::now();
    let mut sink = CollectingSink::new();

    let (output, extension) = match read_template(template) {
        Ok(content) => {
            let extension = generator.output_extension(&content);
            let request = GenerationRequest::new(template, content);
            let output = match generator.generate(&request, &mut sink) {
                GenerationResult::Succeeded(generated) => {
                    write_output(template, &extension, generated.as_ref(), &mut sink)
                }
                GenerationResult::Failed(_) => None,
            };
            (output, Some(extension))
        }
        Err(e) => {
            sink.report(false, 0, &e.to_string(), 1, 1);
            (None, None)
        }
    };

    FileReport {
        template: template.to_path_buf(),
        succeeded: output.is_some(),
        output,
        extension,
        diagnostics: sink.diagnostics,
        duration_ms: start.elapsed().as_millis(),
    }
}

fn write_output(
    template: &Path,
    extension: &str,
    content: &[u8],
    sink: &mut dyn DiagnosticSink,
) -> Option<PathBuf> {
    let output = output_path_for(template, extension);

    if output == template {
        sink.report(
            false,
            0,
            &format!(
                "output extension '{}' would overwrite the template '{}'",
                extension,
                template.display()
            ),
            1,
            1,
        );
        return None;
    }

    match fs::write(&output, content) {
        Ok(()) => Some(output),
        Err(e) => {
            sink.report(
                false,
                0,
                &GenerationError::io("failed to write generated output", &output, e).to_string(),
                1,
                1,
            );
            None
        }
    }
}

fn report_event(report: &FileReport) -> Event {
    let action = if report.succeeded {
        EventAction::GenerateSucceeded
    } else {
        EventAction::GenerateFailed
    };

    let errors = report.diagnostics.iter().filter(|d| !d.warning).count();
    let warnings = report.diagnostics.len() - errors;

    Event::new(action)
        .with_template(report.template.to_string_lossy())
        .with_details(json!({
            "output": report.output.as_ref().map(|p| p.to_string_lossy().into_owned()),
            "extension": report.extension,
            "errors": errors,
            "warnings": warnings,
            "duration_ms": report.duration_ms,
        }))
}

fn print_reports(reports: &[FileReport]) {
    for report in reports {
        for d in &report.diagnostics {
            eprintln!(
                "{}({},{}): {}: {}",
                report.template.display(),
                d.line,
                d.column,
                if d.warning { "warning" } else { "error" },
                d.message
            );
        }
        if let Some(output) = &report.output {
            println!("generated {}", output.display());
        }
    }

    let failed = reports.iter().filter(|r| !r.succeeded).count();
    if failed > 0 {
        eprintln!("{} of {} template(s) failed", failed, reports.len());
    }
}
