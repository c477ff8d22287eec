//! Template processor subprocess invocation.
//!
//! Runs the processor with a hard deadline, drains its error stream while
//! waiting, and classifies the exit code.

use super::decoder::decode_all;
use crate::config::Config;
use crate::diagnostic::TemplateError;
use crate::error::{GenerationError, Result};
use crate::escape::escape_arguments;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Default deadline for one processor run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How a finished processor run should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Exit code 0: output written, error stream may hold warnings.
    Clean,
    /// Exit code 1: the error stream holds the template's errors.
    TemplateFailure,
    /// Any other exit code, or no exit code at all.
    InfrastructureFailure,
}

impl ProcessOutcome {
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => ProcessOutcome::Clean,
            Some(1) => ProcessOutcome::TemplateFailure,
            _ => ProcessOutcome::InfrastructureFailure,
        }
    }
}

/// Result of a processor run that exited before the deadline.
#[derive(Debug, Clone)]
pub struct ProcessRun {
    /// Exit code (None if terminated by a signal).
    pub exit_code: Option<i32>,
    /// Everything the processor wrote to standard error.
    pub stderr: Vec<u8>,
    /// Wall-clock time from spawn to exit.
    pub duration: Duration,
}

impl ProcessRun {
    pub fn outcome(&self) -> ProcessOutcome {
        ProcessOutcome::from_exit_code(self.exit_code)
    }

    /// Interpret the error stream according to the outcome.
    ///
    /// Clean and template-failure runs carry framed records; anything else is
    /// free text and becomes one error.
    pub fn diagnostics(&self) -> Result<Vec<TemplateError>> {
        match self.outcome() {
            ProcessOutcome::Clean | ProcessOutcome::TemplateFailure => {
                decode_all(Cursor::new(&self.stderr))
            }
            ProcessOutcome::InfrastructureFailure => {
                let text = String::from_utf8_lossy(&self.stderr);
                let status = match self.exit_code {
                    Some(code) => format!("exit code {}", code),
                    None => "terminated by signal".to_string(),
                };
                Ok(vec![TemplateError::error(
                    GenerationError::Infrastructure(format!("{} ({})", text.trim_end(), status))
                        .to_string(),
                )])
            }
        }
    }
}

/// Launches the external template processor.
///
/// Holds no per-run state, so one invoker can serve concurrent generations.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    program: PathBuf,
    timeout: Duration,
    extra_args: Vec<String>,
}

impl ProcessInvoker {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
            extra_args: Vec::new(),
        }
    }

    /// Build an invoker from the processor settings in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.processor_path()?)
            .timeout(config.timeout())
            .extra_args(config.extra_args()?))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments inserted between the include directory and the input path.
    pub fn extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The escaped command line for one run (without the program).
    ///
    /// `<program> -o <output> -I <input dir> [extra args] <input>`
    pub fn command_line(&self, input: &Path, output: &Path) -> Result<String> {
        let input = std::path::absolute(input)
            .map_err(|e| GenerationError::io("failed to resolve template path", input, e))?;
        let include_dir = input.parent().unwrap_or(Path::new(""));

        let mut args = vec![
            "-o".to_string(),
            output.to_string_lossy().into_owned(),
            "-I".to_string(),
            include_dir.to_string_lossy().into_owned(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(input.to_string_lossy().into_owned());

        Ok(escape_arguments(&args))
    }

    /// Run the processor for one template.
    ///
    /// # Returns
    ///
    /// * `Ok(ProcessRun)` - The process exited (with any code) before the deadline
    /// * `Err(GenerationError::ProcessLaunch)` - The executable could not be started
    /// * `Err(GenerationError::Timeout)` - The deadline passed; the process was killed
    pub fn run(&self, input: &Path, output: &Path) -> Result<ProcessRun> {
        let line = self.command_line(input, output)?;

        let mut command = Command::new(&self.program);
        apply_command_line(&mut command, &line)?;
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let start = Instant::now();
        let mut child = command.spawn().map_err(|e| GenerationError::ProcessLaunch {
            path: self.program.clone(),
            source: e,
        })?;

        // Drain stderr concurrently so a chatty processor never blocks on a
        // full pipe while we wait for it.
        let stderr_reader = match child.stderr.take() {
            Some(mut stderr) => {
                let (tx, rx) = mpsc::channel();
                thread::spawn(move || {
                    let mut buf = Vec::new();
                    let _ = tx.send(stderr.read_to_end(&mut buf).map(|_| buf));
                });
                rx
            }
            None => {
                kill_process(&mut child);
                return Err(GenerationError::Infrastructure(
                    "processor error stream was not captured".to_string(),
                ));
            }
        };

        let exit_code = match wait_with_timeout(&mut child, self.timeout)? {
            Some(code) => code,
            None => {
                // The reader is left to finish on its own: a grandchild may
                // still hold the pipe open.
                drop(stderr_reader);
                return Err(GenerationError::Timeout {
                    timeout: self.timeout,
                });
            }
        };

        // The pipe stays open while any grandchild holds it, so the drain is
        // bounded by what is left of the deadline.
        let remaining = self.timeout.saturating_sub(start.elapsed());
        let stderr = collect_stderr(&stderr_reader, remaining, self.timeout)?;

        Ok(ProcessRun {
            exit_code,
            stderr,
            duration: start.elapsed(),
        })
    }
}

#[cfg(windows)]
fn apply_command_line(command: &mut Command, line: &str) -> Result<()> {
    use std::os::windows::process::CommandExt;

    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.raw_arg(line).creation_flags(CREATE_NO_WINDOW);
    Ok(())
}

#[cfg(not(windows))]
fn apply_command_line(command: &mut Command, line: &str) -> Result<()> {
    command.args(crate::escape::split_arguments(line)?);
    Ok(())
}

/// Wait for a child process with timeout.
///
/// Returns `Some(exit_code)` if the process exited, `None` if it was killed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Option<Option<i32>>> {
    let start = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status.code())),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    kill_process(child);
                    return Ok(None);
                }
                thread::sleep(POLL_INTERVAL.min(timeout.saturating_sub(start.elapsed())));
            }
            Err(e) => {
                kill_process(child);
                return Err(GenerationError::Infrastructure(format!(
                    "failed to check processor status: {}",
                    e
                )));
            }
        }
    }
}

/// Kill a process and wait for it to terminate.
fn kill_process(child: &mut Child) {
    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
    let _ = child.kill();
    let _ = child.wait();
}

fn collect_stderr(
    reader: &Receiver<std::io::Result<Vec<u8>>>,
    remaining: Duration,
    timeout: Duration,
) -> Result<Vec<u8>> {
    match reader.recv_timeout(remaining) {
        Ok(Ok(buf)) => Ok(buf),
        Ok(Err(e)) => Err(GenerationError::Infrastructure(format!(
            "failed to read processor error stream: {}",
            e
        ))),
        Err(RecvTimeoutError::Timeout) => Err(GenerationError::Timeout { timeout }),
        Err(RecvTimeoutError::Disconnected) => Err(GenerationError::Infrastructure(
            "processor error stream reader stopped without a result".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::split_arguments;
    use crate::test_support::frame;
    use tempfile::TempDir;

    #[cfg(unix)]
    use crate::test_support::write_processor;
    #[cfg(unix)]
    use serial_test::serial;

    #[test]
    fn test_outcome_from_exit_code() {
        assert_eq!(ProcessOutcome::from_exit_code(Some(0)), ProcessOutcome::Clean);
        assert_eq!(
            ProcessOutcome::from_exit_code(Some(1)),
            ProcessOutcome::TemplateFailure
        );
        assert_eq!(
            ProcessOutcome::from_exit_code(Some(2)),
            ProcessOutcome::InfrastructureFailure
        );
        assert_eq!(
            ProcessOutcome::from_exit_code(Some(-1)),
            ProcessOutcome::InfrastructureFailure
        );
        assert_eq!(
            ProcessOutcome::from_exit_code(None),
            ProcessOutcome::InfrastructureFailure
        );
    }

    #[test]
    fn test_command_line_layout() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("Model.tt");
        let output = temp_dir.path().join("tmpabc.cs");

        let invoker = ProcessInvoker::new("/opt/t4/t4").extra_args(vec!["--debug".to_string()]);
        let line = invoker.command_line(&input, &output).unwrap();
        let args = split_arguments(&line).unwrap();

        assert_eq!(
            args,
            vec![
                "-o".to_string(),
                output.to_string_lossy().into_owned(),
                "-I".to_string(),
                temp_dir.path().to_string_lossy().into_owned(),
                "--debug".to_string(),
                input.to_string_lossy().into_owned(),
            ]
        );
    }

    #[test]
    fn test_command_line_makes_input_absolute() {
        let invoker = ProcessInvoker::new("t4");
        let line = invoker
            .command_line(Path::new("templates/Model.tt"), Path::new("/tmp/out.cs"))
            .unwrap();
        let args = split_arguments(&line).unwrap();

        assert!(Path::new(&args[3]).is_absolute());
        assert!(Path::new(&args[3]).ends_with("templates"));
        assert!(Path::new(&args[4]).is_absolute());
    }

    #[test]
    fn test_infrastructure_failure_is_one_plain_error() {
        let run = ProcessRun {
            exit_code: Some(134),
            stderr: b"Unhandled exception.\n0\n1\n".to_vec(),
            duration: Duration::from_millis(5),
        };

        let errors = run.diagnostics().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].warning);
        assert!(errors[0].message.contains("Unhandled exception."));
        assert!(errors[0].message.contains("exit code 134"));
    }

    #[test]
    fn test_template_failure_is_decoded() {
        let run = ProcessRun {
            exit_code: Some(1),
            stderr: frame(false, 3, 5, "bad token").into_bytes(),
            duration: Duration::from_millis(5),
        };

        let errors = run.diagnostics().unwrap();
        assert_eq!(errors, vec![TemplateError::new(false, "bad token", 3, 5)]);
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_run_clean_exit_captures_stderr() {
        let temp_dir = TempDir::new().unwrap();
        let processor = write_processor(
            temp_dir.path(),
            r#"printf 'ok' > "$2"
printf '1\n2\n3\n4\nnote\n' >&2
exit 0"#,
        );
        let output = temp_dir.path().join("out.cs");

        let run = ProcessInvoker::new(&processor)
            .run(&temp_dir.path().join("in.tt"), &output)
            .unwrap();

        assert_eq!(run.exit_code, Some(0));
        assert_eq!(run.outcome(), ProcessOutcome::Clean);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "ok");
        assert_eq!(
            run.diagnostics().unwrap(),
            vec![TemplateError::new(true, "note", 2, 3)]
        );
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_run_receives_escaped_arguments_intact() {
        let temp_dir = TempDir::new().unwrap();
        let processor = write_processor(
            temp_dir.path(),
            r#"printf '%s\n' "$@" > "$2"
exit 0"#,
        );
        let template_dir = temp_dir.path().join(r#"dir with "quotes" and \slashes"#);
        std::fs::create_dir_all(&template_dir).unwrap();
        let input = template_dir.join("in.tt");
        let output = temp_dir.path().join("args.txt");

        ProcessInvoker::new(&processor).run(&input, &output).unwrap();

        let args = std::fs::read_to_string(&output).unwrap();
        let args: Vec<&str> = args.lines().collect();
        assert_eq!(args[0], "-o");
        assert_eq!(args[2], "-I");
        assert_eq!(args[3], template_dir.to_string_lossy());
        assert_eq!(args[4], input.to_string_lossy());
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_run_large_stderr_does_not_deadlock() {
        let temp_dir = TempDir::new().unwrap();
        // Well past any pipe buffer.
        let processor = write_processor(
            temp_dir.path(),
            r#"i=0
while [ $i -lt 4000 ]; do
  printf '0\n1\n1\n40\n0123456789012345678901234567890123456789\n' >&2
  i=$((i+1))
done
exit 1"#,
        );

        let run = ProcessInvoker::new(&processor)
            .timeout(Duration::from_secs(30))
            .run(&temp_dir.path().join("in.tt"), &temp_dir.path().join("out"))
            .unwrap();

        assert_eq!(run.outcome(), ProcessOutcome::TemplateFailure);
        assert_eq!(run.diagnostics().unwrap().len(), 4000);
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_run_timeout_kills_process() {
        let temp_dir = TempDir::new().unwrap();
        let processor = write_processor(temp_dir.path(), "exec sleep 30");

        let start = Instant::now();
        let err = ProcessInvoker::new(&processor)
            .timeout(Duration::from_secs(1))
            .run(&temp_dir.path().join("in.tt"), &temp_dir.path().join("out"))
            .unwrap_err();

        assert!(matches!(err, GenerationError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_run_deadline_covers_inherited_error_stream() {
        let temp_dir = TempDir::new().unwrap();
        // The background sleep keeps stderr open after the script exits.
        let processor = write_processor(temp_dir.path(), "sleep 8 &\nexit 0");

        let start = Instant::now();
        let err = ProcessInvoker::new(&processor)
            .timeout(Duration::from_secs(1))
            .run(&temp_dir.path().join("in.tt"), &temp_dir.path().join("out"))
            .unwrap_err();

        assert!(matches!(err, GenerationError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_run_missing_executable_is_launch_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = ProcessInvoker::new(temp_dir.path().join("no-such-processor"))
            .run(&temp_dir.path().join("in.tt"), &temp_dir.path().join("out"))
            .unwrap_err();

        assert!(matches!(err, GenerationError::ProcessLaunch { .. }));
        assert!(err.to_string().contains("failed to start template processor"));
    }
}
