//! External command execution
//!
//! Every collaborator the pipeline shells out to (rustup, apt-get, cargo,
//! strip, git) goes through the [`CommandRunner`] trait so runs can be
//! scripted in tests.

use crate::error::{NightshiftError, NightshiftResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Max number of output lines to include in step error messages.
const ERROR_TAIL_LINES: usize = 50;

/// A command to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory (inherits when unset)
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    /// Create a command with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    /// Build from an argv vector; `None` when it is empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).args(args.iter().cloned()))
    }

    /// Append a single argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Result of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code (-1 when terminated by a signal)
    pub code: i32,
    /// Combined stdout and stderr lines in arrival order
    pub lines: Vec<String>,
}

impl CommandOutput {
    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Full output joined by newlines
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Last lines of output for error diagnostics
    pub fn tail(&self) -> String {
        error_tail(&self.lines)
    }
}

/// Return the last `ERROR_TAIL_LINES` lines so error messages are
/// actionable without being overwhelming.
pub(crate) fn error_tail(lines: &[String]) -> String {
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Abstract command execution
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion, streaming each output line to `on_output`.
    ///
    /// A non-zero exit is reported through [`CommandOutput::code`]; only
    /// failure to spawn is an error.
    async fn run(
        &self,
        spec: &CommandSpec,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> NightshiftResult<CommandOutput>;
}

/// Runs commands on the host with `tokio::process`
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a new host runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        on_output: &(dyn Fn(String) + Send + Sync),
    ) -> NightshiftResult<CommandOutput> {
        debug!("Executing: {}", spec);

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = spec.cwd {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| NightshiftError::command_failed(spec.to_string(), e))?;

        let lines = stream_child_output(&mut child, on_output).await?;

        let status = child
            .wait()
            .await
            .map_err(|e| NightshiftError::command_failed(spec.to_string(), e))?;

        Ok(CommandOutput {
            code: status.code().unwrap_or(-1),
            lines,
        })
    }
}

/// Stream stdout+stderr from a child process, calling `on_output` for each line.
///
/// Lines are decoded lossily: a pipe is read until EOF even when a tool
/// prints bytes that are not UTF-8, otherwise the child blocks on a full
/// pipe and never exits. Returns all collected output lines for error
/// reporting.
async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_output: &(dyn Fn(String) + Send + Sync),
) -> NightshiftResult<Vec<String>> {
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| NightshiftError::Internal("stderr not piped".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| NightshiftError::Internal("stdout not piped".to_string()))?;

    let mut stderr_reader = BufReader::new(stderr);
    let mut stdout_reader = BufReader::new(stdout);
    // read_until keeps partial reads in these buffers across select! polls
    let mut stderr_buf = Vec::new();
    let mut stdout_buf = Vec::new();

    let mut all_output = Vec::new();
    let mut stderr_done = false;
    let mut stdout_done = false;

    while !stderr_done || !stdout_done {
        tokio::select! {
            read = stderr_reader.read_until(b'\n', &mut stderr_buf), if !stderr_done => {
                stderr_done = !emit_line(read, &mut stderr_buf, on_output, &mut all_output);
            }
            read = stdout_reader.read_until(b'\n', &mut stdout_buf), if !stdout_done => {
                stdout_done = !emit_line(read, &mut stdout_buf, on_output, &mut all_output);
            }
        }
    }

    Ok(all_output)
}

/// Hand one buffered line to the sink. Returns false once the pipe is closed.
fn emit_line(
    read: std::io::Result<usize>,
    buf: &mut Vec<u8>,
    on_output: &(dyn Fn(String) + Send + Sync),
    all_output: &mut Vec<String>,
) -> bool {
    match read {
        Ok(0) => false,
        Ok(_) => {
            let line = decode_line(buf);
            buf.clear();
            on_output(line.clone());
            all_output.push(line);
            true
        }
        Err(e) => {
            debug!("Stopped reading child output: {}", e);
            false
        }
    }
}

/// Decode a raw line without its terminator, replacing invalid UTF-8
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Output sink that discards everything
pub fn discard(_line: String) {}

/// Run blocking work (archives, HTTP) off the async runtime
pub(crate) async fn run_blocking<T, F>(what: &str, f: F) -> NightshiftResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> NightshiftResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| NightshiftError::Internal(format!("{} task failed: {}", what, e)))?
}

/// Scripted runner for tests: records commands and answers by prefix
#[cfg(test)]
pub(crate) mod scripted {
    use super::*;
    use std::sync::Mutex;

    pub(crate) struct ScriptedRunner {
        rules: Mutex<Vec<(String, CommandOutput)>>,
        unspawnable: Mutex<Vec<String>>,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl ScriptedRunner {
        /// Every command succeeds; `rustc --version` reports 1.82.0
        pub(crate) fn new() -> Self {
            let runner = Self {
                rules: Mutex::new(vec![]),
                unspawnable: Mutex::new(vec![]),
                calls: Mutex::new(vec![]),
            };
            runner.respond(
                "rustc --version",
                0,
                &["rustc 1.82.0 (f6e511eec 2024-10-15)"],
            )
        }

        /// Answer commands starting with `prefix`; later rules win
        pub(crate) fn respond(self, prefix: &str, code: i32, lines: &[&str]) -> Self {
            let output = CommandOutput {
                code,
                lines: lines.iter().map(|l| l.to_string()).collect(),
            };
            self.rules.lock().unwrap().push((prefix.to_string(), output));
            self
        }

        /// Fail to spawn `program`
        pub(crate) fn missing(self, program: &str) -> Self {
            self.unspawnable.lock().unwrap().push(program.to_string());
            self
        }

        /// Rendered command lines in call order
        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(ToString::to_string)
                .collect()
        }

        pub(crate) fn specs(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(
            &self,
            spec: &CommandSpec,
            on_output: &(dyn Fn(String) + Send + Sync),
        ) -> NightshiftResult<CommandOutput> {
            self.calls.lock().unwrap().push(spec.clone());

            if self.unspawnable.lock().unwrap().contains(&spec.program) {
                return Err(NightshiftError::command_failed(
                    spec.to_string(),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                ));
            }

            let rendered = spec.to_string();
            let output = self
                .rules
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|(prefix, _)| rendered.starts_with(prefix.as_str()))
                .map(|(_, output)| output.clone())
                .unwrap_or_default();

            for line in &output.lines {
                on_output(line.clone());
            }
            Ok(output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_display_quotes_spaces() {
        let spec = CommandSpec::new("git")
            .args(["tag", "-fa", "nightly", "-m"])
            .arg("Nightly build");
        assert_eq!(spec.to_string(), "git tag -fa nightly -m \"Nightly build\"");
    }

    #[test]
    fn spec_from_argv() {
        let argv = vec!["cargo".to_string(), "build".to_string(), "--release".to_string()];
        let spec = CommandSpec::from_argv(&argv).unwrap();
        assert_eq!(spec.program, "cargo");
        assert_eq!(spec.args, vec!["build", "--release"]);
        assert!(CommandSpec::from_argv(&[]).is_none());
    }

    #[test]
    fn tail_keeps_last_lines() {
        let lines: Vec<String> = (0..120).map(|i| format!("line {}", i)).collect();
        let tail = error_tail(&lines);
        assert_eq!(tail.lines().count(), ERROR_TAIL_LINES);
        assert!(tail.starts_with("line 70"));
        assert!(tail.ends_with("line 119"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn system_runner_captures_output_and_code() {
        let spec = CommandSpec::new("sh").args(["-c", "echo out; echo err 1>&2; exit 3"]);
        let output = SystemRunner::new().run(&spec, &discard).await.unwrap();

        assert_eq!(output.code, 3);
        assert!(!output.success());
        assert!(output.lines.contains(&"out".to_string()));
        assert!(output.lines.contains(&"err".to_string()));
    }

    #[test]
    fn decode_line_replaces_invalid_utf8() {
        assert_eq!(decode_line(b"ok\r\n"), "ok");
        assert_eq!(decode_line(b"bad \xff\n"), "bad \u{FFFD}");
        assert_eq!(decode_line(b"no newline"), "no newline");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn invalid_utf8_does_not_stall_the_other_pipe() {
        // More than a pipe buffer of output after the bad byte
        let script = "printf 'bad \\377\\n'; head -c 300000 /dev/zero | tr '\\0' a; echo; echo done >&2";
        let spec = CommandSpec::new("sh").args(["-c", script]);

        let output = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            SystemRunner::new().run(&spec, &discard),
        )
        .await
        .expect("runner stalled on non-UTF-8 output")
        .unwrap();

        assert!(output.success());
        assert_eq!(output.lines[0], "bad \u{FFFD}");
        assert!(output.lines.iter().any(|l| l.len() == 300_000));
        assert!(output.lines.contains(&"done".to_string()));
    }

    #[tokio::test]
    async fn system_runner_reports_spawn_failure() {
        let spec = CommandSpec::new("nightshift-definitely-not-a-binary");
        let err = SystemRunner::new().run(&spec, &discard).await.unwrap_err();
        assert!(matches!(err, NightshiftError::CommandFailed { .. }));
    }
}
