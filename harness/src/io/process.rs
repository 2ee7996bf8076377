//! Synchronous external-command execution.
//!
//! Every step talks to the outside world through [`CommandRunner`], so tests
//! can swap in a scripted runner while production uses [`SystemRunner`].

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::console::Console;
use crate::error::HarnessError;
use crate::interrupt;

/// Bytes of stdout/stderr kept in memory for captured commands.
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1_000_000;

/// One external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: Option<PathBuf>,
    /// Variables layered on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Capture stdout/stderr instead of streaming them to the terminal.
    pub capture: bool,
    /// Turn a non-zero exit into [`HarnessError::CommandFailed`].
    pub must_succeed: bool,
    pub stdin: Option<String>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            workdir: None,
            env: BTreeMap::new(),
            capture: false,
            must_succeed: true,
            stdin: None,
            timeout: None,
        }
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in vars {
            self.env.insert(key.into(), value.into());
        }
        self
    }

    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Report a non-zero exit as a result instead of an error.
    pub fn allow_failure(mut self) -> Self {
        self.must_succeed = false;
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Outcome of a finished command. Output fields are empty unless captured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code; `None` when the child was killed by a signal or timed out.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stderr: stderr.into(),
            ..Self::default()
        }
    }

    /// First line of stdout, trimmed.
    pub fn first_line(&self) -> &str {
        self.stdout.lines().next().unwrap_or_default().trim()
    }
}

/// Executes commands on behalf of harness steps.
pub trait CommandRunner {
    /// Run `spec` to completion. Blocking, no retries.
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult>;

    /// Whether `program` resolves on `PATH`. Does not execute it.
    fn is_available(&self, program: &str) -> bool;
}

/// Apply the `must_succeed` contract to a finished command.
pub fn check_result(spec: &CommandSpec, result: CommandResult) -> Result<CommandResult> {
    if spec.must_succeed && !result.success() {
        return Err(HarnessError::CommandFailed {
            program: spec.program.clone(),
            args: spec.args.clone(),
            code: result.code,
        }
        .into());
    }
    Ok(result)
}

/// Runs real OS processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    console: Console,
    output_limit_bytes: usize,
}

impl SystemRunner {
    pub fn new(console: Console) -> Self {
        Self {
            console,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }
}

impl CommandRunner for SystemRunner {
    #[instrument(skip_all, fields(program = %spec.program))]
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).envs(&spec.env);
        if let Some(dir) = &spec.workdir {
            cmd.current_dir(dir);
        }

        interrupt::check()?;
        debug!(command = %spec, capture = spec.capture, "running command");
        let result = if spec.capture {
            run_captured(cmd, spec.stdin.as_deref(), spec.timeout, self.output_limit_bytes)
        } else {
            run_inherited(cmd, spec.stdin.as_deref(), spec.timeout)
        }
        .with_context(|| format!("run {spec}"))?;
        debug!(exit_code = ?result.code, timed_out = result.timed_out, "command finished");
        interrupt::check()?;

        if spec.must_succeed && !result.success() && !spec.capture {
            self.console.error(format!("Command failed: {spec}"));
            self.console.error(format!(
                "Exit code: {}",
                result
                    .code
                    .map_or_else(|| "none".to_string(), |code| code.to_string())
            ));
        }
        check_result(spec, result)
    }

    fn is_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Stream output to the terminal; stdin is inherited unless a payload is given.
fn run_inherited(
    mut cmd: Command,
    stdin: Option<&str>,
    timeout: Option<Duration>,
) -> Result<CommandResult> {
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    }
    let mut child = spawn(&mut cmd)?;
    if let Some(input) = stdin {
        write_stdin(&mut child, input)?;
    }
    let (status, timed_out) = wait_child(&mut child, timeout)?;
    Ok(CommandResult {
        code: exit_code(status, timed_out),
        timed_out,
        ..CommandResult::default()
    })
}

/// Capture stdout/stderr without risking pipe deadlocks.
///
/// Both pipes are drained on their own threads while the child runs; bytes
/// beyond `output_limit_bytes` are discarded.
fn run_captured(
    mut cmd: Command,
    stdin: Option<&str>,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
) -> Result<CommandResult> {
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = spawn(&mut cmd)?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    if let Some(input) = stdin {
        write_stdin(&mut child, input)?;
    }

    let (status, timed_out) = wait_child(&mut child, timeout)?;
    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;
    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    Ok(CommandResult {
        code: exit_code(status, timed_out),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        timed_out,
    })
}

fn spawn(cmd: &mut Command) -> Result<Child> {
    match cmd.spawn() {
        Ok(child) => Ok(child),
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            Err(e).context("spawn command")
        }
    }
}

fn write_stdin(child: &mut Child, input: &str) -> Result<()> {
    let mut child_stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("stdin was not piped"))?;
    child_stdin
        .write_all(input.as_bytes())
        .context("write stdin")?;
    Ok(())
}

fn wait_child(child: &mut Child, timeout: Option<Duration>) -> Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        return Ok((child.wait().context("wait for command")?, false));
    };
    match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => Ok((status, false)),
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            child.kill().context("kill command")?;
            let status = child.wait().context("wait command after kill")?;
            Ok((status, true))
        }
    }
}

fn exit_code(status: ExitStatus, timed_out: bool) -> Option<i32> {
    if timed_out { None } else { status.code() }
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
