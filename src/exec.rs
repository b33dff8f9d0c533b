//! Buffered subprocess execution.
//!
//! Two stages, kept separate:
//!
//! 1. [`lines`] turns a captured byte stream into text lines (restartable,
//!    each line keeps its trailing `\n`).
//! 2. [`strip_debug`] drops every line starting with [`DEBUG_MARKER`].
//!
//! [`capture`] composes both for stdout and stderr, so nothing downstream
//! (comparison, recording, printing) ever sees a debug line.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, trace};

use crate::error::{CaseError, CaseResult};

/// Lines starting with this prefix are diagnostics of the tested binary.
pub const DEBUG_MARKER: &str = "!DBG";

/// Shell used for every command.
pub const SHELL: &str = "/bin/sh";

/// Exit code reported when a child was terminated without one.
pub const NO_EXIT_CODE: i32 = -1;

/// Unprocessed result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Executes shell command lines.
pub trait Shell {
    /// Run `command` to completion, feeding `stdin` if given.
    fn execute(&self, command: &str, stdin: Option<&str>) -> CaseResult<RawOutput>;
}

/// Runs commands through `/bin/sh -c` inside a fixed working directory.
#[derive(Debug, Clone)]
pub struct SystemShell {
    workdir: PathBuf,
}

impl SystemShell {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        SystemShell {
            workdir: workdir.into(),
        }
    }
}

impl Shell for SystemShell {
    fn execute(&self, command: &str, stdin: Option<&str>) -> CaseResult<RawOutput> {
        debug!(command, workdir = %self.workdir.display(), "Executing");

        let spawn_error = |source| CaseError::Spawn {
            command: command.to_string(),
            source,
        };

        let mut child = Command::new(SHELL)
            .arg("-c")
            .arg(command)
            .current_dir(&self.workdir)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // Feed stdin from a separate thread so a child filling its stdout
        // pipe cannot deadlock against us.
        let output = std::thread::scope(|scope| {
            if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
                scope.spawn(move || {
                    // EPIPE from a child that stops reading is ignored.
                    let _ = pipe.write_all(input.as_bytes());
                });
            }
            child.wait_with_output()
        })
        .map_err(spawn_error)?;

        let code = output.status.code().unwrap_or(NO_EXIT_CODE);
        trace!(command, code, "Finished");

        Ok(RawOutput {
            code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Split raw bytes into text lines, each terminated by `\n`.
///
/// Decoding is lossy; `\r\n` endings are normalized.
pub fn lines(bytes: &[u8]) -> impl Iterator<Item = String> + Clone + '_ {
    bytes
        .split_inclusive(|&b| b == b'\n')
        .map(|raw| {
            let text = String::from_utf8_lossy(raw);
            let body = text.trim_end_matches('\n').trim_end_matches('\r');
            format!("{}\n", body)
        })
}

/// Whether a line is a debug line of the tested binary.
pub fn is_debug_line(line: &str) -> bool {
    line.starts_with(DEBUG_MARKER)
}

/// Remove debug lines from a line sequence.
pub fn strip_debug<I>(lines: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = String>,
{
    lines.into_iter().filter(|line| !is_debug_line(line))
}

/// Exit code plus both filtered line streams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// stdout followed by stderr, as one block of text.
    pub fn combined(&self) -> String {
        self.stdout.iter().chain(&self.stderr).map(String::as_str).collect()
    }
}

/// Split and filter both streams of a raw result.
pub fn capture(raw: &RawOutput) -> ExecResult {
    ExecResult {
        code: raw.code,
        stdout: strip_debug(lines(&raw.stdout)).collect(),
        stderr: strip_debug(lines(&raw.stderr)).collect(),
    }
}

/// Run `command` on `shell` and capture both filtered streams.
pub fn exec_buffered(shell: &dyn Shell, command: &str) -> CaseResult<ExecResult> {
    let raw = shell.execute(command, None)?;
    Ok(capture(&raw))
}
