//! Test case state machine.
//!
//! A [`TestCase`] owns one source file and walks it through
//! `compile -> run -> test | store | print`. Every phase:
//!
//! - runs its side effect at most once (later calls are no-ops),
//! - first drives the phases it depends on,
//! - leaves the status untouched unless it moves strictly forward,
//! - marks the case `Failed` on any error and short-circuits what follows.
//!
//! Output shown to the user (compiler diagnostics, diffs, printed results)
//! is collected in a transcript so the batch can print it after the verdict.

mod outcome;
mod paths;
mod status;

pub use outcome::{FailReason, Outcome};
pub use paths::{CasePaths, Stream, BINARY_SUFFIX, EXPECT_STDERR_SUFFIX, EXPECT_SUFFIX};
pub use status::{Lifecycle, Status};

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::diff::unified_diff;
use crate::engine::Engine;
use crate::error::{CaseError, CaseResult};
use crate::exec::{exec_buffered, ExecResult};
use crate::filter::apply_filters;
use crate::properties::{Properties, Property, PropertySet};
use crate::template::{Template, Vars};
use crate::toolchain::Toolchain;

/// Placeholders whose values depend on the detected toolchain.
const TOOLCHAIN_PLACEHOLDERS: [&str; 3] = ["cc", "ccflags", "ldflags"];

/// What to do with a case once it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Compare against the recorded expectation.
    #[default]
    Verify,
    /// Write a new expectation.
    Record,
    /// Print the captured output without comparing.
    Print,
}

/// One source file and everything derived from it.
#[derive(Debug, Clone)]
pub struct TestCase {
    paths: CasePaths,
    properties: Properties,
    lifecycle: Lifecycle,
    captured: Option<ExecResult>,
    failure: Option<FailReason>,
    commands: Vec<String>,
    transcript: Vec<String>,
}

impl TestCase {
    /// Read the source header and the driver header.
    ///
    /// Either file being unreadable fails construction; there is no case
    /// to drive afterwards.
    pub fn open(source: &Path, engine: &Engine) -> CaseResult<Self> {
        let config = engine.config();
        let local = PropertySet::read(&config.resolve(source))?;

        let driver = PathBuf::from(
            local
                .get(Property::Driver.key())
                .unwrap_or(config.runner.default_driver.as_str()),
        );
        let driver_props = PropertySet::read(&config.resolve(&driver))?;

        Ok(Self::from_parts(
            CasePaths::new(source, &driver),
            Properties::new(&local, &driver_props),
        ))
    }

    /// Build a case from already parsed headers.
    pub fn from_parts(paths: CasePaths, properties: Properties) -> Self {
        TestCase {
            paths,
            properties,
            lifecycle: Lifecycle::new(),
            captured: None,
            failure: None,
            commands: Vec::new(),
            transcript: Vec::new(),
        }
    }

    pub fn name(&self) -> String {
        self.paths.source.display().to_string()
    }

    pub fn paths(&self) -> &CasePaths {
        &self.paths
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn status(&self) -> Status {
        self.lifecycle.status()
    }

    /// Captured streams, available once the case is `Executed`.
    pub fn captured(&self) -> Option<&ExecResult> {
        self.captured.as_ref()
    }

    pub fn failure(&self) -> Option<&FailReason> {
        self.failure.as_ref()
    }

    /// Commands executed so far, in order.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Diagnostics and printed output, in order.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    // ============================================================
    // Phases
    // ============================================================

    /// Build the test binary. Acts only while `Waiting`.
    pub fn compile(&mut self, engine: &Engine) -> CaseResult<()> {
        let result = self.compile_step(engine);
        self.settle(result)
    }

    /// Compile if needed, then execute the binary. Acts only once compiled.
    pub fn run(&mut self, engine: &Engine) -> CaseResult<()> {
        let result = self.run_step(engine);
        self.settle(result)
    }

    /// Run, then compare against the expectation files.
    pub fn test(&mut self, engine: &Engine) -> CaseResult<()> {
        let result = self.test_step(engine);
        self.settle(result)
    }

    /// Run, then record stdout as the new expectation.
    pub fn store(&mut self, engine: &Engine) -> CaseResult<()> {
        let result = self.store_step(engine);
        self.settle(result)
    }

    /// Run, then echo the captured output.
    pub fn print(&mut self, engine: &Engine) -> CaseResult<()> {
        let result = self.print_step(engine);
        self.settle(result)
    }

    /// Drive the case through `action` and report the final verdict.
    pub fn perform(&mut self, action: Action, engine: &Engine) -> Outcome {
        // Errors are already reflected in the status by `settle`.
        let _ = match action {
            Action::Verify => self.test(engine),
            Action::Record => self.store(engine),
            Action::Print => self.print(engine),
        };
        self.outcome()
    }

    /// Verdict derived from the current status.
    pub fn outcome(&self) -> Outcome {
        match self.status() {
            Status::Success => Outcome::Success,
            Status::Ignored => Outcome::Ignored,
            Status::Failed => Outcome::Failed(
                self.failure
                    .clone()
                    .unwrap_or_else(|| FailReason::Exception("failed".to_string())),
            ),
            other => Outcome::Failed(FailReason::Exception(format!(
                "stopped while {}",
                other
            ))),
        }
    }

    fn compile_step(&mut self, engine: &Engine) -> CaseResult<()> {
        if self.status() != Status::Waiting {
            return Ok(());
        }

        let source = self
            .properties
            .resolve(Property::Compile)
            .unwrap_or_default()
            .to_string();
        let template = Template::new(&source);
        let mut vars = Vars::for_case(&self.properties, &self.paths, engine.config());

        if template.references_any(&TOOLCHAIN_PLACEHOLDERS) {
            let cc = vars.get("cc").unwrap_or_default().to_string();
            Toolchain::detect(&cc, engine.shell())?.adjust(&mut vars);
        }

        let command = template.expand(&vars)?;
        let result = self.execute(engine, command)?;

        if !result.success() {
            self.transcript.push(result.combined());
            return Err(CaseError::CompileFailed { code: result.code });
        }

        self.lifecycle.advance(Status::Compiled);
        Ok(())
    }

    fn run_step(&mut self, engine: &Engine) -> CaseResult<()> {
        self.compile(engine)?;
        if self.status() != Status::Compiled {
            return Ok(());
        }

        let config = engine.config();
        let template = self
            .properties
            .resolve(Property::Run)
            .unwrap_or_default()
            .to_string();
        let vars = Vars::for_case(&self.properties, &self.paths, config);
        let mut command = Template::new(&template).expand(&vars)?;
        if config.debug {
            command.push(' ');
            command.push_str(&config.runner.debug_arg);
        }

        let result = self.execute(engine, command)?;

        if !result.success() {
            self.transcript.push(result.combined());
            return Err(CaseError::RunFailed { code: result.code });
        }

        if self.properties.no_output()? {
            self.lifecycle.advance(Status::Success);
            return Ok(());
        }

        let result = apply_filters(
            result,
            &self.paths.filter(Stream::Stdout),
            &self.paths.filter(Stream::Stderr),
            config,
            engine.shell(),
        )?;

        self.captured = Some(result);
        self.lifecycle.advance(Status::Executed);
        Ok(())
    }

    fn test_step(&mut self, engine: &Engine) -> CaseResult<()> {
        self.run(engine)?;
        let Some(captured) = self.captured_if_executed() else {
            return Ok(());
        };

        let config = engine.config();
        let Some(expected) = read_expectation(&config.resolve(&self.paths.expect))? else {
            debug!(case = %self.name(), "No expectation recorded");
            self.lifecycle.advance(Status::Ignored);
            return Ok(());
        };
        self.compare(Stream::Stdout, &expected, &captured.stdout)?;

        // stderr is only checked when an expectation was opted into.
        if let Some(expected) = read_expectation(&config.resolve(&self.paths.expect_stderr))? {
            self.compare(Stream::Stderr, &expected, &captured.stderr)?;
        }

        self.lifecycle.advance(Status::Success);
        Ok(())
    }

    fn store_step(&mut self, engine: &Engine) -> CaseResult<()> {
        self.run(engine)?;
        let Some(captured) = self.captured_if_executed() else {
            return Ok(());
        };

        let config = engine.config();
        let expect = config.resolve(&self.paths.expect);
        write_expectation(&expect, &captured.stdout)?;
        info!(path = %expect.display(), lines = captured.stdout.len(), "Recorded expectation");

        let expect_stderr = config.resolve(&self.paths.expect_stderr);
        if expect_stderr.is_file() {
            write_expectation(&expect_stderr, &captured.stderr)?;
            info!(path = %expect_stderr.display(), "Recorded stderr expectation");
        }

        self.lifecycle.advance(Status::Success);
        Ok(())
    }

    fn print_step(&mut self, engine: &Engine) -> CaseResult<()> {
        self.run(engine)?;
        let Some(captured) = self.captured_if_executed() else {
            return Ok(());
        };

        self.transcript.push(captured.combined());
        self.lifecycle.advance(Status::Success);
        Ok(())
    }

    // ============================================================
    // Helpers
    // ============================================================

    fn captured_if_executed(&self) -> Option<ExecResult> {
        if self.status() != Status::Executed {
            return None;
        }
        self.captured.clone()
    }

    fn execute(&mut self, engine: &Engine, command: String) -> CaseResult<ExecResult> {
        let result = exec_buffered(engine.shell(), &command);
        self.commands.push(command);
        result
    }

    fn compare(&mut self, stream: Stream, expected: &[String], actual: &[String]) -> CaseResult<()> {
        if expected == actual {
            return Ok(());
        }

        let from = self.paths.expectation(stream).display().to_string();
        let to = format!("{} ({})", self.name(), stream);
        self.transcript.push(unified_diff(expected, actual, &from, &to));
        Err(CaseError::OutputMismatch { stream })
    }

    /// Record a failing phase: status becomes `Failed` and the first reason
    /// sticks.
    fn settle(&mut self, result: CaseResult<()>) -> CaseResult<()> {
        if let Err(err) = &result {
            if self.failure.is_none() {
                debug!(case = %self.name(), error = %err, "Case failed");
                self.failure = Some(FailReason::from(err));
            }
            // Outer phases see the same error again once the case has failed.
            if !self.status().is_terminal() {
                self.lifecycle.advance(Status::Failed);
            }
        }
        result
    }
}

/// Expectation lines, newline-preserving; `None` when the file is absent.
pub fn read_expectation(path: &Path) -> CaseResult<Option<Vec<String>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(
            String::from_utf8_lossy(&bytes)
                .split_inclusive('\n')
                .map(str::to_string)
                .collect(),
        )),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(CaseError::io(path, err)),
    }
}

/// Write lines verbatim, creating or truncating the file.
pub fn write_expectation(path: &Path, lines: &[String]) -> CaseResult<()> {
    std::fs::write(path, lines.concat()).map_err(|e| CaseError::io(path, e))
}
