//! Batch orchestration: discover cases, drive each through an action,
//! print verdicts and the final tally.
//!
//! Cases run sequentially in discovery order. Every per-case error stays
//! inside that case's verdict; only discovery can abort a batch.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::case::{Action, FailReason, Outcome};
use crate::config::{EngineConfig, VerbosityLevel};
use crate::engine::Engine;
use crate::error::DiscoveryError;

/// Resolve targets to case paths relative to the working directory.
///
/// Files are taken as given. Directories are walked recursively, sorted by
/// file name and filtered by source extension. No targets means walking
/// the configured cases directory.
pub fn discover(targets: &[PathBuf], config: &EngineConfig) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut found = Vec::new();
    if targets.is_empty() {
        walk(&config.runner.cases_dir, config, &mut found)?;
    }
    for target in targets {
        let resolved = config.resolve(target);
        if !resolved.is_dir() {
            found.push(target.clone());
            continue;
        }
        walk(target, config, &mut found)?;
    }

    debug!(count = found.len(), "Discovered test cases");
    Ok(found)
}

fn walk(dir: &Path, config: &EngineConfig, found: &mut Vec<PathBuf>) -> Result<(), DiscoveryError> {
    let root = config.resolve(dir);
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.map_err(|e| DiscoveryError {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone()),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() || !config.runner.is_source(entry.path()) {
            continue;
        }
        let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
        found.push(dir.join(relative));
    }
    Ok(())
}

/// Verdict of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub name: String,
    pub outcome: Outcome,
}

/// Verdicts of a whole batch, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub cases: Vec<CaseReport>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.cases.len()
    }

    pub fn failed(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|c| c.outcome.is_failure())
    }

    pub fn ignored(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|c| c.outcome.is_ignored())
    }

    /// Cases counted towards pass/fail.
    pub fn counted(&self) -> usize {
        self.total() - self.ignored().count()
    }

    pub fn all_passed(&self) -> bool {
        self.failed().next().is_none()
    }

    /// Process exit status: 1 if any case failed.
    pub fn exit_code(&self) -> u8 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }

    /// Tally lines printed after the last verdict.
    pub fn summary(&self) -> Vec<String> {
        let failed = self.failed().map(|c| c.name.as_str()).collect_vec();
        let mut lines = vec![if failed.is_empty() {
            format!("{} tests passed.", self.counted())
        } else {
            format!(
                "{} of {} tests failed: {}",
                failed.len(),
                self.counted(),
                failed.iter().join(", ")
            )
        }];

        let ignored = self.ignored().map(|c| c.name.as_str()).collect_vec();
        if !ignored.is_empty() {
            lines.push(format!(
                "Ignored {} tests: {}",
                ignored.len(),
                ignored.iter().join(", ")
            ));
        }
        lines
    }
}

/// Sequential runner for a list of case paths.
#[derive(Debug)]
pub struct Batch<'a> {
    engine: &'a Engine,
    action: Action,
}

impl<'a> Batch<'a> {
    pub fn new(engine: &'a Engine, action: Action) -> Self {
        Batch { engine, action }
    }

    /// Drive every case, writing verdicts and the summary to `out`.
    pub fn run(&self, paths: &[PathBuf], out: &mut impl Write) -> io::Result<BatchReport> {
        let mut report = BatchReport::default();

        for path in paths {
            let case = self.run_one(path, out)?;
            report.cases.push(case);
        }

        for line in report.summary() {
            writeln!(out, "{}", line)?;
        }
        info!(
            total = report.total(),
            failed = report.failed().count(),
            ignored = report.ignored().count(),
            "Batch finished"
        );
        Ok(report)
    }

    fn run_one(&self, path: &Path, out: &mut impl Write) -> io::Result<CaseReport> {
        let config = self.engine.config();
        let name = path.display().to_string();

        // Name first, verdict once the case is done.
        write!(
            out,
            "{:<width$}",
            format!("{}:", name),
            width = config.runner.name_width
        )?;
        out.flush()?;

        let (outcome, commands, transcript) = match self.engine.open(path) {
            Ok(mut case) => {
                let outcome = case.perform(self.action, self.engine);
                (outcome, case.commands().to_vec(), case.transcript().to_vec())
            }
            Err(err) => (
                Outcome::Failed(FailReason::Exception(err.to_string())),
                Vec::new(),
                vec![format!("{}\n", err)],
            ),
        };

        writeln!(out, "{}", outcome)?;

        match config.verbosity {
            VerbosityLevel::Quiet => {}
            VerbosityLevel::Normal => {
                if outcome.is_failure() || self.action == Action::Print {
                    write_transcript(out, &transcript)?;
                }
            }
            VerbosityLevel::Verbose => {
                for command in &commands {
                    writeln!(out, "$ {}", command)?;
                }
                write_transcript(out, &transcript)?;
            }
        }

        Ok(CaseReport { name, outcome })
    }
}

fn write_transcript(out: &mut impl Write, transcript: &[String]) -> io::Result<()> {
    for block in transcript {
        out.write_all(block.as_bytes())?;
        if !block.is_empty() && !block.ends_with('\n') {
            writeln!(out)?;
        }
    }
    Ok(())
}
