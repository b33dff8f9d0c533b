//! Shared execution context for test cases.

use std::fmt;
use std::path::Path;

use crate::case::TestCase;
use crate::config::EngineConfig;
use crate::error::CaseResult;
use crate::exec::{Shell, SystemShell};

/// Configuration plus the shell every command goes through.
pub struct Engine {
    config: EngineConfig,
    shell: Box<dyn Shell>,
}

impl Engine {
    /// Engine running commands with `/bin/sh` in the configured workdir.
    pub fn new(config: EngineConfig) -> Self {
        let shell = SystemShell::new(config.workdir.clone());
        Self::with_shell(config, shell)
    }

    /// Engine with a custom shell.
    pub fn with_shell(config: EngineConfig, shell: impl Shell + 'static) -> Self {
        Engine {
            config,
            shell: Box::new(shell),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn shell(&self) -> &dyn Shell {
        self.shell.as_ref()
    }

    /// Open the case at `source`, relative to the workdir.
    pub fn open(&self, source: &Path) -> CaseResult<TestCase> {
        TestCase::open(source, self)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
