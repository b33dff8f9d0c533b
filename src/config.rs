//! Engine and runner configuration.
//!
//! Two layers are kept apart:
//!
//! 1. **[`RunnerConfig`]** - optional `expectrun.toml`, project-level knobs
//!    (where cases live, which extensions count, default driver name).
//! 2. **[`EngineConfig`]** - the explicit record handed to every phase:
//!    working directory, toolchain/linker overrides taken from the process
//!    environment once at startup, debug and verbosity switches.
//!
//! Nothing below `main` reads the process environment; tests build an
//! `EngineConfig` directly.
//!
//! ## TOML format (`expectrun.toml`)
//!
//! ```toml
//! cases_dir = "cases"
//! extensions = ["c", "s", "S"]
//! default_driver = "test-driver.c"
//! debug_arg = "-d"
//! name_width = 60
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "expectrun.toml";

/// Environment variable overriding the toolchain when no `cc` property is set.
pub const ENV_TOOLCHAIN: &str = "CC";
/// Environment variable supplying linker flags.
pub const ENV_LDFLAGS: &str = "LDFLAGS";
/// Environment variable supplying linker libraries.
pub const ENV_LDLIBS: &str = "LDLIBS";

/// Errors loading the runner configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// File could not be read.
    Read(PathBuf, String),
    /// File could not be parsed.
    Parse(PathBuf, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(path, err) => {
                write!(f, "Failed to read '{}': {}", path.display(), err)
            }
            ConfigError::Parse(path, err) => {
                write!(f, "Failed to parse '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbosityLevel {
    /// Verdict lines and summary only
    Quiet,
    /// Verdicts plus diagnostics for failing and printed cases
    #[default]
    Normal,
    /// Everything, including each executed command
    Verbose,
}

/// Project-level runner settings (`expectrun.toml`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Directory walked when no case paths are given.
    pub cases_dir: PathBuf,
    /// File extensions (without the dot) recognized as test sources.
    pub extensions: Vec<String>,
    /// Driver used when a source does not name one.
    pub default_driver: String,
    /// Argument appended to the run command in debug mode.
    pub debug_arg: String,
    /// Column the verdict is aligned to.
    pub name_width: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            cases_dir: PathBuf::from("cases"),
            extensions: vec!["c".to_string(), "s".to_string(), "S".to_string()],
            default_driver: "test-driver.c".to_string(),
            debug_arg: "-d".to_string(),
            name_width: 60,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e.to_string()))?;

        Self::from_toml(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load `expectrun.toml` from `dir` if present, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::from_file(candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Whether `path` carries one of the recognized source extensions.
    pub fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|known| known == ext))
    }
}

/// Explicit configuration record threaded through the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Directory all commands run in and relative paths resolve against.
    pub workdir: PathBuf,
    /// Toolchain override, used only when no `cc` property is set.
    pub toolchain: Option<String>,
    /// Linker flags override.
    pub ldflags: Option<String>,
    /// Linker libraries override.
    pub ldlibs: Option<String>,
    /// Append `debug_arg` to every run command.
    pub debug: bool,
    /// Output verbosity.
    pub verbosity: VerbosityLevel,
    /// Project-level settings.
    pub runner: RunnerConfig,
}

impl EngineConfig {
    /// Configuration rooted at `workdir` with no environment overrides.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        EngineConfig {
            workdir: workdir.into(),
            toolchain: None,
            ldflags: None,
            ldlibs: None,
            debug: false,
            verbosity: VerbosityLevel::Normal,
            runner: RunnerConfig::default(),
        }
    }

    /// Capture the toolchain/linker overrides from the process environment.
    pub fn from_env(workdir: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(workdir);
        config.toolchain = std::env::var(ENV_TOOLCHAIN).ok();
        config.ldflags = std::env::var(ENV_LDFLAGS).ok();
        config.ldlibs = std::env::var(ENV_LDLIBS).ok();
        config
    }

    /// Set runner settings
    pub fn with_runner(mut self, runner: RunnerConfig) -> Self {
        self.runner = runner;
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, level: VerbosityLevel) -> Self {
        self.verbosity = level;
        self
    }

    /// Enable or disable debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Resolve a case-relative path against the working directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.workdir.join(path)
    }
}
