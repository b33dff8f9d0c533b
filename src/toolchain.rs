//! Toolchain detection and PIE adjustments.
//!
//! Test binaries are linked at fixed addresses, so position-independent
//! executables are switched off. GCC only understands `-no-pie` from
//! version 6 on, which is why the version banner is probed.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::exec::Shell;
use crate::template::Vars;

/// First GCC major version that accepts `-no-pie`.
pub const GCC_NO_PIE_SINCE: u32 = 6;

/// Errors while identifying the toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainError {
    /// `<cc> --version` could not be run or exited non-zero.
    ProbeFailed { toolchain: String, reason: String },
    /// The banner matched no known compiler.
    Unrecognized { toolchain: String },
}

impl fmt::Display for ToolchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolchainError::ProbeFailed { toolchain, reason } => {
                write!(f, "could not probe '{}': {}", toolchain, reason)
            }
            ToolchainError::Unrecognized { toolchain } => {
                write!(f, "unsupported toolchain '{}'", toolchain)
            }
        }
    }
}

impl std::error::Error for ToolchainError {}

/// Known C compiler families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toolchain {
    Gcc { major: u32 },
    Clang { major: u32 },
}

fn version_regex() -> &'static Regex {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    VERSION.get_or_init(|| Regex::new(r"\b(\d+)\.(\d+)(?:\.(\d+))?\b").expect("valid version regex"))
}

impl Toolchain {
    /// Classify a `--version` banner.
    pub fn classify(banner: &str) -> Option<Toolchain> {
        let first_line = banner.lines().next().unwrap_or_default();
        let major = version_regex()
            .captures(first_line)
            .or_else(|| version_regex().captures(banner))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);

        let lower = banner.to_lowercase();
        if lower.contains("clang") {
            Some(Toolchain::Clang { major })
        } else if lower.contains("gcc") || banner.contains("Free Software Foundation") {
            Some(Toolchain::Gcc { major })
        } else {
            None
        }
    }

    /// Run `<cc> --version` and classify the result.
    pub fn detect(cc: &str, shell: &dyn Shell) -> Result<Toolchain, ToolchainError> {
        let command = format!("{} --version", cc);
        let output = shell
            .execute(&command, None)
            .map_err(|e| ToolchainError::ProbeFailed {
                toolchain: cc.to_string(),
                reason: e.to_string(),
            })?;

        if output.code != 0 {
            return Err(ToolchainError::ProbeFailed {
                toolchain: cc.to_string(),
                reason: format!("exit code {}", output.code),
            });
        }

        let banner = String::from_utf8_lossy(&output.stdout);
        let toolchain = Self::classify(&banner).ok_or_else(|| ToolchainError::Unrecognized {
            toolchain: cc.to_string(),
        })?;
        debug!(cc, ?toolchain, "Detected toolchain");
        Ok(toolchain)
    }

    /// Whether the linker needs an explicit `-no-pie`.
    pub fn needs_no_pie(self) -> bool {
        match self {
            Toolchain::Gcc { major } => major >= GCC_NO_PIE_SINCE,
            Toolchain::Clang { .. } => true,
        }
    }

    /// Disable PIE code generation and, where supported, PIE linking.
    pub fn adjust(self, vars: &mut Vars) {
        vars.append("ccflags", "-fno-pie");
        if self.needs_no_pie() {
            vars.append("ldflags", "-no-pie");
        }
    }
}
