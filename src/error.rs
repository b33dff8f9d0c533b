//! Error types for the test-case engine.
//!
//! Every per-case failure is contained at the case boundary: phases return
//! [`CaseResult`], and the batch turns the final status into an
//! [`Outcome`](crate::case::Outcome). Only [`DiscoveryError`] aborts a batch.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::case::Stream;
use crate::template::TemplateError;
use crate::toolchain::ToolchainError;

/// Result type for case construction and phase execution.
pub type CaseResult<T> = Result<T, CaseError>;

/// Errors raised while building or driving a single test case.
#[derive(Debug)]
pub enum CaseError {
    /// A source, driver or expectation file could not be read or written.
    Io { path: PathBuf, source: io::Error },
    /// The shell could not be started for a command.
    Spawn { command: String, source: io::Error },
    /// A compile or run template could not be expanded.
    Template(TemplateError),
    /// The configured toolchain could not be used.
    Toolchain(ToolchainError),
    /// A property carried a value of the wrong shape.
    InvalidProperty { key: String, value: String },
    /// The compiler exited with a non-zero status.
    CompileFailed { code: i32 },
    /// The test binary exited with a non-zero status.
    RunFailed { code: i32 },
    /// Captured output differs from its expectation.
    OutputMismatch { stream: Stream },
}

impl CaseError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CaseError::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for CaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseError::Io { path, source } => {
                write!(f, "Failed to access '{}': {}", path.display(), source)
            }
            CaseError::Spawn { command, source } => {
                write!(f, "Failed to execute '{}': {}", command, source)
            }
            CaseError::Template(err) => write!(f, "Template error: {}", err),
            CaseError::Toolchain(err) => write!(f, "Toolchain error: {}", err),
            CaseError::InvalidProperty { key, value } => {
                write!(f, "Invalid value for property '{}': {:?}", key, value)
            }
            CaseError::CompileFailed { code } => {
                write!(f, "Compilation failed with exit code {}", code)
            }
            CaseError::RunFailed { code } => write!(f, "Test exited with code {}", code),
            CaseError::OutputMismatch { stream } => write!(f, "Mismatch on {}", stream),
        }
    }
}

impl std::error::Error for CaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaseError::Io { source, .. } | CaseError::Spawn { source, .. } => Some(source),
            CaseError::Template(err) => Some(err),
            CaseError::Toolchain(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TemplateError> for CaseError {
    fn from(err: TemplateError) -> Self {
        CaseError::Template(err)
    }
}

impl From<ToolchainError> for CaseError {
    fn from(err: ToolchainError) -> Self {
        CaseError::Toolchain(err)
    }
}

/// Failure to enumerate test paths. This is the only error that stops a batch.
#[derive(Debug)]
pub struct DiscoveryError {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to enumerate test cases in '{}': {}",
            self.path.display(),
            self.message
        )
    }
}

impl std::error::Error for DiscoveryError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_io_error_keeps_source() {
        let err = CaseError::io(
            "cases/missing.c",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(
            err.to_string(),
            "Failed to access 'cases/missing.c': no such file"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn test_phase_failures_display() {
        assert_eq!(
            CaseError::CompileFailed { code: 1 }.to_string(),
            "Compilation failed with exit code 1"
        );
        assert_eq!(
            CaseError::OutputMismatch {
                stream: Stream::Stderr
            }
            .to_string(),
            "Mismatch on stderr"
        );
    }
}
