//! Per-case verdicts.

use std::fmt;

use crate::case::Stream;
use crate::error::CaseError;

/// Why a case failed; printed in parentheses after `FAIL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    /// The compiler exited non-zero.
    Compile,
    /// The test binary exited non-zero.
    ExitCode(i32),
    /// A captured stream differs from its expectation.
    Output(Stream),
    /// Anything else: unreadable files, bad templates, spawn failures.
    Exception(String),
}

impl From<&CaseError> for FailReason {
    fn from(err: &CaseError) -> Self {
        match err {
            CaseError::CompileFailed { .. } => FailReason::Compile,
            CaseError::RunFailed { code } => FailReason::ExitCode(*code),
            CaseError::OutputMismatch { stream } => FailReason::Output(*stream),
            other => FailReason::Exception(other.to_string()),
        }
    }
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::Compile => f.write_str("Compile"),
            FailReason::ExitCode(code) => write!(f, "Exit Code {}", code),
            FailReason::Output(Stream::Stdout) => f.write_str("Output"),
            FailReason::Output(Stream::Stderr) => f.write_str("Stderr"),
            FailReason::Exception(_) => f.write_str("Exception"),
        }
    }
}

/// Final result of driving one case through an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(FailReason),
    Ignored,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Outcome::Ignored)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("OK"),
            Outcome::Failed(reason) => write!(f, "FAIL ({})", reason),
            Outcome::Ignored => f.write_str("IGNORED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_lines() {
        assert_eq!(Outcome::Success.to_string(), "OK");
        assert_eq!(Outcome::Ignored.to_string(), "IGNORED");
        assert_eq!(
            Outcome::Failed(FailReason::Compile).to_string(),
            "FAIL (Compile)"
        );
        assert_eq!(
            Outcome::Failed(FailReason::ExitCode(139)).to_string(),
            "FAIL (Exit Code 139)"
        );
        assert_eq!(
            Outcome::Failed(FailReason::Output(Stream::Stderr)).to_string(),
            "FAIL (Stderr)"
        );
    }

    #[test]
    fn test_reason_from_error() {
        assert_eq!(
            FailReason::from(&CaseError::RunFailed { code: 2 }),
            FailReason::ExitCode(2)
        );
        let reason = FailReason::from(&CaseError::InvalidProperty {
            key: "nooutput".to_string(),
            value: "yes".to_string(),
        });
        assert!(matches!(reason, FailReason::Exception(ref msg) if msg.contains("nooutput")));
        assert_eq!(reason.to_string(), "Exception");
    }
}
