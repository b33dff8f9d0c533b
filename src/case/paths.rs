//! Derived file layout of a test case.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::filter::FILTER_SUFFIX;

/// Suffix of the compiled test binary.
pub const BINARY_SUFFIX: &str = ".out";
/// Suffix of the stdout expectation.
pub const EXPECT_SUFFIX: &str = ".expect";
/// Suffix of the stderr expectation.
pub const EXPECT_STDERR_SUFFIX: &str = ".expect_stderr";

/// Captured output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Every path derived from a source file `P`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasePaths {
    /// `P`
    pub source: PathBuf,
    /// Driver linked with the source.
    pub driver: PathBuf,
    /// `P.out`
    pub binary: PathBuf,
    /// `P.expect`
    pub expect: PathBuf,
    /// `P.expect_stderr`
    pub expect_stderr: PathBuf,
}

impl CasePaths {
    pub fn new(source: &Path, driver: &Path) -> Self {
        CasePaths {
            source: source.to_path_buf(),
            driver: driver.to_path_buf(),
            binary: with_suffix(source, BINARY_SUFFIX),
            expect: with_suffix(source, EXPECT_SUFFIX),
            expect_stderr: with_suffix(source, EXPECT_STDERR_SUFFIX),
        }
    }

    /// Expectation file of `stream`.
    pub fn expectation(&self, stream: Stream) -> &Path {
        match stream {
            Stream::Stdout => &self.expect,
            Stream::Stderr => &self.expect_stderr,
        }
    }

    /// Filter script of `stream`.
    pub fn filter(&self, stream: Stream) -> PathBuf {
        with_suffix(self.expectation(stream), FILTER_SUFFIX)
    }
}
