//! Property headers and their resolution.
//!
//! A source or driver file starts with zero or more lines of the form
//! `//!key = value`. Parsing stops at the first line without the marker, so
//! properties have to be contiguous at the top of the file. Keys are
//! case-insensitive (stored lower-cased), keys and values are trimmed.
//!
//! Resolution is three-tiered: the test-local layer, then the driver layer,
//! then a caller-supplied default.

use std::fmt;
use std::io::BufRead;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{CaseError, CaseResult};

/// Marker opening every header line.
pub const HEADER_MARKER: &str = "//!";

/// Raw ordered key/value header of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    entries: IndexMap<String, String>,
}

impl PropertySet {
    /// Parse the leading header block of `text`.
    pub fn parse(text: &str) -> Self {
        Self::from_lines(text.lines().map(str::to_string))
    }

    /// Parse the leading header block of the file at `path`.
    ///
    /// Only the header lines are read; the rest of the file is never touched.
    pub fn read(path: &Path) -> CaseResult<Self> {
        let file = std::fs::File::open(path).map_err(|e| CaseError::io(path, e))?;
        let mut lines = Vec::new();
        for line in std::io::BufReader::new(file).split(b'\n') {
            let line = line.map_err(|e| CaseError::io(path, e))?;
            if !line.starts_with(HEADER_MARKER.as_bytes()) {
                break;
            }
            let line = String::from_utf8_lossy(&line);
            lines.push(line.trim_end_matches('\r').to_string());
        }
        Ok(Self::from_lines(lines))
    }

    fn from_lines<I: IntoIterator<Item = String>>(lines: I) -> Self {
        let mut entries = IndexMap::new();
        for line in lines {
            let Some(body) = line.strip_prefix(HEADER_MARKER) else {
                break;
            };
            // A marker line without '=' declares the key with an empty value.
            let (key, value) = body.split_once('=').unwrap_or((body, ""));
            entries.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
        PropertySet { entries }
    }

    /// Look up a key (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Properties the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// Driver file linked with the case.
    Driver,
    /// Compile command template.
    Compile,
    /// Toolchain executable.
    Cc,
    /// Compiler flags.
    CcFlags,
    /// Run command template.
    Run,
    /// Free-form arguments for the run command.
    Args,
    /// `1` when the program is only checked for a zero exit code.
    NoOutput,
}

impl Property {
    /// Header key (lower-case).
    pub fn key(self) -> &'static str {
        match self {
            Property::Driver => "driver",
            Property::Compile => "compile",
            Property::Cc => "cc",
            Property::CcFlags => "ccflags",
            Property::Run => "run",
            Property::Args => "args",
            Property::NoOutput => "nooutput",
        }
    }

    /// Fixed fallback used when neither layer declares the property.
    ///
    /// `Driver` and `Cc` have none here: their fallbacks come from the
    /// runner configuration and the environment respectively.
    pub fn default_value(self) -> Option<&'static str> {
        match self {
            Property::Driver | Property::Cc => None,
            Property::Compile => Some("{cc} {ccflags} {ldflags} -o {outfile} {infile} {driver} {ldlibs}"),
            Property::CcFlags => Some("-std=c99 -g"),
            Property::Run => Some("./{outfile} {args}"),
            Property::Args => Some(""),
            Property::NoOutput => Some("0"),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Typed view of one header: a named slot per known property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyLayer {
    pub driver: Option<String>,
    pub compile: Option<String>,
    pub cc: Option<String>,
    pub ccflags: Option<String>,
    pub run: Option<String>,
    pub args: Option<String>,
    pub nooutput: Option<String>,
}

impl PropertyLayer {
    pub fn get(&self, property: Property) -> Option<&str> {
        let slot = match property {
            Property::Driver => &self.driver,
            Property::Compile => &self.compile,
            Property::Cc => &self.cc,
            Property::CcFlags => &self.ccflags,
            Property::Run => &self.run,
            Property::Args => &self.args,
            Property::NoOutput => &self.nooutput,
        };
        slot.as_deref()
    }
}

impl From<&PropertySet> for PropertyLayer {
    fn from(set: &PropertySet) -> Self {
        let take = |p: Property| set.get(p.key()).map(str::to_string);
        PropertyLayer {
            driver: take(Property::Driver),
            compile: take(Property::Compile),
            cc: take(Property::Cc),
            ccflags: take(Property::CcFlags),
            run: take(Property::Run),
            args: take(Property::Args),
            nooutput: take(Property::NoOutput),
        }
    }
}

/// Local and driver layers of one test case. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    local: PropertyLayer,
    driver: PropertyLayer,
}

impl Properties {
    pub fn new(local: &PropertySet, driver: &PropertySet) -> Self {
        Properties {
            local: local.into(),
            driver: driver.into(),
        }
    }

    /// Local layer, then driver layer.
    pub fn lookup(&self, property: Property) -> Option<&str> {
        self.local
            .get(property)
            .or_else(|| self.driver.get(property))
    }

    /// Local layer, then driver layer, then the fixed default table.
    pub fn resolve(&self, property: Property) -> Option<&str> {
        self.lookup(property).or_else(|| property.default_value())
    }

    /// Whether the case only checks the exit code.
    pub fn no_output(&self) -> CaseResult<bool> {
        let raw = self.resolve(Property::NoOutput).unwrap_or("0");
        raw.parse::<i64>()
            .map(|value| value == 1)
            .map_err(|_| CaseError::InvalidProperty {
                key: Property::NoOutput.key().to_string(),
                value: raw.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_block() {
        let set = PropertySet::parse(
            "//!Driver = drivers/gen.c\n//!ARGS=foo bar \n//!run = {outfile}\nint main() {}\n",
        );
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("driver"), Some("drivers/gen.c"));
        assert_eq!(set.get("args"), Some("foo bar"));
        assert_eq!(set.get("RUN"), Some("{outfile}"));
    }

    #[test]
    fn test_parse_stops_at_first_plain_line() {
        let set = PropertySet::parse("//!a=1\n// comment\n//!b=2\n");
        assert_eq!(set.get("a"), Some("1"));
        assert_eq!(set.get("b"), None);
    }

    #[test]
    fn test_parse_splits_on_first_equals_only() {
        let set = PropertySet::parse("//!compile = cc -DX=1 -o {outfile}\n");
        assert_eq!(set.get("compile"), Some("cc -DX=1 -o {outfile}"));
    }

    #[test]
    fn test_parse_marker_without_value() {
        let set = PropertySet::parse("//!flag\n");
        assert_eq!(set.get("flag"), Some(""));
    }

    #[test]
    fn test_later_duplicate_wins() {
        let set = PropertySet::parse("//!args=a\n//!Args=b\n");
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("args"), Some("b"));
    }

    #[test]
    fn test_parse_empty_and_headerless() {
        assert!(PropertySet::parse("").is_empty());
        assert!(PropertySet::parse("int x;\n//!args=1\n").is_empty());
    }

    #[test]
    fn test_three_tier_resolution() {
        let local = PropertySet::parse("//!args=local\n");
        let driver = PropertySet::parse("//!args=driver\n//!ccflags=-O1\n");
        let props = Properties::new(&local, &driver);

        assert_eq!(props.lookup(Property::Args), Some("local"));
        assert_eq!(props.lookup(Property::CcFlags), Some("-O1"));
        assert_eq!(props.lookup(Property::Run), None);
        assert_eq!(props.lookup(Property::Cc), None);
        assert_eq!(props.resolve(Property::Run), Some("./{outfile} {args}"));
    }

    #[test]
    fn test_no_output_flag() {
        let empty = PropertySet::default();
        let on = Properties::new(&PropertySet::parse("//!nooutput=1\n"), &empty);
        let off = Properties::new(&PropertySet::parse("//!nooutput=0\n"), &empty);
        let default = Properties::new(&empty, &empty);
        let bad = Properties::new(&PropertySet::parse("//!nooutput=yes\n"), &empty);

        assert!(on.no_output().unwrap());
        assert!(!off.no_output().unwrap());
        assert!(!default.no_output().unwrap());
        assert!(matches!(
            bad.no_output(),
            Err(CaseError::InvalidProperty { .. })
        ));
    }

    #[test]
    fn test_read_missing_file() {
        let err = PropertySet::read(Path::new("/nonexistent/test-driver.c")).unwrap_err();
        assert!(matches!(err, CaseError::Io { .. }));
    }

    #[test]
    fn test_read_only_consumes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.c");
        let mut content = b"//!args = 7\n".to_vec();
        // Not valid UTF-8 past the header; never read.
        content.extend_from_slice(&[0xff, 0xfe, b'\n']);
        std::fs::write(&path, content).unwrap();

        let set = PropertySet::read(&path).unwrap();
        assert_eq!(set.get("args"), Some("7"));
    }
}
