//! Optional post-processing of captured streams through filter scripts.
//!
//! A filter lives next to the expectation it serves (`P.expect_filter`,
//! `P.expect_stderr_filter`). When present it is run as a shell command with
//! the stream on stdin; its stdout replaces the stream.

use std::path::Path;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::CaseResult;
use crate::exec::{lines, strip_debug, ExecResult, Shell};

/// Suffix appended to an expectation path to locate its filter.
pub const FILTER_SUFFIX: &str = "_filter";

/// Pipe `stream` through the filter at `script` if it exists.
///
/// Returns the stream unchanged when there is no filter. A non-zero filter
/// exit is logged and its output used anyway.
pub fn apply_filter(
    stream: Vec<String>,
    script: &Path,
    config: &EngineConfig,
    shell: &dyn Shell,
) -> CaseResult<Vec<String>> {
    if !config.resolve(script).is_file() {
        return Ok(stream);
    }

    let command = invocation(script);
    let input: String = stream.concat();
    let raw = shell.execute(&command, Some(&input))?;

    if raw.code != 0 {
        warn!(filter = %command, code = raw.code, "Filter exited with non-zero status");
    }
    debug!(filter = %command, "Applied output filter");

    Ok(strip_debug(lines(&raw.stdout)).collect())
}

/// Shell word running `script`; bare file names would otherwise be looked
/// up in `PATH`.
fn invocation(script: &Path) -> String {
    if script.is_absolute() || script.components().count() > 1 {
        script.display().to_string()
    } else {
        format!("./{}", script.display())
    }
}

/// Filter both streams of `result` independently.
pub fn apply_filters(
    mut result: ExecResult,
    stdout_filter: &Path,
    stderr_filter: &Path,
    config: &EngineConfig,
    shell: &dyn Shell,
) -> CaseResult<ExecResult> {
    result.stdout = apply_filter(result.stdout, stdout_filter, config, shell)?;
    result.stderr = apply_filter(result.stderr, stderr_filter, config, shell)?;
    Ok(result)
}
