//! Test case lifecycle status.

use std::fmt;

use tracing::{trace, warn};

/// Lifecycle states in their fixed forward order.
///
/// `Success`, `Failed` and `Ignored` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Status {
    #[default]
    Waiting,
    Compiled,
    Executed,
    Success,
    Failed,
    Ignored,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Success | Status::Failed | Status::Ignored)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Waiting => "waiting",
            Status::Compiled => "compiled",
            Status::Executed => "executed",
            Status::Success => "success",
            Status::Failed => "failed",
            Status::Ignored => "ignored",
        };
        f.write_str(name)
    }
}

/// Status holder that only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lifecycle {
    status: Status,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Move to `next`. Refused (returns `false`) from a terminal state or
    /// when `next` is not strictly ahead of the current state.
    pub fn advance(&mut self, next: Status) -> bool {
        if self.status.is_terminal() || next <= self.status {
            warn!(from = %self.status, to = %next, "Refused status regression");
            return false;
        }
        trace!(from = %self.status, to = %next, "Status transition");
        self.status = next;
        true
    }
}
