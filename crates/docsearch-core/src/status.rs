//! Task status as reported by the service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of an asynchronous task.
///
/// ```text
/// enqueued -> processing -> succeeded | failed | cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task accepted and waiting in the queue.
    Enqueued,
    /// Task is being processed.
    Processing,
    /// Task completed successfully.
    Succeeded,
    /// Task failed; the record carries an error payload.
    Failed,
    /// Task was cancelled before it completed.
    #[serde(rename = "canceled", alias = "cancelled")]
    Cancelled,
}

impl TaskStatus {
    /// Returns true if no further transitions can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Returns true while the task is queued or running.
    pub fn is_unfinished(&self) -> bool {
        !self.is_terminal()
    }

    /// Wire spelling used by the service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "canceled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enqueued" => Ok(Self::Enqueued),
            "processing" => Ok(Self::Processing),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "canceled" | "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown task status '{other}'")),
        }
    }
}
