//! Newtype wrappers for identifiers to ensure type safety.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier the service assigns to an asynchronous task.
///
/// Unique per service instance and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskUid(u64);

impl TaskUid {
    /// Create a new TaskUid from its numeric value.
    pub const fn new(uid: u64) -> Self {
        Self(uid)
    }

    /// Get the numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskUid {
    fn from(uid: u64) -> Self {
        Self(uid)
    }
}

impl From<TaskUid> for u64 {
    fn from(uid: TaskUid) -> Self {
        uid.0
    }
}

impl FromStr for TaskUid {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Name of an index on the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexUid(String);

impl IndexUid {
    /// Create a new IndexUid from a string.
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for IndexUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IndexUid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IndexUid {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_uid_parse() {
        assert_eq!("42".parse::<TaskUid>().unwrap(), TaskUid::new(42));
        assert_eq!(" 7 ".parse::<TaskUid>().unwrap().get(), 7);
        assert!("-1".parse::<TaskUid>().is_err());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(format!("{}", TaskUid::new(12)), "12");
        assert_eq!(format!("{}", IndexUid::new("movies")), "movies");
    }

    #[test]
    fn test_task_uid_serializes_as_number() {
        let json = serde_json::to_string(&TaskUid::new(3)).unwrap();
        assert_eq!(json, "3");
    }
}
