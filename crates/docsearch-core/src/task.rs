//! Task status records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, ErrorPayload};
use crate::ids::TaskUid;
use crate::status::TaskStatus;

/// Key used by full task objects.
pub const UID_KEY: &str = "uid";
/// Key used by the summaries returned when a task is enqueued.
pub const TASK_UID_KEY: &str = "taskUid";

/// The service's current knowledge of one asynchronous task.
///
/// Built from the raw JSON object the service returns. The required fields
/// (`uid` or `taskUid`, `type`, `status`) are validated up front; everything
/// else is kept verbatim and reachable through [`TaskRecord::get`].
///
/// Records are never patched. A fresher view of the task is a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct TaskRecord {
    uid: TaskUid,
    kind: String,
    status: TaskStatus,
    fields: Map<String, Value>,
}

impl TaskRecord {
    /// Validate a raw JSON value.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(CoreError::InvalidField {
                field: "task",
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
        }
    }

    /// Validate a raw JSON object, normalizing `uid`/`taskUid` so both are
    /// present and equal.
    pub fn from_map(mut fields: Map<String, Value>) -> Result<Self, CoreError> {
        let raw_uid = fields
            .get(UID_KEY)
            .or_else(|| fields.get(TASK_UID_KEY))
            .ok_or(CoreError::MissingField(UID_KEY))?;
        let uid = raw_uid
            .as_u64()
            .map(TaskUid::new)
            .ok_or_else(|| CoreError::InvalidField {
                field: UID_KEY,
                reason: format!("expected a non-negative integer, got {raw_uid}"),
            })?;

        let kind = match fields.get("type") {
            None | Some(Value::Null) => return Err(CoreError::MissingField("type")),
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => {
                return Err(CoreError::InvalidField {
                    field: "type",
                    reason: format!("expected a string, got {other}"),
                })
            }
        };

        let status = match fields.get("status") {
            None | Some(Value::Null) => return Err(CoreError::MissingField("status")),
            Some(Value::String(status)) => {
                status
                    .parse::<TaskStatus>()
                    .map_err(|reason| CoreError::InvalidField {
                        field: "status",
                        reason,
                    })?
            }
            Some(other) => {
                return Err(CoreError::InvalidField {
                    field: "status",
                    reason: format!("expected a string, got {other}"),
                })
            }
        };

        fields.insert(UID_KEY.to_string(), Value::from(uid.get()));
        fields.insert(TASK_UID_KEY.to_string(), Value::from(uid.get()));

        Ok(Self {
            uid,
            kind,
            status,
            fields,
        })
    }

    /// Task identifier.
    pub fn uid(&self) -> TaskUid {
        self.uid
    }

    /// Operation tag, e.g. `documentAdditionOrUpdate`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Current status.
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Error payload, present when the task failed.
    pub fn error(&self) -> Option<ErrorPayload> {
        match self.fields.get("error") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value(value.clone())
                    .unwrap_or_else(|_| ErrorPayload::from_message(value.to_string())),
            ),
        }
    }

    /// Index the task operates on, if any.
    pub fn index_uid(&self) -> Option<&str> {
        self.fields.get("indexUid").and_then(Value::as_str)
    }

    /// Operation specific details, passed through untouched.
    pub fn details(&self) -> Option<&Value> {
        self.fields.get("details").filter(|v| !v.is_null())
    }

    pub fn enqueued_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp("enqueuedAt")
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp("startedAt")
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp("finishedAt")
    }

    /// Raw field lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns true if the raw record has `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Raw field names in the order the service sent them.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// The full raw record.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }
}

impl TryFrom<Map<String, Value>> for TaskRecord {
    type Error = CoreError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_map(fields)
    }
}

impl TryFrom<Value> for TaskRecord {
    type Error = CoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<TaskRecord> for Map<String, Value> {
    fn from(record: TaskRecord) -> Self {
        record.fields
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
