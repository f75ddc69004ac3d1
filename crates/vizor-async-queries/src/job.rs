//! Job metadata and the events built from it.

use crate::error::{AsyncQueryError, AsyncQueryResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use vizor_core::{ChannelId, JobId};

/// Job status as carried on the wire.
///
/// Workers are trusted to move jobs along `pending -> running -> done|error`;
/// unknown values are kept as-is so newer workers are not dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    /// Submitted, not yet picked up.
    #[default]
    Pending,
    /// A worker is running the query.
    Running,
    /// Terminal failure.
    Error,
    /// Terminal success.
    Done,
    /// Any other status string.
    Other(String),
}

impl JobStatus {
    /// Wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Error => "error",
            Self::Done => "done",
            Self::Other(s) => s,
        }
    }

    /// True for `done` and `error`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "error" => Self::Error,
            "done" => Self::Done,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys an update may never overwrite.
const IDENTITY_KEYS: [&str; 2] = ["channel_id", "job_id"];

/// Snapshot of a job as published to the event streams.
///
/// Keys other than the six known ones are kept in `extra` and written back
/// out flat, so fields added by workers survive a round-trip.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobMetadata {
    /// Channel the job reports to.
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    /// Job identifier.
    #[serde(default)]
    pub job_id: Option<JobId>,
    /// Submitting user; `None` for anonymous users.
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Current status.
    #[serde(default)]
    pub status: JobStatus,
    /// Errors reported by the worker.
    #[serde(default)]
    pub errors: Vec<Value>,
    /// Where the cached result can be fetched.
    #[serde(default)]
    pub result_url: Option<String>,
    /// Any other keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobMetadata {
    /// Returns a copy with `status` set and `extras` merged in.
    ///
    /// Extras naming `channel_id` or `job_id` are ignored.
    pub fn merged(&self, status: JobStatus, extras: Map<String, Value>) -> AsyncQueryResult<Self> {
        let mut map = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in extras {
            if IDENTITY_KEYS.contains(&key.as_str()) {
                continue;
            }
            map.insert(key, value);
        }
        map.insert("status".to_string(), Value::String(status.into()));

        Ok(serde_json::from_value(Value::Object(map))?)
    }

    /// Checks that both identifiers are present.
    pub fn require_ids(&self) -> AsyncQueryResult<(&ChannelId, &JobId)> {
        let channel_id = self
            .channel_id
            .as_ref()
            .ok_or_else(|| AsyncQueryError::InvalidJob("No channel ID specified".to_string()))?;
        let job_id = self
            .job_id
            .as_ref()
            .ok_or_else(|| AsyncQueryError::InvalidJob("No job ID specified".to_string()))?;
        Ok((channel_id, job_id))
    }
}

/// Builds job metadata from its parts.
#[must_use]
pub fn build_job_metadata(
    channel_id: &ChannelId,
    job_id: &JobId,
    user_id: Option<i64>,
    status: JobStatus,
    errors: Vec<Value>,
    result_url: Option<String>,
) -> JobMetadata {
    JobMetadata {
        channel_id: Some(channel_id.clone()),
        job_id: Some(job_id.clone()),
        user_id,
        status,
        errors,
        result_url,
        extra: Map::new(),
    }
}

/// An event read back from a channel stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Stream entry id.
    pub id: String,
    /// Job snapshot at the time of the event.
    #[serde(flatten)]
    pub job: JobMetadata,
}
