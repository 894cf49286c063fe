//! Status records decoded from a php-fpm style status page.
//!
//! A `StatusRecord` is built fresh for every poll and dropped once the
//! metrics have been assembled. Field names on the wire contain spaces
//! (`"accepted conn"`), hence the explicit serde renames.
//!
//! All counters are stored as `i64` and must be non-negative: that is the
//! range the output metrics can carry, so anything outside it is rejected
//! at decode time rather than clamped later.

use serde::{Deserialize, Deserializer, Serialize};

/// Pool-wide summary of a single status response.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct StatusRecord {
    /// Pool name (`pool`).
    #[serde(default)]
    pub pool: Option<String>,

    /// Process manager mode: static, dynamic or ondemand (`process manager`).
    #[serde(default, rename = "process manager")]
    pub process_manager: Option<String>,

    /// Pool start time, seconds since epoch (`start time`).
    #[serde(default, rename = "start time")]
    pub start_time: Option<i64>,

    /// Seconds since the pool started (`start since`).
    #[serde(default, rename = "start since", deserialize_with = "optional_counter")]
    pub start_since: Option<i64>,

    /// Connections accepted by the pool (`accepted conn`).
    #[serde(rename = "accepted conn", deserialize_with = "counter")]
    pub accepted_conn: i64,

    /// Requests waiting for a free process (`listen queue`).
    #[serde(default, rename = "listen queue", deserialize_with = "optional_counter")]
    pub listen_queue: Option<i64>,

    /// High-water mark of the listen queue (`max listen queue`).
    #[serde(default, rename = "max listen queue", deserialize_with = "optional_counter")]
    pub max_listen_queue: Option<i64>,

    /// Size of the socket backlog (`listen queue len`).
    #[serde(default, rename = "listen queue len", deserialize_with = "optional_counter")]
    pub listen_queue_len: Option<i64>,

    #[serde(rename = "idle processes", deserialize_with = "counter")]
    pub idle_processes: i64,

    #[serde(rename = "active processes", deserialize_with = "counter")]
    pub active_processes: i64,

    #[serde(default, rename = "total processes", deserialize_with = "optional_counter")]
    pub total_processes: Option<i64>,

    /// Highest number of simultaneously active processes since start.
    #[serde(rename = "max active processes", deserialize_with = "counter")]
    pub max_active_processes: i64,

    /// Times the pool hit `pm.max_children`.
    #[serde(rename = "max children reached", deserialize_with = "counter")]
    pub max_children_reached: i64,

    #[serde(rename = "slow requests", deserialize_with = "counter")]
    pub slow_requests: i64,

    /// Per-process table. Empty unless the full status was requested.
    #[serde(skip)]
    pub processes: Vec<ProcessRecord>,
}

impl StatusRecord {
    /// Returns true when the record carries a per-process table.
    pub fn is_full(&self) -> bool {
        !self.processes.is_empty()
    }
}

/// State of a worker process as reported by the status page.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum ProcessState {
    #[default]
    Idle,
    Running,
    ReadingHeaders,
    GettingRequestInfo,
    Finishing,
    Ending,
    /// Any state label this crate does not know about.
    Other(String),
}

impl ProcessState {
    /// Maps a wire label onto a state. Unknown labels are kept verbatim.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Idle" => Self::Idle,
            "Running" => Self::Running,
            "Reading headers" => Self::ReadingHeaders,
            "Getting request informations" => Self::GettingRequestInfo,
            "Finishing" => Self::Finishing,
            "Ending" => Self::Ending,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the wire label for this state.
    pub fn label(&self) -> &str {
        match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
            Self::ReadingHeaders => "Reading headers",
            Self::GettingRequestInfo => "Getting request informations",
            Self::Finishing => "Finishing",
            Self::Ending => "Ending",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ProcessState {
    fn from(s: String) -> Self {
        Self::from_label(&s)
    }
}

impl From<ProcessState> for String {
    fn from(state: ProcessState) -> Self {
        state.label().to_string()
    }
}

/// One row of the per-process table.
///
/// Only the pid and the three last-request quantities are required; the
/// rest is informational and may be missing from older servers.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct ProcessRecord {
    pub pid: u32,

    #[serde(default)]
    pub state: ProcessState,

    /// Process start time, seconds since epoch.
    #[serde(default, rename = "start time")]
    pub start_time: Option<i64>,

    #[serde(default, rename = "start since", deserialize_with = "optional_counter")]
    pub start_since: Option<i64>,

    /// Requests served by this process.
    #[serde(default, deserialize_with = "optional_counter")]
    pub requests: Option<i64>,

    /// Duration of the current or last request (microseconds).
    #[serde(rename = "request duration", deserialize_with = "counter")]
    pub request_duration: i64,

    #[serde(default, rename = "request method")]
    pub request_method: Option<String>,

    #[serde(default, rename = "request uri")]
    pub request_uri: Option<String>,

    #[serde(default, rename = "content length", deserialize_with = "optional_counter")]
    pub content_length: Option<i64>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub script: Option<String>,

    /// CPU used by the last request, percent truncated to an integer.
    #[serde(rename = "last request cpu", deserialize_with = "percentage")]
    pub last_request_cpu: i64,

    /// Memory peak of the last request (bytes).
    #[serde(rename = "last request memory", deserialize_with = "counter")]
    pub last_request_memory: i64,
}

fn counter<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = i64::deserialize(deserializer)?;
    if value < 0 {
        return Err(serde::de::Error::custom(format!(
            "negative counter: {}",
            value
        )));
    }
    Ok(value)
}

fn optional_counter<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    counter(deserializer).map(Some)
}

fn percentage<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    truncate_percentage(value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid percentage: {}", value)))
}

/// Truncates a non-negative finite float toward zero.
///
/// Returns `None` for negative, NaN, infinite or out-of-range input.
pub fn truncate_percentage(value: f64) -> Option<i64> {
    if !value.is_finite() || value < 0.0 || value >= i64::MAX as f64 {
        return None;
    }
    Some(value.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_state_labels() {
        assert_eq!(ProcessState::from_label("Idle"), ProcessState::Idle);
        assert_eq!(
            ProcessState::from_label("Reading headers"),
            ProcessState::ReadingHeaders
        );
        assert_eq!(
            ProcessState::from_label("Paused"),
            ProcessState::Other("Paused".to_string())
        );
        assert_eq!(ProcessState::Running.label(), "Running");
    }

    #[test]
    fn test_truncate_percentage() {
        assert_eq!(truncate_percentage(0.0), Some(0));
        assert_eq!(truncate_percentage(10.99), Some(10));
        assert_eq!(truncate_percentage(-0.5), None);
        assert_eq!(truncate_percentage(f64::NAN), None);
        assert_eq!(truncate_percentage(f64::INFINITY), None);
    }

    #[test]
    fn test_is_full() {
        let mut record = StatusRecord::default();
        assert!(!record.is_full());
        record.processes.push(ProcessRecord::default());
        assert!(record.is_full());
    }
}
