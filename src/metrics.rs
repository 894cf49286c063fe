//! Metric aggregation and assembly.
//!
//! Turns a decoded [`StatusRecord`] into one of exactly two output shapes:
//!
//! - [`Metrics::Basic`] — six pool counters
//! - [`Metrics::Full`] — the same six plus min/max/avg over the process table
//!
//! The shape is decided by the process table alone: an empty table always
//! yields `Basic`, so full-mode keys are either all present or all absent.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{ProcessRecord, StatusRecord};

/// Pool counters present in every successful poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BasicMetrics {
    pub active: i64,
    pub idle: i64,
    #[serde(rename = "maxActive")]
    pub max_active: i64,
    pub reached: i64,
    pub requests: i64,
    pub slow: i64,
}

impl BasicMetrics {
    /// Number of keys in the basic shape.
    pub const KEYS: usize = 6;

    pub fn from_status(status: &StatusRecord) -> Self {
        Self {
            active: status.active_processes,
            idle: status.idle_processes,
            max_active: status.max_active_processes,
            reached: status.max_children_reached,
            requests: status.accepted_conn,
            slow: status.slow_requests,
        }
    }
}

/// Min, max and truncated mean of one quantity over the process table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Span {
    pub min: i64,
    pub max: i64,
    pub avg: i64,
}

impl Span {
    /// Reduces `values` into a span. Returns `None` for an empty input.
    ///
    /// The mean is `sum / count` with integer division. The sum is carried
    /// in `i128` so it cannot overflow for any realistic table size.
    pub fn over(values: impl IntoIterator<Item = i64>) -> Option<Self> {
        let mut iter = values.into_iter();
        let first = iter.next()?;

        let mut min = first;
        let mut max = first;
        let mut sum = first as i128;
        let mut count: i128 = 1;

        for v in iter {
            min = min.min(v);
            max = max.max(v);
            sum += v as i128;
            count += 1;
        }

        // mean of values in [min, max] stays in [min, max], so it fits i64
        let avg = (sum / count) as i64;
        Some(Self { min, max, avg })
    }
}

/// Aggregates over the per-process table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessMetrics {
    /// Last-request CPU, percent.
    pub cpu: Span,
    /// Last-request duration, microseconds.
    pub duration: Span,
    /// Last-request memory, bytes.
    pub memory: Span,
}

impl ProcessMetrics {
    /// Number of keys the process aggregates add to the output.
    pub const KEYS: usize = 9;

    /// Aggregates every process exactly once. `None` when the table is empty.
    pub fn from_processes(processes: &[ProcessRecord]) -> Option<Self> {
        Some(Self {
            cpu: Span::over(processes.iter().map(|p| p.last_request_cpu))?,
            duration: Span::over(processes.iter().map(|p| p.request_duration))?,
            memory: Span::over(processes.iter().map(|p| p.last_request_memory))?,
        })
    }
}

/// Output of one successful poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metrics {
    Basic(BasicMetrics),
    Full(BasicMetrics, ProcessMetrics),
}

impl Metrics {
    /// Assembles metrics from a decoded status record.
    pub fn assemble(status: &StatusRecord) -> Self {
        let basic = BasicMetrics::from_status(status);
        match ProcessMetrics::from_processes(&status.processes) {
            Some(processes) => Metrics::Full(basic, processes),
            None => Metrics::Basic(basic),
        }
    }

    pub fn basic(&self) -> &BasicMetrics {
        match self {
            Metrics::Basic(b) | Metrics::Full(b, _) => b,
        }
    }

    pub fn processes(&self) -> Option<&ProcessMetrics> {
        match self {
            Metrics::Basic(_) => None,
            Metrics::Full(_, p) => Some(p),
        }
    }

    /// Number of keys `to_map` produces: 6 or 15.
    pub fn len(&self) -> usize {
        match self {
            Metrics::Basic(_) => BasicMetrics::KEYS,
            Metrics::Full(..) => BasicMetrics::KEYS + ProcessMetrics::KEYS,
        }
    }

    /// Never true; present for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Flattens the metrics into the fixed key vocabulary.
    pub fn to_map(&self) -> BTreeMap<&'static str, i64> {
        let b = self.basic();
        let mut map = BTreeMap::from([
            ("active", b.active),
            ("idle", b.idle),
            ("maxActive", b.max_active),
            ("reached", b.reached),
            ("requests", b.requests),
            ("slow", b.slow),
        ]);

        if let Some(p) = self.processes() {
            map.extend([
                ("minReqCpu", p.cpu.min),
                ("maxReqCpu", p.cpu.max),
                ("avgReqCpu", p.cpu.avg),
                ("minReqDur", p.duration.min),
                ("maxReqDur", p.duration.max),
                ("avgReqDur", p.duration.avg),
                ("minReqMem", p.memory.min),
                ("maxReqMem", p.memory.max),
                ("avgReqMem", p.memory.avg),
            ]);
        }

        map
    }
}

impl Serialize for Metrics {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}
