//! Parser for the plain-text status page.
//!
//! These are pure functions over the body text so they can be tested with
//! string inputs. The page is a run of `label: value` lines (the summary),
//! optionally followed by one block per worker process. Blocks are separated
//! by blank lines; php-fpm also prints a line of asterisks between them,
//! which is treated the same way.

use chrono::DateTime;
use tracing::debug;

use crate::models::status::truncate_percentage;
use crate::models::{ProcessRecord, ProcessState, StatusRecord};

/// Format of `start time` in the text page, e.g. `01/Feb/2019:18:23:27 +0000`.
const START_TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parses a text status page.
///
/// The summary block is all-or-nothing. Every following block is a process
/// row; a malformed or incomplete one is dropped on its own.
pub fn parse_status(content: &str) -> Result<StatusRecord, ParseError> {
    let mut blocks = split_blocks(content).into_iter();

    let summary = blocks
        .next()
        .ok_or_else(|| ParseError::new("empty status page"))?;
    let mut status = parse_summary(&summary)?;

    for (idx, block) in blocks.enumerate() {
        match parse_process(&block) {
            Ok(process) => status.processes.push(process),
            Err(e) => debug!(block = idx, error = %e, "dropping process block"),
        }
    }

    Ok(status)
}

/// Splits content into non-empty runs of trimmed lines.
fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.chars().all(|c| c == '*') {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

/// Splits `label: value` on the first colon. Values may contain colons.
fn split_line(line: &str) -> Result<(&str, &str), ParseError> {
    line.split_once(':')
        .map(|(label, value)| (label.trim(), value.trim()))
        .ok_or_else(|| ParseError::new(format!("expected 'label: value', got '{}'", line)))
}

fn parse_counter(value: &str, name: &str) -> Result<i64, ParseError> {
    match value.parse::<i64>() {
        Ok(v) if v >= 0 => Ok(v),
        _ => Err(ParseError::new(format!("invalid {}: '{}'", name, value))),
    }
}

fn parse_start_time(value: &str) -> Option<i64> {
    DateTime::parse_from_str(value, START_TIME_FORMAT)
        .map(|dt| dt.timestamp())
        .ok()
}

fn require<T>(value: Option<T>, name: &str) -> Result<T, ParseError> {
    value.ok_or_else(|| ParseError::new(format!("missing {}", name)))
}

fn parse_summary(lines: &[&str]) -> Result<StatusRecord, ParseError> {
    let mut status = StatusRecord::default();

    let mut accepted_conn = None;
    let mut idle_processes = None;
    let mut active_processes = None;
    let mut max_active_processes = None;
    let mut max_children_reached = None;
    let mut slow_requests = None;

    // lines that are not `label: value` are skipped like unknown labels
    for (label, value) in lines.iter().filter_map(|line| split_line(line).ok()) {
        match label {
            "pool" => status.pool = Some(value.to_string()),
            "process manager" => status.process_manager = Some(value.to_string()),
            "start time" => status.start_time = parse_start_time(value),
            "start since" => status.start_since = Some(parse_counter(value, label)?),
            "accepted conn" => accepted_conn = Some(parse_counter(value, label)?),
            "listen queue" => status.listen_queue = Some(parse_counter(value, label)?),
            "max listen queue" => status.max_listen_queue = Some(parse_counter(value, label)?),
            "listen queue len" => status.listen_queue_len = Some(parse_counter(value, label)?),
            "idle processes" => idle_processes = Some(parse_counter(value, label)?),
            "active processes" => active_processes = Some(parse_counter(value, label)?),
            "total processes" => status.total_processes = Some(parse_counter(value, label)?),
            "max active processes" => max_active_processes = Some(parse_counter(value, label)?),
            "max children reached" => max_children_reached = Some(parse_counter(value, label)?),
            "slow requests" => slow_requests = Some(parse_counter(value, label)?),
            _ => {}
        }
    }

    status.accepted_conn = require(accepted_conn, "accepted conn")?;
    status.idle_processes = require(idle_processes, "idle processes")?;
    status.active_processes = require(active_processes, "active processes")?;
    status.max_active_processes = require(max_active_processes, "max active processes")?;
    status.max_children_reached = require(max_children_reached, "max children reached")?;
    status.slow_requests = require(slow_requests, "slow requests")?;

    Ok(status)
}

fn parse_process(lines: &[&str]) -> Result<ProcessRecord, ParseError> {
    let mut process = ProcessRecord::default();

    let mut pid = None;
    let mut request_duration = None;
    let mut last_request_cpu = None;
    let mut last_request_memory = None;

    for line in lines {
        let (label, value) = split_line(line)?;
        match label {
            "pid" => {
                pid = Some(
                    value
                        .parse::<u32>()
                        .map_err(|_| ParseError::new(format!("invalid pid: '{}'", value)))?,
                )
            }
            "state" => process.state = ProcessState::from_label(value),
            "start time" => process.start_time = parse_start_time(value),
            "start since" => process.start_since = Some(parse_counter(value, label)?),
            "requests" => process.requests = Some(parse_counter(value, label)?),
            "request duration" => request_duration = Some(parse_counter(value, label)?),
            "request method" => process.request_method = Some(value.to_string()),
            "request URI" | "request uri" => process.request_uri = Some(value.to_string()),
            "content length" => process.content_length = Some(parse_counter(value, label)?),
            "user" => process.user = Some(value.to_string()),
            "script" => process.script = Some(value.to_string()),
            "last request cpu" => {
                let cpu = value
                    .parse::<f64>()
                    .ok()
                    .and_then(truncate_percentage)
                    .ok_or_else(|| {
                        ParseError::new(format!("invalid last request cpu: '{}'", value))
                    })?;
                last_request_cpu = Some(cpu);
            }
            "last request memory" => last_request_memory = Some(parse_counter(value, label)?),
            _ => {}
        }
    }

    process.pid = require(pid, "pid")?;
    process.request_duration = require(request_duration, "request duration")?;
    process.last_request_cpu = require(last_request_cpu, "last request cpu")?;
    process.last_request_memory = require(last_request_memory, "last request memory")?;

    Ok(process)
}
