//! Decoder for the JSON status page (`?json`).
//!
//! The summary members are decoded strictly into [`StatusRecord`]; the
//! optional `processes` array is decoded element by element so that one
//! malformed row does not throw away the rest of the poll.

use serde_json::Value;
use tracing::debug;

use crate::models::{ProcessRecord, StatusRecord};

/// Member holding the per-process table.
const PROCESSES_KEY: &str = "processes";

/// Decodes a JSON status body.
///
/// The process table is read whenever the body carries one; `null` counts
/// as absent.
pub fn decode_status(body: &[u8]) -> Result<StatusRecord, serde_json::Error> {
    let mut root: serde_json::Map<String, Value> = serde_json::from_slice(body)?;
    let processes = root.remove(PROCESSES_KEY);

    let mut status: StatusRecord = serde_json::from_value(Value::Object(root))?;

    match processes {
        None | Some(Value::Null) => {}
        Some(processes) => {
            let rows: Vec<Value> = serde_json::from_value(processes)?;
            status.processes = decode_processes(rows);
        }
    }

    Ok(status)
}

fn decode_processes(rows: Vec<Value>) -> Vec<ProcessRecord> {
    rows.into_iter()
        .enumerate()
        .filter_map(
            |(idx, row)| match serde_json::from_value::<ProcessRecord>(row) {
                Ok(process) => Some(process),
                Err(e) => {
                    debug!(row = idx, error = %e, "dropping malformed process row");
                    None
                }
            },
        )
        .collect()
}
