//! Data models shared by the decoders and the metric assembler.

pub mod status;

pub use status::{ProcessRecord, ProcessState, StatusRecord};
