//! Selects the decode path for a poll.
//!
//! php-fpm picks its output from query parameters on the status URL:
//! `?json` switches the body to JSON and `?full` appends the per-process
//! table. The same flags tell us how to read the answer, so the choice is
//! made from the URL once, before any byte of the body is looked at.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Wire format of the status body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    #[default]
    Text,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "text" | "plain" => Ok(Format::Text),
            other => Err(format!("unknown format '{}', expected json or text", other)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => write!(f, "json"),
            Format::Text => write!(f, "text"),
        }
    }
}

/// Whether the per-process table was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Detail {
    #[default]
    Basic,
    Full,
}

/// Decode plan for one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestMode {
    pub format: Format,
    pub detail: Detail,
}

impl RequestMode {
    /// Derives the mode from the `json` and `full` query keys of `url`.
    ///
    /// Keys match with or without a value. The fragment is ignored.
    pub fn from_url(url: &str) -> Self {
        let without_fragment = url.split('#').next().unwrap_or_default();
        let query = without_fragment
            .split_once('?')
            .map(|(_, q)| q)
            .unwrap_or_default();

        let mut mode = RequestMode::default();
        for pair in query.split('&') {
            let key = pair.split('=').next().unwrap_or_default();
            match key {
                "json" => mode.format = Format::Json,
                "full" => mode.detail = Detail::Full,
                _ => {}
            }
        }
        mode
    }

    /// Replaces the URL-derived format when an explicit one is configured.
    pub fn with_format(mut self, format: Option<Format>) -> Self {
        if let Some(format) = format {
            self.format = format;
        }
        self
    }

    pub fn is_full(&self) -> bool {
        self.detail == Detail::Full
    }
}
