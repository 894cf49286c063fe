//! php-fpm status page collector.
//!
//! One poll runs the whole pipeline synchronously:
//!
//! ```text
//! fetch ─► check status ─► select format ─┬─► json::decode_status ──┬─► Metrics::assemble
//!                                          └─► parser::parse_status ─┘
//! ```
//!
//! Every failure short-circuits to "no metrics" for that poll. Nothing is
//! kept between polls: each call builds a fresh `StatusRecord` and drops it
//! once the metrics are assembled.

pub mod format;
pub mod json;
pub mod parser;

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::collector::traits::{FetchError, Fetcher, HttpFetcher};
use crate::config::{CollectorConfig, ConfigError};
use crate::metrics::Metrics;
use crate::models::StatusRecord;
use format::{Format, RequestMode};
use parser::ParseError;

/// Error type for body decoding failures.
#[derive(Debug)]
pub enum DecodeError {
    /// Body was empty or whitespace only.
    Empty,
    /// Text body was not valid UTF-8.
    Utf8(std::str::Utf8Error),
    Json(serde_json::Error),
    Text(ParseError),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "empty response body"),
            DecodeError::Utf8(e) => write!(f, "body is not UTF-8: {}", e),
            DecodeError::Json(e) => write!(f, "invalid JSON status: {}", e),
            DecodeError::Text(e) => write!(f, "invalid text status: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::Json(e)
    }
}

impl From<ParseError> for DecodeError {
    fn from(e: ParseError) -> Self {
        DecodeError::Text(e)
    }
}

impl From<std::str::Utf8Error> for DecodeError {
    fn from(e: std::str::Utf8Error) -> Self {
        DecodeError::Utf8(e)
    }
}

/// Error type for a failed poll.
#[derive(Debug)]
pub enum CollectError {
    Fetch(FetchError),
    Decode(DecodeError),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Fetch(e) => write!(f, "fetch failed: {}", e),
            CollectError::Decode(e) => write!(f, "decode failed: {}", e),
        }
    }
}

impl std::error::Error for CollectError {}

impl From<FetchError> for CollectError {
    fn from(e: FetchError) -> Self {
        CollectError::Fetch(e)
    }
}

impl From<DecodeError> for CollectError {
    fn from(e: DecodeError) -> Self {
        CollectError::Decode(e)
    }
}

/// Decodes a status body in the given format.
///
/// The process table is decoded whenever the body has one, regardless of
/// whether it was asked for.
pub fn decode(body: &[u8], format: Format) -> Result<StatusRecord, DecodeError> {
    if body.trim_ascii().is_empty() {
        return Err(DecodeError::Empty);
    }

    let status = match format {
        Format::Json => json::decode_status(body)?,
        Format::Text => parser::parse_status(std::str::from_utf8(body)?)?,
    };
    Ok(status)
}

/// Polls one status page and turns it into [`Metrics`].
pub struct StatusCollector<F: Fetcher> {
    fetcher: F,
    url: String,
    mode: RequestMode,
}

impl StatusCollector<HttpFetcher> {
    /// Validates `config` and builds a collector with a real HTTP client.
    pub fn from_config(config: &CollectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let fetcher = HttpFetcher::new(config.timeout, config.max_body_size);
        Ok(Self::new(fetcher, config))
    }
}

impl<F: Fetcher> StatusCollector<F> {
    /// Creates a collector on top of any fetcher.
    ///
    /// The decode path is fixed here, once, from the URL and the optional
    /// format override.
    pub fn new(fetcher: F, config: &CollectorConfig) -> Self {
        let mode = RequestMode::from_url(&config.url).with_format(config.format);
        trace!(
            url = %config.url,
            format = %mode.format,
            detail = ?mode.detail,
            "decode path selected"
        );
        Self {
            fetcher,
            url: config.url.clone(),
            mode,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    /// Runs one poll, reporting why it failed.
    pub fn try_collect(&self) -> Result<Metrics, CollectError> {
        let response = self.fetcher.fetch(&self.url)?;
        if !response.is_success() {
            return Err(FetchError::Status(response.status).into());
        }

        let status = decode(&response.body, self.mode.format)?;
        if self.mode.is_full() && !status.is_full() {
            debug!(url = %self.url, "full status requested but no process rows decoded");
        }

        Ok(Metrics::assemble(&status))
    }

    /// Runs one poll. Any failure yields `None`.
    pub fn collect(&self) -> Option<Metrics> {
        match self.try_collect() {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                debug!(url = %self.url, error = %e, "poll yielded no metrics");
                None
            }
        }
    }

    /// Runs one poll and flattens the result into the output key set.
    ///
    /// Returns an empty map when the poll failed.
    pub fn collect_map(&self) -> BTreeMap<&'static str, i64> {
        self.collect().map(|m| m.to_map()).unwrap_or_default()
    }

    /// Returns true if the endpoint currently yields metrics.
    pub fn check(&self) -> bool {
        self.collect().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockFetcher, scenarios};

    fn collector(fetcher: MockFetcher, url: &str) -> StatusCollector<MockFetcher> {
        StatusCollector::new(fetcher, &CollectorConfig::new(url))
    }

    fn expected(pairs: &[(&'static str, i64)]) -> BTreeMap<&'static str, i64> {
        pairs.iter().copied().collect()
    }

    const FULL_AGGREGATES: [(&str, i64); 9] = [
        ("minReqCpu", 0),
        ("maxReqCpu", 10),
        ("avgReqCpu", 5),
        ("minReqDur", 834),
        ("maxReqDur", 919),
        ("avgReqDur", 876),
        ("minReqMem", 2093045),
        ("maxReqMem", 2097152),
        ("avgReqMem", 2095098),
    ];

    #[test]
    fn test_collect_json() {
        let url = "http://127.0.0.1/status?json";
        let got = collector(MockFetcher::typical_pool(), url).collect_map();

        let want = expected(&[
            ("active", 1),
            ("idle", 1),
            ("maxActive", 1),
            ("reached", 0),
            ("requests", 21),
            ("slow", 0),
        ]);
        assert_eq!(got, want);
    }

    #[test]
    fn test_collect_json_minimal_body() {
        let url = "http://127.0.0.1/status?json";
        let body = r#"{"active processes":1,"idle processes":1,"max active processes":1,"max children reached":0,"accepted conn":21,"slow requests":0}"#;
        let got = collector(MockFetcher::serving(url, body), url).collect_map();

        assert_eq!(got.len(), 6);
        assert_eq!(got["requests"], 21);
    }

    #[test]
    fn test_collect_json_full() {
        let url = "http://127.0.0.1/status?full&json";
        let got = collector(MockFetcher::typical_pool(), url).collect_map();

        let mut want = expected(&[
            ("active", 1),
            ("idle", 1),
            ("maxActive", 1),
            ("reached", 0),
            ("requests", 22),
            ("slow", 0),
        ]);
        want.extend(FULL_AGGREGATES);
        assert_eq!(got, want);
    }

    #[test]
    fn test_collect_text() {
        let url = "http://127.0.0.1/status";
        let got = collector(MockFetcher::typical_pool(), url).collect_map();

        let want = expected(&[
            ("active", 1),
            ("idle", 1),
            ("maxActive", 1),
            ("reached", 0),
            ("requests", 19),
            ("slow", 0),
        ]);
        assert_eq!(got, want);
    }

    #[test]
    fn test_collect_text_full() {
        let url = "http://127.0.0.1/status?full";
        let got = collector(MockFetcher::typical_pool(), url).collect_map();

        let mut want = expected(&[
            ("active", 1),
            ("idle", 1),
            ("maxActive", 1),
            ("reached", 0),
            ("requests", 20),
            ("slow", 0),
        ]);
        want.extend(FULL_AGGREGATES);
        assert_eq!(got, want);
    }

    #[test]
    fn test_collect_json_full_without_full_flag() {
        let url = "http://127.0.0.1/?json";
        let fetcher = MockFetcher::serving(url, scenarios::STATUS_FULL_JSON);
        let got = collector(fetcher, url).collect_map();

        let mut want = expected(&[
            ("active", 1),
            ("idle", 1),
            ("maxActive", 1),
            ("reached", 0),
            ("requests", 22),
            ("slow", 0),
        ]);
        want.extend(FULL_AGGREGATES);
        assert_eq!(got, want);
    }

    #[test]
    fn test_collect_text_full_without_full_flag() {
        let url = "http://127.0.0.1/";
        let fetcher = MockFetcher::serving(url, scenarios::STATUS_FULL_TEXT);
        let metrics = collector(fetcher, url).collect().unwrap();

        assert!(matches!(metrics, Metrics::Full(..)));
        assert_eq!(metrics.len(), 15);
        assert_eq!(metrics.basic().requests, 20);
        assert_eq!(metrics.to_map()["avgReqDur"], 876);
    }

    #[test]
    fn test_collect_json_null_processes() {
        let url = "http://127.0.0.1/status?full&json";
        let body = r#"{"active processes":1,"idle processes":1,"max active processes":1,"max children reached":0,"accepted conn":21,"slow requests":0,"processes":null}"#;
        let got = collector(MockFetcher::serving(url, body), url).collect_map();

        assert_eq!(got.len(), 6);
        assert_eq!(got["requests"], 21);
    }

    #[test]
    fn test_format_override() {
        let url = "http://127.0.0.1/status?full";
        let fetcher = MockFetcher::serving(url, scenarios::STATUS_FULL_JSON);
        let config = CollectorConfig::new(url).with_format(Some(Format::Json));

        let got = StatusCollector::new(fetcher, &config).collect_map();
        assert_eq!(got.len(), 15);
        assert_eq!(got["requests"], 22);
    }

    #[test]
    fn test_bad_process_row_keeps_siblings() {
        let url = "http://127.0.0.1/status?full";
        let body = scenarios::STATUS_FULL_TEXT.replace(
            "last request memory:  2097152",
            "last request memory:  lots",
        );
        let got = collector(MockFetcher::serving(url, &body), url).collect_map();

        assert_eq!(got.len(), 15);
        assert_eq!(got["requests"], 20);
        assert_eq!(got["minReqDur"], 834);
        assert_eq!(got["maxReqDur"], 834);
        assert_eq!(got["avgReqDur"], 834);
        assert_eq!(got["avgReqMem"], 2093045);
    }

    #[test]
    fn test_all_process_rows_bad_falls_back_to_basic() {
        let url = "http://127.0.0.1/status?full";
        let body = scenarios::STATUS_FULL_TEXT.replace("last request cpu:", "last request cpu: x");
        let got = collector(MockFetcher::serving(url, &body), url).collect_map();

        assert_eq!(got.len(), 6);
        assert!(!got.contains_key("avgReqCpu"));
    }

    #[test]
    fn test_collect_garbage() {
        let url = "http://127.0.0.1/status";
        let fetcher = MockFetcher::serving(url, scenarios::GARBAGE);
        assert!(collector(fetcher, url).collect_map().is_empty());

        let url = "http://127.0.0.1/status?json";
        let fetcher = MockFetcher::serving(url, scenarios::GARBAGE);
        assert!(collector(fetcher, url).collect_map().is_empty());
    }

    #[test]
    fn test_collect_empty_body() {
        let url = "http://127.0.0.1/status";
        let c = collector(MockFetcher::serving(url, ""), url);
        assert!(c.collect_map().is_empty());
        assert!(matches!(
            c.try_collect(),
            Err(CollectError::Decode(DecodeError::Empty))
        ));
    }

    #[test]
    fn test_collect_bad_status_code() {
        let url = "http://127.0.0.1/status";
        let mut fetcher = MockFetcher::new();
        fetcher.add_response(url, 404, "text/html", scenarios::STATUS_TEXT);
        let c = collector(fetcher, url);

        assert!(c.collect_map().is_empty());
        assert!(matches!(
            c.try_collect(),
            Err(CollectError::Fetch(FetchError::Status(404)))
        ));
    }

    #[test]
    fn test_collect_transport_error() {
        let url = "http://127.0.0.1:38001/us";
        let mut fetcher = MockFetcher::new();
        fetcher.add_transport_error(url, "connection refused");
        let c = collector(fetcher, url);

        assert!(c.collect_map().is_empty());
        assert!(!c.check());
    }

    #[test]
    fn test_check() {
        let url = "http://127.0.0.1/status";
        assert!(collector(MockFetcher::typical_pool(), url).check());
    }

    #[test]
    fn test_collect_non_utf8_text() {
        let url = "http://127.0.0.1/status";
        let mut fetcher = MockFetcher::new();
        fetcher.add_body(url, vec![0xff, 0xfe, b':', b'1']);
        let c = collector(fetcher, url);

        assert!(matches!(
            c.try_collect(),
            Err(CollectError::Decode(DecodeError::Utf8(_)))
        ));
    }

    #[test]
    fn test_polls_are_independent() {
        let url = "http://127.0.0.1/status?full&json";
        let c = collector(MockFetcher::typical_pool(), url);
        let first = c.collect_map();
        let second = c.collect_map();
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_config_validates() {
        assert!(StatusCollector::from_config(&CollectorConfig::new("")).is_err());

        let collector = StatusCollector::from_config(&CollectorConfig::default()).unwrap();
        assert_eq!(collector.url(), "http://127.0.0.1/status?full&json");
        assert_eq!(collector.mode().format, Format::Json);
        assert!(collector.mode().is_full());
    }
}
