//! Abstraction over the HTTP fetch so the pipeline can be tested without a server.
//!
//! The `Fetcher` trait lets the collector poll a real status endpoint or a
//! mock implementation that returns canned bodies.

use std::io::Read;
use std::time::Duration;

/// Raw result of one successful HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchResponse {
    pub status: u16,
    /// Media type without parameters, e.g. `application/json`. Empty if absent.
    pub content_type: String,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Error type for fetch failures.
#[derive(Debug)]
pub enum FetchError {
    /// Connection refused, DNS failure, timeout and the like.
    Transport(String),
    /// Server answered with a status outside 200–299.
    Status(u16),
    /// Failure while reading the response body.
    Io(std::io::Error),
    /// Body exceeded the configured limit (bytes).
    BodyTooLarge(usize),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport error: {}", msg),
            FetchError::Status(code) => write!(f, "unexpected HTTP status {}", code),
            FetchError::Io(e) => write!(f, "I/O error: {}", e),
            FetchError::BodyTooLarge(limit) => {
                write!(f, "response body exceeds {} bytes", limit)
            }
        }
    }
}

impl std::error::Error for FetchError {}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e)
    }
}

/// Performs one GET against a status endpoint.
///
/// Implementations return `Ok` for any HTTP answer they managed to read,
/// including non-2xx ones; status validation is the collector's job.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// Blocking HTTP fetcher backed by a `ureq` agent.
///
/// The agent is built once with the overall request timeout and reused for
/// every poll.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    max_body_size: usize,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration, max_body_size: usize) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();
        Self {
            agent,
            max_body_size,
        }
    }

    fn read_response(&self, response: ureq::Response) -> Result<FetchResponse, FetchError> {
        let status = response.status();
        let content_type = response.content_type().to_string();

        let body = read_limited(response.into_reader(), self.max_body_size)?;

        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Reads the whole body, failing once it grows past `limit` bytes.
fn read_limited(reader: impl Read, limit: usize) -> Result<Vec<u8>, FetchError> {
    let mut body = Vec::new();
    reader
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut body)?;
    if body.len() > limit {
        return Err(FetchError::BodyTooLarge(limit));
    }
    Ok(body)
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        match self.agent.get(url).call() {
            Ok(response) => self.read_response(response),
            // ureq turns 4xx/5xx into errors; hand them back as responses
            Err(ureq::Error::Status(_, response)) => self.read_response(response),
            Err(ureq::Error::Transport(t)) => Err(FetchError::Transport(t.to_string())),
        }
    }
}
