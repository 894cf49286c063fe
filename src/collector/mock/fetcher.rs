//! In-memory fetcher that serves canned responses.

use std::collections::HashMap;

use crate::collector::traits::{FetchError, FetchResponse, Fetcher};

#[derive(Debug, Clone)]
enum Canned {
    Response(FetchResponse),
    TransportError(String),
}

/// Fetcher that answers from a URL → response table.
///
/// Unknown URLs fail with a transport error, like an unreachable host.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    responses: HashMap<String, Canned>,
}

impl MockFetcher {
    /// Creates a fetcher with no URLs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a full HTTP response for `url`.
    pub fn add_response(
        &mut self,
        url: impl Into<String>,
        status: u16,
        content_type: &str,
        body: impl Into<Vec<u8>>,
    ) {
        self.responses.insert(
            url.into(),
            Canned::Response(FetchResponse {
                status,
                content_type: content_type.to_string(),
                body: body.into(),
            }),
        );
    }

    /// Adds a `200 OK` response for `url`.
    pub fn add_body(&mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.add_response(url, 200, "text/plain", body);
    }

    /// Makes `url` fail as if the connection could not be made.
    pub fn add_transport_error(&mut self, url: impl Into<String>, message: impl Into<String>) {
        self.responses
            .insert(url.into(), Canned::TransportError(message.into()));
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        match self.responses.get(url) {
            Some(Canned::Response(resp)) => Ok(resp.clone()),
            Some(Canned::TransportError(msg)) => Err(FetchError::Transport(msg.clone())),
            None => Err(FetchError::Transport(format!("connection refused: {}", url))),
        }
    }
}
