//! Chunk endpoint abstraction.
//!
//! The retrieval protocol is transport-agnostic: `ChunkEndpoint` is the
//! seam, `HttpChunkEndpoint` the production implementation. Tests provide
//! fixture endpoints with scripted responses.

use std::future::Future;
use std::pin::Pin;

use crate::protocol::{ApiEnvelope, ChunkRequest};

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Network-level failure (connection, HTTP status, timeout).
    Transport(String),
    /// Application-level error field in a transport-successful response.
    Api { code: String, info: String },
    /// Response body did not match the expected envelope.
    Decode(String),
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::Transport(msg) => write!(f, "chunk transport failed: {msg}"),
            StreamError::Api { code, info } => write!(f, "chunk endpoint error {code}: {info}"),
            StreamError::Decode(msg) => write!(f, "chunk response malformed: {msg}"),
        }
    }
}

impl std::error::Error for StreamError {}

/// One chunk fetch. Methods return boxed futures for dyn-compatibility.
pub trait ChunkEndpoint: Send + Sync {
    fn fetch(&self, request: ChunkRequest) -> BoxFuture<'_, Result<ApiEnvelope, StreamError>>;
}

/// HTTP implementation over a query-style endpoint.
#[derive(Debug, Clone)]
pub struct HttpChunkEndpoint {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChunkEndpoint {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl ChunkEndpoint for HttpChunkEndpoint {
    fn fetch(&self, request: ChunkRequest) -> BoxFuture<'_, Result<ApiEnvelope, StreamError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(&self.base_url)
                .query(&[("action", "querydatamap"), ("format", "json")])
                .query(&request)
                .send()
                .await
                .map_err(|e| StreamError::Transport(e.to_string()))?
                .error_for_status()
                .map_err(|e| StreamError::Transport(e.to_string()))?;
            response
                .json::<ApiEnvelope>()
                .await
                .map_err(|e| StreamError::Decode(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::StreamError;

    #[test]
    fn error_display_names_the_failure_class() {
        let transport = StreamError::Transport("connection refused".to_string());
        assert!(transport.to_string().contains("transport"));

        let api = StreamError::Api {
            code: "badtitle".to_string(),
            info: "no such page".to_string(),
        };
        assert!(api.to_string().contains("badtitle"));
    }
}
