//! Chunk retrieval client.
//!
//! `MarkerStreamer` wraps an endpoint with retry/backoff and drives the two
//! load shapes: ad hoc single chunks and sequential continuation-cursor
//! chains. It knows nothing about the visibility engine or coordinate
//! system; chunks are handed to a `ChunkConsumer`.

use std::time::Duration;

use tracing::warn;

use crate::endpoint::{ChunkEndpoint, StreamError};
use crate::instantiate::ChunkConsumer;
use crate::protocol::{ChunkRequest, ChunkResult};

const DEFAULT_RETRIES: u32 = 2;
const DEFAULT_WAIT: Duration = Duration::from_millis(60);

#[derive(Debug)]
pub struct MarkerStreamer<E> {
    endpoint: E,
    retry_budget: u32,
    initial_wait: Duration,
}

impl<E: ChunkEndpoint> MarkerStreamer<E> {
    pub fn new(endpoint: E) -> Self {
        Self {
            endpoint,
            retry_budget: DEFAULT_RETRIES,
            initial_wait: DEFAULT_WAIT,
        }
    }

    pub fn with_retry_policy(mut self, retries: u32, initial_wait: Duration) -> Self {
        self.retry_budget = retries;
        self.initial_wait = initial_wait;
        self
    }

    /// One network call, no retries. An application-level error field in a
    /// transport-successful response surfaces as `Err`.
    pub async fn request_chunk(&self, request: ChunkRequest) -> Result<ChunkResult, StreamError> {
        self.endpoint.fetch(request).await?.into_result()
    }

    /// `request_chunk` with fault tolerance: transient failures are retried
    /// up to the configured budget, waiting `initial_wait` and doubling per
    /// attempt. After exhausting retries the failure propagates unchanged.
    pub async fn call_reliable(&self, request: ChunkRequest) -> Result<ChunkResult, StreamError> {
        let mut retries_left = self.retry_budget;
        let mut wait = self.initial_wait;
        loop {
            match self.request_chunk(request.clone()).await {
                Ok(result) => return Ok(result),
                Err(error) if retries_left > 0 => {
                    warn!(%error, retries_left, "chunk request failed, retrying");
                    tokio::time::sleep(wait).await;
                    wait *= 2;
                    retries_left -= 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Load exactly one chunk (e.g. per active filter set or sector) and
    /// finish the consumer.
    pub async fn load_chunk<C: ChunkConsumer>(
        &self,
        request: ChunkRequest,
        consumer: &mut C,
    ) -> Result<(), StreamError> {
        let result = self.call_reliable(request).await?;
        consumer.chunk(&result.markers);
        consumer.done();
        Ok(())
    }

    /// Load chunks sequentially, following continuation cursors until the
    /// chain terminates. Each chunk is fully consumed before the next
    /// request is issued, so instantiation order is deterministic per layer.
    /// The consumer's `done` runs exactly once, after the final chunk.
    ///
    /// Returns the number of chunks loaded. Cancellation is cooperative
    /// only: dropping the returned future abandons the chain between
    /// network round-trips.
    pub async fn load_sequential<C: ChunkConsumer>(
        &self,
        request: ChunkRequest,
        consumer: &mut C,
    ) -> Result<u32, StreamError> {
        let mut request = request;
        if request.continue_from.is_none() {
            request.continue_from = Some(0);
        }
        let mut chunks = 0u32;
        loop {
            let result = self.call_reliable(request.clone()).await?;
            consumer.chunk(&result.markers);
            chunks += 1;
            match result.continue_cursor {
                Some(next) => request.continue_from = Some(next),
                None => {
                    consumer.done();
                    return Ok(chunks);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MarkerStreamer;
    use crate::endpoint::{BoxFuture, ChunkEndpoint, StreamError};
    use crate::instantiate::ChunkConsumer;
    use crate::protocol::{ApiEnvelope, ChunkMarkers, ChunkRequest};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn short_retry<E: ChunkEndpoint>(endpoint: E) -> MarkerStreamer<E> {
        MarkerStreamer::new(endpoint).with_retry_policy(2, Duration::from_millis(1))
    }

    fn envelope(json: &str) -> ApiEnvelope {
        serde_json::from_str(json).unwrap()
    }

    /// Fails the first `failures` calls, then serves scripted envelopes.
    struct FlakyEndpoint {
        failures: u32,
        calls: AtomicU32,
        responses: Mutex<Vec<ApiEnvelope>>,
    }

    impl FlakyEndpoint {
        fn new(failures: u32, responses: Vec<ApiEnvelope>) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                responses: Mutex::new(responses),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ChunkEndpoint for FlakyEndpoint {
        fn fetch(&self, _request: ChunkRequest) -> BoxFuture<'_, Result<ApiEnvelope, StreamError>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if call < self.failures {
                    return Err(StreamError::Transport("connection reset".to_string()));
                }
                let mut responses = self.responses.lock().unwrap();
                if responses.is_empty() {
                    return Err(StreamError::Transport("fixture exhausted".to_string()));
                }
                Ok(responses.remove(0))
            })
        }
    }

    /// Serves chunks keyed by the request's continuation cursor.
    struct ChainedEndpoint;

    impl ChunkEndpoint for ChainedEndpoint {
        fn fetch(&self, request: ChunkRequest) -> BoxFuture<'_, Result<ApiEnvelope, StreamError>> {
            Box::pin(async move {
                let raw = match request.continue_from {
                    Some(0) => r#"{ "query": { "markers": { "chunk-0": [[0.0, 0.0, null]] }, "continue": 1 } }"#,
                    Some(1) => r#"{ "query": { "markers": { "chunk-1": [[1.0, 1.0, null]] }, "continue": 2 } }"#,
                    Some(2) => r#"{ "query": { "markers": { "chunk-2": [[2.0, 2.0, null]] } } }"#,
                    other => panic!("unexpected cursor {other:?}"),
                };
                Ok(serde_json::from_str(raw).unwrap())
            })
        }
    }

    #[derive(Default)]
    struct RecordingConsumer {
        chunk_keys: Vec<String>,
        done_count: u32,
    }

    impl ChunkConsumer for RecordingConsumer {
        fn chunk(&mut self, markers: &ChunkMarkers) {
            self.chunk_keys.extend(markers.keys().cloned());
        }

        fn done(&mut self) {
            self.done_count += 1;
        }
    }

    #[tokio::test]
    async fn call_reliable_recovers_from_transient_failures() {
        let endpoint = FlakyEndpoint::new(
            2,
            vec![envelope(r#"{ "query": { "markers": {} } }"#)],
        );
        let streamer = short_retry(endpoint);
        let result = streamer
            .call_reliable(ChunkRequest::new(1))
            .await
            .expect("third attempt succeeds");
        assert!(result.markers.is_empty());
    }

    #[tokio::test]
    async fn call_reliable_exhausts_exactly_the_retry_budget() {
        let endpoint = FlakyEndpoint::new(u32::MAX, Vec::new());
        let streamer = short_retry(endpoint);
        let error = streamer
            .call_reliable(ChunkRequest::new(1))
            .await
            .expect_err("never succeeds");
        assert_eq!(
            error,
            StreamError::Transport("connection reset".to_string())
        );
        // Initial attempt plus two retries.
        assert_eq!(streamer.endpoint.calls(), 3);
    }

    #[tokio::test]
    async fn api_errors_are_failures_and_propagate_unchanged() {
        let endpoint = FlakyEndpoint::new(
            0,
            vec![
                envelope(r#"{ "error": { "code": "internal", "info": "boom" } }"#),
                envelope(r#"{ "error": { "code": "internal", "info": "boom" } }"#),
                envelope(r#"{ "error": { "code": "internal", "info": "boom" } }"#),
            ],
        );
        let streamer = short_retry(endpoint);
        let error = streamer
            .call_reliable(ChunkRequest::new(1))
            .await
            .expect_err("app errors reject");
        assert!(matches!(error, StreamError::Api { code, .. } if code == "internal"));
    }

    #[tokio::test]
    async fn sequential_load_follows_cursors_in_order() {
        let streamer = short_retry(ChainedEndpoint);
        let mut consumer = RecordingConsumer::default();
        let chunks = streamer
            .load_sequential(ChunkRequest::new(1), &mut consumer)
            .await
            .unwrap();
        assert_eq!(chunks, 3);
        assert_eq!(consumer.chunk_keys, ["chunk-0", "chunk-1", "chunk-2"]);
        assert_eq!(consumer.done_count, 1);
    }

    #[tokio::test]
    async fn single_chunk_load_finishes_the_consumer() {
        let endpoint = FlakyEndpoint::new(
            0,
            vec![envelope(
                r#"{ "query": { "markers": { "group-a": [[0.0, 0.0, null]] } } }"#,
            )],
        );
        let streamer = short_retry(endpoint);
        let mut consumer = RecordingConsumer::default();
        streamer
            .load_chunk(ChunkRequest::new(1), &mut consumer)
            .await
            .unwrap();
        assert_eq!(consumer.chunk_keys, ["group-a"]);
        assert_eq!(consumer.done_count, 1);
    }
}
