//! Wire format for the chunk retrieval endpoint.
//!
//! Requests carry a page identifier plus optional revision pin, layer
//! filter, continuation cursor, chunk size limit and sector id. Responses
//! group raw marker tuples by their space-joined layer-set string and may
//! carry a continuation cursor for the next chunk.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::endpoint::StreamError;

/// One chunk request. Serializes straight into the endpoint's query fields;
/// absent options are omitted from the query entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkRequest {
    pub pageid: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revid: Option<u64>,
    /// Pipe-joined tag list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<String>,
    #[serde(rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<u32>,
}

impl ChunkRequest {
    pub fn new(page_id: u64) -> Self {
        Self {
            pageid: page_id,
            revid: None,
            layers: None,
            continue_from: None,
            limit: None,
            sector: None,
        }
    }

    pub fn with_version(mut self, revision_id: u64) -> Self {
        self.revid = Some(revision_id);
        self
    }

    pub fn with_filter(mut self, filter: &[String]) -> Self {
        self.layers = Some(filter.join("|"));
        self
    }

    pub fn with_cursor(mut self, cursor: u64) -> Self {
        self.continue_from = Some(cursor);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_sector(mut self, sector: u32) -> Self {
        self.sector = Some(sector);
        self
    }
}

/// Raw marker tuple: `[row, column, state-or-null]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMarker(pub f64, pub f64, pub Option<serde_json::Value>);

impl RawMarker {
    pub fn row(&self) -> f64 {
        self.0
    }

    pub fn col(&self) -> f64 {
        self.1
    }

    pub fn state(&self) -> Option<&serde_json::Value> {
        self.2.as_ref()
    }

    /// Explicit identifier from marker state, if the server assigned one.
    /// Accepts both string and numeric uids.
    pub fn state_uid(&self) -> Option<String> {
        let uid = self.state()?.get("uid")?;
        match uid {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Chunk payload: raw tuples grouped by space-joined layer-set string.
pub type ChunkMarkers = BTreeMap<String, Vec<RawMarker>>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChunkResult {
    pub markers: ChunkMarkers,
    #[serde(rename = "continue", default)]
    pub continue_cursor: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    pub code: String,
    #[serde(default)]
    pub info: String,
}

/// Top-level endpoint response: `{ query: ... }` or `{ error: ... }`.
///
/// An `error` member in a transport-successful response is still a failure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub query: Option<ChunkResult>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

impl ApiEnvelope {
    pub fn into_result(self) -> Result<ChunkResult, StreamError> {
        if let Some(error) = self.error {
            return Err(StreamError::Api {
                code: error.code,
                info: error.info,
            });
        }
        self.query
            .ok_or_else(|| StreamError::Decode("response envelope has no query member".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiEnvelope, ChunkRequest};
    use crate::endpoint::StreamError;

    #[test]
    fn request_serializes_wire_field_names() {
        let request = ChunkRequest::new(1138)
            .with_version(42)
            .with_filter(&["group-a".to_string(), "group-b".to_string()])
            .with_cursor(75)
            .with_limit(25)
            .with_sector(3);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "pageid": 1138,
                "revid": 42,
                "layers": "group-a|group-b",
                "continue": 75,
                "limit": 25,
                "sector": 3,
            })
        );
    }

    #[test]
    fn absent_options_are_omitted() {
        let value = serde_json::to_value(ChunkRequest::new(7)).unwrap();
        assert_eq!(value, serde_json::json!({ "pageid": 7 }));
    }

    #[test]
    fn envelope_decodes_markers_and_cursor() {
        let raw = r#"{
            "query": {
                "markers": {
                    "group-a": [[10.5, 20.25, null]],
                    "group-a cave bg:2": [[1.0, 2.0, {"uid": "m1"}]]
                },
                "continue": 150
            }
        }"#;
        let envelope: ApiEnvelope = serde_json::from_str(raw).unwrap();
        let result = envelope.into_result().unwrap();
        assert_eq!(result.continue_cursor, Some(150));
        assert_eq!(result.markers.len(), 2);

        let tagged = &result.markers["group-a cave bg:2"][0];
        assert_eq!(tagged.row(), 1.0);
        assert_eq!(tagged.col(), 2.0);
        assert_eq!(tagged.state_uid().as_deref(), Some("m1"));

        let plain = &result.markers["group-a"][0];
        assert!(plain.state().is_none());
        assert!(plain.state_uid().is_none());
    }

    #[test]
    fn error_member_is_a_failure() {
        let raw = r#"{ "error": { "code": "badtitle", "info": "no such page" } }"#;
        let envelope: ApiEnvelope = serde_json::from_str(raw).unwrap();
        match envelope.into_result() {
            Err(StreamError::Api { code, info }) => {
                assert_eq!(code, "badtitle");
                assert_eq!(info, "no such page");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn final_chunk_has_no_cursor() {
        let raw = r#"{ "query": { "markers": {} } }"#;
        let envelope: ApiEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.into_result().unwrap().continue_cursor, None);
    }
}
