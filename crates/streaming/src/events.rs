use layers::marker::MarkerHandle;
use runtime::event_bus::Tagged;

/// Notifications emitted during marker streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// One whole chunk has been instantiated; carries every marker it
    /// produced (one notification per chunk, never per marker).
    ChunkInstantiated(Vec<MarkerHandle>),
    /// A sequential load chain has terminated. Fires exactly once per load.
    ChunkStreamingDone,
}

impl Tagged for StreamEvent {
    fn tag(&self) -> &'static str {
        match self {
            StreamEvent::ChunkInstantiated(_) => "chunkInstantiated",
            StreamEvent::ChunkStreamingDone => "chunkStreamingDone",
        }
    }
}
