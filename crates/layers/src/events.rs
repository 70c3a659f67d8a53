use runtime::event_bus::Tagged;

/// Notifications emitted by the layer manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerEvent {
    /// At least one marker actually changed render-target membership.
    VisibilityUpdated,
}

impl Tagged for LayerEvent {
    fn tag(&self) -> &'static str {
        match self {
            LayerEvent::VisibilityUpdated => "visibilityUpdated",
        }
    }
}
