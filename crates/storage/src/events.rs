use runtime::event_bus::Tagged;

/// Notifications emitted when persisted viewer state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// The saved background selection changed; carries the new index.
    BackgroundChanged(i64),
    /// A single marker's dismissal toggled; carries the unprefixed uid.
    MarkerDismissChange(String),
    /// A whole group's dismissal toggled; carries the group layer name.
    GroupDismissChange(String),
}

impl Tagged for StateEvent {
    fn tag(&self) -> &'static str {
        match self {
            StateEvent::BackgroundChanged(_) => "backgroundChange",
            StateEvent::MarkerDismissChange(_) => "markerDismissChange",
            StateEvent::GroupDismissChange(_) => "groupDismissChange",
        }
    }
}
