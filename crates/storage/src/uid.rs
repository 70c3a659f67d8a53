//! Marker identifiers for persisted state.
//!
//! Markers without a server-assigned uid are identified by their layer-set
//! key and fixed-precision coordinates. The 3-decimal precision is load
//! bearing: it is what stored dismissals are keyed by, and what the
//! 20220713 migration re-encodes old identifiers to.

/// Identifier derived from position, for markers the server did not assign
/// a uid to.
pub fn generated_marker_uid(layer_set_key: &str, row: f64, col: f64) -> String {
    format!("M{layer_set_key}@{row:.3}:{col:.3}")
}

/// The identifier to persist state under: the explicit uid when the server
/// assigned one, otherwise the generated one.
pub fn marker_uid(state_uid: Option<&str>, layer_set_key: &str, row: f64, col: f64) -> String {
    match state_uid {
        Some(uid) => uid.to_string(),
        None => generated_marker_uid(layer_set_key, row, col),
    }
}

#[cfg(test)]
mod tests {
    use super::{generated_marker_uid, marker_uid};

    #[test]
    fn generated_uid_uses_three_decimals() {
        assert_eq!(
            generated_marker_uid("ore cave", 12.3456789, 7.0),
            "More cave@12.346:7.000"
        );
    }

    #[test]
    fn explicit_uid_wins() {
        assert_eq!(marker_uid(Some("m17"), "ore", 1.0, 2.0), "m17");
        assert_eq!(marker_uid(None, "ore", 1.0, 2.0), "More@1.000:2.000");
    }
}
