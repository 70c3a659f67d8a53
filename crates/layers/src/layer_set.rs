//! Marker layer tags.
//!
//! A marker's `LayerSet` is an ordered, duplicate-free tag sequence where
//! position 0 is the owning group. Tags of the form `key:value` are
//! property-tags: pseudo-layers used for optional per-marker sub-filtering
//! (for example `bg:2` ties a marker to one background). Property-tags do
//! not get layer buckets.

use std::collections::BTreeMap;

pub const PROPERTY_SEPARATOR: char = ':';

/// Split a `key:value` tag. Returns `None` for plain layer names; a leading
/// separator does not make a property-tag.
pub fn split_property_tag(tag: &str) -> Option<(&str, &str)> {
    match tag.split_once(PROPERTY_SEPARATOR) {
        Some((key, value)) if !key.is_empty() => Some((key, value)),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerSet {
    tags: Vec<String>,
}

impl LayerSet {
    /// Build from tags, dropping duplicates while preserving order.
    pub fn new(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut set = Self::default();
        for tag in tags {
            set.push(tag.into());
        }
        set
    }

    /// Parse a space-joined key, the format chunk responses group markers by.
    pub fn from_key(key: &str) -> Self {
        Self::new(key.split_whitespace())
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// The owning group: position 0.
    pub fn group(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }

    pub fn has(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Duplicate-free append; returns `false` if the tag was already present.
    pub fn push(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.has(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Plain layer names only (property-tags skipped).
    pub fn plain_layers(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .map(String::as_str)
            .filter(|t| split_property_tag(t).is_none())
    }

    /// The value carried for a property key, if any tag has that prefix.
    pub fn property_value(&self, key: &str) -> Option<&str> {
        self.tags.iter().find_map(|t| match split_property_tag(t) {
            Some((k, v)) if k == key => Some(v),
            _ => None,
        })
    }

    /// All carried properties, or `None` when the set has no property-tags.
    pub fn property_map(&self) -> Option<BTreeMap<String, String>> {
        let mut out = BTreeMap::new();
        for tag in &self.tags {
            if let Some((key, value)) = split_property_tag(tag) {
                out.insert(key.to_string(), value.to_string());
            }
        }
        if out.is_empty() { None } else { Some(out) }
    }

    /// Visibility-cache key: tags joined by a single space.
    pub fn cache_key(&self) -> String {
        self.tags.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::{LayerSet, split_property_tag};

    #[test]
    fn dedupes_preserving_order() {
        let set = LayerSet::new(["group-a", "cave", "group-a", "bg:2"]);
        assert_eq!(set.tags(), ["group-a", "cave", "bg:2"]);
        assert_eq!(set.group(), Some("group-a"));
    }

    #[test]
    fn key_round_trip() {
        let set = LayerSet::from_key("group-a cave bg:2");
        assert_eq!(set.cache_key(), "group-a cave bg:2");
    }

    #[test]
    fn property_tags_are_not_plain_layers() {
        let set = LayerSet::from_key("group-a bg:2");
        let plain: Vec<&str> = set.plain_layers().collect();
        assert_eq!(plain, ["group-a"]);
        assert_eq!(set.property_value("bg"), Some("2"));
        assert_eq!(set.property_value("other"), None);
    }

    #[test]
    fn property_map_is_none_without_property_tags() {
        assert!(LayerSet::from_key("group-a cave").property_map().is_none());
        let props = LayerSet::from_key("group-a bg:2").property_map().unwrap();
        assert_eq!(props.get("bg").map(String::as_str), Some("2"));
    }

    #[test]
    fn leading_separator_is_not_a_property() {
        assert_eq!(split_property_tag(":odd"), None);
        assert_eq!(split_property_tag("bg:2"), Some(("bg", "2")));
        assert_eq!(split_property_tag("plain"), None);
    }
}
