//! Marker layer manager: the visibility decision engine.
//!
//! Markers are indexed under every plain layer name in their `LayerSet`.
//! Visibility is a pure function of a marker's tags and four mutable masks;
//! results are cached per unique LayerSet string, so queries are O(1)
//! amortized per combination. Any mask mutation invalidates the whole cache
//! (it is keyed by tag text, not by mask).
//!
//! Failure semantics: every operation is synchronous and total over
//! well-formed input. Referencing a layer that was never registered is a
//! programming error and asserts; buckets must exist before markers that
//! name them are added.

use std::collections::{BTreeMap, BTreeSet};

use runtime::event_bus::EventBus;

use crate::events::LayerEvent;
use crate::layer_set::{LayerSet, split_property_tag};
use crate::marker::MarkerHandle;

/// Where visible markers go. Implemented by the rendering glue over its
/// vector/canvas library; this engine draws nothing itself.
///
/// Both methods report whether membership actually changed, which is what
/// gates `visibilityUpdated` notifications.
pub trait RenderTarget {
    fn add_marker(&mut self, marker: MarkerHandle) -> bool;
    fn remove_marker(&mut self, marker: MarkerHandle) -> bool;
}

#[derive(Debug)]
pub struct MarkerLayerManager {
    /// Every bound marker, in registration order.
    markers: Vec<MarkerHandle>,
    layer_sets: BTreeMap<MarkerHandle, LayerSet>,
    /// Buckets per plain layer name.
    by_layer: BTreeMap<String, Vec<MarkerHandle>>,
    /// Every tag here must be present on a marker (AND-of-all).
    require_all: BTreeSet<String>,
    /// At least one must be present, when non-empty (OR-of-any).
    require_any: BTreeSet<String>,
    /// None may be present.
    exclude: BTreeSet<String>,
    /// Per-key value requirements, opt-in per marker.
    property_requirements: BTreeMap<String, String>,
    compute_cache: BTreeMap<String, bool>,
    defer_updates: bool,
    events: EventBus<LayerEvent>,
}

impl Default for MarkerLayerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerLayerManager {
    pub fn new() -> Self {
        Self {
            markers: Vec::new(),
            layer_sets: BTreeMap::new(),
            by_layer: BTreeMap::new(),
            require_all: BTreeSet::new(),
            require_any: BTreeSet::new(),
            exclude: BTreeSet::new(),
            property_requirements: BTreeMap::new(),
            compute_cache: BTreeMap::new(),
            defer_updates: false,
            events: EventBus::new(),
        }
    }

    /// Notification bus; subscribe for `visibilityUpdated`.
    pub fn events(&mut self) -> &mut EventBus<LayerEvent> {
        &mut self.events
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn is_registered(&self, layer_name: &str) -> bool {
        self.by_layer.contains_key(layer_name)
    }

    pub fn layer_set(&self, marker: MarkerHandle) -> Option<&LayerSet> {
        self.layer_sets.get(&marker)
    }

    /// Members of one layer bucket, in registration order.
    pub fn markers_in_layer(&self, layer_name: &str) -> &[MarkerHandle] {
        self.bucket(layer_name)
    }

    fn bucket(&self, layer_name: &str) -> &Vec<MarkerHandle> {
        self.by_layer
            .get(layer_name)
            .unwrap_or_else(|| panic!("layer '{layer_name}' was never registered"))
    }

    /// Idempotently create an empty bucket for a layer name.
    pub fn register(&mut self, layer_name: impl Into<String>) {
        self.by_layer.entry(layer_name.into()).or_default();
    }

    /// Remove a layer bucket. Does not touch the markers themselves; callers
    /// must resolve references (`nuke` or `remove_member`) first.
    pub fn deregister(&mut self, layer_name: &str) {
        self.by_layer.remove(layer_name);
    }

    /// Reset the computed-visibility cache. Must happen whenever any mask is
    /// modified.
    pub fn clear_compute_cache(&mut self) {
        self.compute_cache.clear();
    }

    /// Bind a marker under its layer set and compute its initial visibility.
    pub fn add_member(
        &mut self,
        layer_set: LayerSet,
        marker: MarkerHandle,
        target: &mut dyn RenderTarget,
    ) {
        for name in layer_set.plain_layers() {
            let bucket = self
                .by_layer
                .get_mut(name)
                .unwrap_or_else(|| panic!("layer '{name}' was never registered"));
            bucket.push(marker);
        }
        self.layer_sets.insert(marker, layer_set);
        self.markers.push(marker);
        self.update_member(marker, false, target);
    }

    /// Append one tag to an existing member and re-evaluate it.
    pub fn add_marker_to_layer(
        &mut self,
        marker: MarkerHandle,
        layer: impl Into<String>,
        target: &mut dyn RenderTarget,
    ) {
        let layer = layer.into();
        let set = self
            .layer_sets
            .get_mut(&marker)
            .unwrap_or_else(|| panic!("marker {marker:?} is not a member"));
        if !set.push(layer.clone()) {
            return;
        }
        if split_property_tag(&layer).is_none() {
            let bucket = self
                .by_layer
                .get_mut(&layer)
                .unwrap_or_else(|| panic!("layer '{layer}' was never registered"));
            bucket.push(marker);
        }
        self.update_member(marker, false, target);
    }

    /// Unbind a marker from the render target and every bucket.
    pub fn remove_member(&mut self, marker: MarkerHandle, target: &mut dyn RenderTarget) {
        target.remove_marker(marker);
        if let Some(set) = self.layer_sets.remove(&marker) {
            for name in set.plain_layers() {
                if let Some(bucket) = self.by_layer.get_mut(name) {
                    bucket.retain(|m| *m != marker);
                }
            }
        }
        self.markers.retain(|m| *m != marker);
    }

    /// Evaluate the masks against a layer set. Pure; empty masks impose no
    /// constraint.
    pub fn should_be_visible(&self, layers: &LayerSet) -> bool {
        // Every required tag must be present.
        if !self.require_all.iter().all(|tag| layers.has(tag)) {
            return false;
        }

        // Non-empty inclusion mask needs at least one overlap.
        if !self.require_any.is_empty() && !self.require_any.iter().any(|tag| layers.has(tag)) {
            return false;
        }

        // Any overlap with the exclusion mask hides the marker.
        if self.exclude.iter().any(|tag| layers.has(tag)) {
            return false;
        }

        // Property requirements are opt-in: only markers carrying a tag for
        // the constrained key are affected, and then the value must match.
        for (key, required) in &self.property_requirements {
            if let Some(carried) = layers.property_value(key) {
                if carried != required {
                    return false;
                }
            }
        }

        true
    }

    /// Re-evaluate one marker and apply the result to the render target.
    ///
    /// Returns whether the marker's membership actually changed. Non-internal
    /// calls publish `visibilityUpdated` once on a real transition.
    pub fn update_member(
        &mut self,
        marker: MarkerHandle,
        is_internal: bool,
        target: &mut dyn RenderTarget,
    ) -> bool {
        if self.defer_updates {
            return false;
        }
        let key = self
            .layer_sets
            .get(&marker)
            .unwrap_or_else(|| panic!("marker {marker:?} is not a member"))
            .cache_key();
        let visible = match self.compute_cache.get(&key).copied() {
            Some(v) => v,
            None => {
                let v = self.should_be_visible(&self.layer_sets[&marker]);
                self.compute_cache.insert(key, v);
                v
            }
        };
        let changed = if visible {
            target.add_marker(marker)
        } else {
            target.remove_marker(marker)
        };
        if !is_internal && changed {
            self.events.publish(&LayerEvent::VisibilityUpdated);
        }
        changed
    }

    /// Re-evaluate one layer's bucket, or every marker. Individual updates
    /// run as internal; at most one aggregated `visibilityUpdated` fires.
    pub fn update_members(&mut self, layer_name: Option<&str>, target: &mut dyn RenderTarget) {
        if self.defer_updates {
            return;
        }
        let handles: Vec<MarkerHandle> = match layer_name {
            Some(name) => self.bucket(name).clone(),
            None => self.markers.clone(),
        };
        let mut changed = false;
        for marker in handles {
            changed |= self.update_member(marker, true, target);
        }
        if changed {
            self.events.publish(&LayerEvent::VisibilityUpdated);
        }
    }

    /// Mark a tag as absolutely required (AND). Re-evaluates the whole map.
    pub fn set_requirement(&mut self, tag: impl Into<String>, state: bool, target: &mut dyn RenderTarget) {
        let tag = tag.into();
        if state {
            self.require_all.insert(tag);
        } else {
            self.require_all.remove(&tag);
        }
        self.clear_compute_cache();
        self.update_members(None, target);
    }

    /// Mark a tag as included (OR). Re-evaluates the whole map.
    pub fn set_inclusion(&mut self, tag: impl Into<String>, state: bool, target: &mut dyn RenderTarget) {
        let tag = tag.into();
        if state {
            self.require_any.insert(tag);
        } else {
            self.require_any.remove(&tag);
        }
        self.clear_compute_cache();
        self.update_members(None, target);
    }

    /// Mark a layer as hiding its markers. Only that layer's bucket can be
    /// affected, so only it is re-evaluated.
    pub fn set_exclusion(&mut self, layer_name: impl Into<String>, state: bool, target: &mut dyn RenderTarget) {
        let layer_name = layer_name.into();
        if state {
            self.exclude.insert(layer_name.clone());
        } else {
            self.exclude.remove(&layer_name);
        }
        self.clear_compute_cache();
        self.update_members(Some(&layer_name), target);
    }

    /// Set or clear (`None`) the required value for a property key.
    pub fn set_optional_property_requirement(
        &mut self,
        key: impl Into<String>,
        value: Option<impl Into<String>>,
        target: &mut dyn RenderTarget,
    ) {
        let key = key.into();
        match value {
            Some(v) => {
                self.property_requirements.insert(key, v.into());
            }
            None => {
                self.property_requirements.remove(&key);
            }
        }
        self.clear_compute_cache();
        self.update_members(None, target);
    }

    /// While deferred, membership mutations skip recomputation entirely;
    /// turning deferral off forces one full pass. Bulk loads should wrap
    /// their `add_member` storm with this to stay O(n).
    pub fn set_defer_visibility_updates(&mut self, state: bool, target: &mut dyn RenderTarget) {
        if !state && self.defer_updates {
            self.defer_updates = false;
            self.update_members(None, target);
        }
        self.defer_updates = state;
    }

    /// Hard-remove every marker belonging to a layer, including cleanup of
    /// the other buckets those markers were in. The layer stays registered.
    pub fn nuke(&mut self, layer_name: &str, target: &mut dyn RenderTarget) {
        let victims = std::mem::take(
            self.by_layer
                .get_mut(layer_name)
                .unwrap_or_else(|| panic!("layer '{layer_name}' was never registered")),
        );
        let mut touched: BTreeSet<String> = BTreeSet::new();
        for marker in &victims {
            target.remove_marker(*marker);
            if let Some(set) = self.layer_sets.remove(marker) {
                for other in set.plain_layers() {
                    if other != layer_name {
                        touched.insert(other.to_string());
                    }
                }
            }
        }
        let dead: BTreeSet<MarkerHandle> = victims.into_iter().collect();
        for other in touched {
            if let Some(bucket) = self.by_layer.get_mut(&other) {
                bucket.retain(|m| !dead.contains(m));
            }
        }
        self.markers.retain(|m| !dead.contains(m));
    }
}
