//! Chunk instantiation.
//!
//! Turns decoded chunk payloads into registered, visibility-managed
//! markers. Marker construction itself stays behind `MarkerFactory`; this
//! module only owns the ordering contract: every plain layer named by a
//! chunk is registered before any of its markers exists, and chunk
//! notifications fire once per chunk.

use std::collections::BTreeMap;

use layers::layer_set::LayerSet;
use layers::manager::{MarkerLayerManager, RenderTarget};
use layers::marker::MarkerHandle;
use runtime::event_bus::EventBus;

use crate::events::StreamEvent;
use crate::protocol::{ChunkMarkers, RawMarker};

/// Constructs the domain-side marker for one raw tuple. Implementations
/// decide what a marker is (a sprite, a DOM node, a plain record); the
/// consumer only needs a handle back.
pub trait MarkerFactory {
    fn create_marker(
        &mut self,
        layers: &LayerSet,
        raw: &RawMarker,
        properties: Option<&BTreeMap<String, String>>,
    ) -> MarkerHandle;
}

/// Receives chunks as they arrive. `chunk` runs once per decoded chunk,
/// `done` exactly once after the final chunk of a load.
pub trait ChunkConsumer {
    fn chunk(&mut self, markers: &ChunkMarkers);
    fn done(&mut self);
}

/// The production consumer: registers layers, builds markers through the
/// factory and enrolls them in the visibility engine.
pub struct InstantiatingConsumer<'a> {
    manager: &'a mut MarkerLayerManager,
    target: &'a mut dyn RenderTarget,
    factory: &'a mut dyn MarkerFactory,
    events: &'a mut EventBus<StreamEvent>,
}

impl<'a> InstantiatingConsumer<'a> {
    pub fn new(
        manager: &'a mut MarkerLayerManager,
        target: &'a mut dyn RenderTarget,
        factory: &'a mut dyn MarkerFactory,
        events: &'a mut EventBus<StreamEvent>,
    ) -> Self {
        Self {
            manager,
            target,
            factory,
            events,
        }
    }
}

impl ChunkConsumer for InstantiatingConsumer<'_> {
    fn chunk(&mut self, markers: &ChunkMarkers) {
        // Pre-register every plain layer the chunk mentions so that layer
        // requirements referencing them resolve during the same chunk.
        for key in markers.keys() {
            let layer_set = LayerSet::from_key(key);
            for layer in layer_set.plain_layers() {
                if !self.manager.is_registered(layer) {
                    self.manager.register(layer.to_string());
                }
            }
        }

        let mut created = Vec::new();
        for (key, raw_markers) in markers {
            let layer_set = LayerSet::from_key(key);
            let properties = layer_set.property_map();
            for raw in raw_markers {
                let handle = self
                    .factory
                    .create_marker(&layer_set, raw, properties.as_ref());
                self.manager
                    .add_member(layer_set.clone(), handle, self.target);
                created.push(handle);
            }
        }
        self.events.publish(&StreamEvent::ChunkInstantiated(created));
    }

    fn done(&mut self) {
        self.events.publish(&StreamEvent::ChunkStreamingDone);
    }
}
