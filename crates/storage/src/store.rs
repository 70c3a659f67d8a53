//! Persistent per-map viewer state.
//!
//! One `MapStateStore` per map instance (plus the shared `global` scope for
//! cross-map collectibles). State lives in a single composite record under
//! the `"*"` key, with a separate `schemaVersion` stamp written lazily on
//! the first write of a session. Construction runs the schema migration
//! chain before any data is read.
//!
//! Backend failures and corrupt records are never surfaced to callers;
//! they degrade to defaults with a warning.

use runtime::event_bus::EventBus;
use tracing::warn;

use crate::backend::StateBackend;
use crate::events::StateEvent;
use crate::migrate::{
    LATEST_VERSION, MIN_SUPPORTED_VERSION, PersistedData, upgrade_data,
};

pub const NAMESPACE: &str = "viewer-state";
/// Namespace used before the 20221115 move; keys found here are renamed at
/// construction.
pub const LEGACY_NAMESPACE: &str = "ext.viewer-state";
/// Map id of the wiki-wide scope shared by globally collectible groups.
pub const GLOBAL_MAP_ID: &str = "global";

const COMPOSITE_KEY: &str = "*";
const VERSION_KEY: &str = "schemaVersion";
const DISMISSED_KEY: &str = "dismissed";
const BACKGROUND_KEY: &str = "background";

/// First model version that stored the composite record instead of loose
/// per-field keys.
const COMPOSITE_MODEL_VERSION: i64 = 20221114;

#[derive(Debug)]
pub struct MapStateStore<B> {
    backend: B,
    map_id: String,
    has_schema_version: bool,
    writable: bool,
    data: PersistedData,
    events: EventBus<StateEvent>,
}

impl<B: StateBackend> MapStateStore<B> {
    pub fn new(backend: B, map_id: impl Into<String>) -> Self {
        let mut store = Self {
            backend,
            map_id: map_id.into(),
            has_schema_version: false,
            writable: true,
            data: PersistedData::default(),
            events: EventBus::new(),
        };
        store.migrate();
        store.data = store.get_json(COMPOSITE_KEY);
        store
    }

    /// The shared scope for globally collectible groups.
    pub fn global(backend: B) -> Self {
        Self::new(backend, GLOBAL_MAP_ID)
    }

    pub fn map_id(&self) -> &str {
        &self.map_id
    }

    /// Notification bus for dismissal and background changes.
    pub fn events(&mut self) -> &mut EventBus<StateEvent> {
        &mut self.events
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Preview sessions mark their stores read-only; every mutation becomes
    /// a no-op while still updating the in-memory view.
    pub fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn key(&self, name: &str) -> String {
        format!("{NAMESPACE}.{}:{name}", self.map_id)
    }

    fn legacy_key(&self, name: &str) -> String {
        format!("{LEGACY_NAMESPACE}.{}:{name}", self.map_id)
    }

    /// Raw read of a namespaced key. Backend failure reads as absent.
    pub fn get(&self, name: &str) -> Option<String> {
        match self.backend.get(&self.key(name)) {
            Ok(value) => value,
            Err(error) => {
                warn!(%error, name, "state read failed, treating as absent");
                None
            }
        }
    }

    pub fn has(&self, name: &str) -> bool {
        match self.backend.has(&self.key(name)) {
            Ok(present) => present,
            Err(error) => {
                warn!(%error, name, "state probe failed, treating as absent");
                false
            }
        }
    }

    fn raw_set(&mut self, key: String, value: &str) {
        if let Err(error) = self.backend.set(&key, value) {
            warn!(%error, %key, "state write failed");
        }
    }

    fn raw_remove(&mut self, key: String) {
        if let Err(error) = self.backend.remove(&key) {
            warn!(%error, %key, "state removal failed");
        }
    }

    // First write of a session stamps the current schema version.
    fn stamp_version(&mut self) {
        if self.has_schema_version {
            return;
        }
        self.has_schema_version = true;
        self.raw_set(self.key(VERSION_KEY), &LATEST_VERSION.to_string());
    }

    /// Raw write of a namespaced key. The first write of a session also
    /// stamps the current schema version.
    pub fn set(&mut self, name: &str, value: &str) {
        if !self.writable {
            return;
        }
        self.stamp_version();
        self.raw_set(self.key(name), value);
    }

    pub fn remove(&mut self, name: &str) {
        if !self.writable {
            return;
        }
        self.raw_remove(self.key(name));
    }

    fn rename_from_legacy(&mut self, name: &str) {
        let legacy = self.legacy_key(name);
        let value = match self.backend.get(&legacy) {
            Ok(value) => value,
            Err(error) => {
                warn!(%error, name, "legacy state read failed, skipping rename");
                None
            }
        };
        if let Some(value) = value {
            self.set(name, &value);
            if self.writable {
                self.raw_remove(legacy);
            }
        }
    }

    fn get_json(&self, name: &str) -> PersistedData {
        let Some(raw) = self.get(name) else {
            return PersistedData::default();
        };
        match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(error) => {
                warn!(%error, name, "stored state corrupt, starting from defaults");
                PersistedData::default()
            }
        }
    }

    fn set_json(&mut self, name: &str, data: &PersistedData) {
        match serde_json::to_string(data) {
            Ok(raw) => self.set(name, &raw),
            Err(error) => warn!(%error, name, "state serialization failed"),
        }
    }

    fn migrate(&mut self) {
        // Keys saved before the namespace move come over first, version
        // stamp included, so the chain below runs on the old structure.
        if matches!(self.backend.has(&self.legacy_key(VERSION_KEY)), Ok(true)) {
            self.rename_from_legacy(VERSION_KEY);
            self.rename_from_legacy(DISMISSED_KEY);
            self.rename_from_legacy(BACKGROUND_KEY);
        }

        let version = self
            .get(VERSION_KEY)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(LATEST_VERSION);

        // Below the support floor the data is unusable; hard-reset.
        if version < MIN_SUPPORTED_VERSION {
            self.remove(VERSION_KEY);
            self.remove(DISMISSED_KEY);
            self.remove(BACKGROUND_KEY);
            return;
        }

        // A stale version with nothing actually saved is a fresh store.
        let any_saved = if version >= COMPOSITE_MODEL_VERSION {
            self.has(COMPOSITE_KEY)
        } else {
            self.has(DISMISSED_KEY) || self.has(BACKGROUND_KEY)
        };
        if version < LATEST_VERSION && !any_saved {
            return;
        }

        self.upgrade_from(version);
    }

    fn upgrade_from(&mut self, version: i64) {
        // Collapse the loose-keys model into the composite record.
        if version < COMPOSITE_MODEL_VERSION && !self.has(COMPOSITE_KEY) {
            let dismissed: Vec<String> = self
                .get(DISMISSED_KEY)
                .and_then(|raw| match serde_json::from_str(&raw) {
                    Ok(list) => Some(list),
                    Err(error) => {
                        warn!(%error, "stored dismissal list corrupt, dropping");
                        None
                    }
                })
                .unwrap_or_default();
            let background = self
                .get(BACKGROUND_KEY)
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(0);
            self.set_json(COMPOSITE_KEY, &PersistedData {
                dismissed,
                background,
            });
            self.remove(DISMISSED_KEY);
            self.remove(BACKGROUND_KEY);
        }

        if !self.has(COMPOSITE_KEY) {
            return;
        }

        let data = upgrade_data(version, self.get_json(COMPOSITE_KEY));
        self.set_json(COMPOSITE_KEY, &data);

        // One version rewrite after the whole chain, unconditionally, so a
        // pre-move stamp carried over by the rename cannot survive and
        // re-trigger migrations next session.
        if self.writable {
            self.has_schema_version = true;
            self.raw_set(self.key(VERSION_KEY), &LATEST_VERSION.to_string());
        }
    }

    /// Write the in-memory composite record through to the backend.
    pub fn commit(&mut self) {
        let data = self.data.clone();
        self.set_json(COMPOSITE_KEY, &data);
    }

    fn prefixed(uid: &str, is_group: bool) -> String {
        format!("{}{uid}", if is_group { "G:" } else { "M:" })
    }

    pub fn dismissed(&self) -> &[String] {
        &self.data.dismissed
    }

    pub fn is_dismissed(&self, uid: &str, is_group: bool) -> bool {
        if self.data.dismissed.is_empty() {
            return false;
        }
        let prefixed = Self::prefixed(uid, is_group);
        self.data.dismissed.iter().any(|d| *d == prefixed)
    }

    /// Flip one dismissal, commit, notify. Returns the new state.
    pub fn toggle_dismissal(&mut self, uid: &str, is_group: bool) -> bool {
        let prefixed = Self::prefixed(uid, is_group);
        let now_dismissed = if self.is_dismissed(uid, is_group) {
            self.data.dismissed.retain(|d| *d != prefixed);
            false
        } else {
            self.data.dismissed.push(prefixed);
            true
        };
        self.commit();
        let event = if is_group {
            StateEvent::GroupDismissChange(uid.to_string())
        } else {
            StateEvent::MarkerDismissChange(uid.to_string())
        };
        self.events.publish(&event);
        now_dismissed
    }

    pub fn background(&self) -> i64 {
        self.data.background
    }

    /// Persist the background selection. Range checking is the map glue's
    /// concern; it clamps unknown indices to 0 before calling.
    pub fn set_background(&mut self, index: i64) {
        self.data.background = index;
        self.commit();
        self.events.publish(&StateEvent::BackgroundChanged(index));
    }
}
