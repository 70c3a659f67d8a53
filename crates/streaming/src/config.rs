//! Server-delivered map setup.
//!
//! Plain serde mirrors of the setup document the page embeds: coordinate
//! frame description, marker group metadata, background roster and feature
//! flags. The document is produced and validated server-side; nothing here
//! re-validates it. Only fields the runtime consumes are modeled.

use std::collections::BTreeMap;

use foundation::math::crs::{AxisOrder, CoordinateFrame, MapPoint};
use serde::Deserialize;

/// Feature flag bits carried in `MapSetup::flags`.
pub mod map_flags {
    pub const SHOW_COORDINATES: u32 = 1 << 0;
    pub const HIDE_LEGEND: u32 = 1 << 1;
    pub const DISABLE_ZOOM: u32 = 1 << 2;
    pub const SEARCH: u32 = 1 << 3;
    pub const SORT_CHECKLISTS_BY_AMOUNT: u32 = 1 << 4;
    pub const LINKED_SEARCH: u32 = 1 << 5;
    pub const VISUAL_EDITOR: u32 = 1 << 6;
    pub const IS_PREVIEW: u32 = 1 << 7;
    pub const RENDER_MARKERS_ONTO_CANVAS: u32 = 1 << 8;
}

/// Behavior bits carried in `MarkerGroupSpec::flags`.
pub mod group_flags {
    pub const IS_NUMBERED_IN_CHECKLISTS: u32 = 1 << 0;
    pub const CANNOT_BE_SEARCHED: u32 = 1 << 1;
    pub const IS_UNSELECTED: u32 = 1 << 2;
    pub const COLLECTIBLE_INDIVIDUAL: u32 = 1 << 3;
    pub const COLLECTIBLE_GROUP: u32 = 1 << 4;
    pub const COLLECTIBLE_GLOBAL_GROUP: u32 = 1 << 5;
    pub const COLLECTIBLE_ANY: u32 =
        COLLECTIBLE_INDIVIDUAL | COLLECTIBLE_GROUP | COLLECTIBLE_GLOBAL_GROUP;
}

/// How a collectible group tracks dismissal state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CollectibleMode {
    /// Each marker is dismissed on its own.
    Individual,
    /// Dismissing any marker dismisses the whole group.
    Group,
    /// Like `Group`, but the state is shared across every map of the wiki.
    GlobalGroup,
}

/// Coordinate frame description. The corner arrays are `[row, col]` in the
/// server's own frame; `order` selects how raw tuples are read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CrsSpec {
    #[serde(rename = "topLeft")]
    pub top_left: [f64; 2],
    #[serde(rename = "bottomRight")]
    pub bottom_right: [f64; 2],
    /// `"latlon"` (default) or `"xy"`.
    #[serde(default)]
    pub order: Option<String>,
    /// Radians, clockwise.
    #[serde(default)]
    pub rotation: f64,
}

impl CrsSpec {
    pub fn axis_order(&self) -> AxisOrder {
        match self.order.as_deref() {
            Some("xy") => AxisOrder::ColumnMajor,
            _ => AxisOrder::RowMajor,
        }
    }

    /// Build the converter the runtime actually uses.
    pub fn frame(&self) -> CoordinateFrame {
        CoordinateFrame::new(
            MapPoint::new(self.top_left[0], self.top_left[1]),
            MapPoint::new(self.bottom_right[0], self.bottom_right[1]),
            self.axis_order(),
            self.rotation,
        )
    }
}

impl Default for CrsSpec {
    fn default() -> Self {
        Self {
            top_left: [0.0, 0.0],
            bottom_right: [100.0, 100.0],
            order: None,
            rotation: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarkerGroupSpec {
    pub name: String,
    #[serde(default)]
    pub flags: u32,
}

impl MarkerGroupSpec {
    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    /// Dismissal tracking mode, if the group is collectible at all.
    pub fn collectible_mode(&self) -> Option<CollectibleMode> {
        if self.has_flag(group_flags::COLLECTIBLE_INDIVIDUAL) {
            Some(CollectibleMode::Individual)
        } else if self.has_flag(group_flags::COLLECTIBLE_GROUP) {
            Some(CollectibleMode::Group)
        } else if self.has_flag(group_flags::COLLECTIBLE_GLOBAL_GROUP) {
            Some(CollectibleMode::GlobalGroup)
        } else {
            None
        }
    }
}

/// One selectable background. Markers tied to it carry a `bg:<layer>`
/// property-tag; switching backgrounds swaps the `bg` property requirement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackgroundSpec {
    /// Association key for the `bg:` property-tag.
    pub layer: String,
    /// Placement box in the server frame; defaults to the whole map.
    #[serde(default)]
    pub at: Option<[[f64; 2]; 2]>,
    pub image: String,
    #[serde(default)]
    pub pixelated: bool,
    #[serde(default)]
    pub overlays: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapSetup {
    /// Page id chunk requests are keyed by.
    pub id: u64,
    /// Revision pin for cache-coherent chunk requests.
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub crs: CrsSpec,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub groups: BTreeMap<String, MarkerGroupSpec>,
    #[serde(default)]
    pub backgrounds: Vec<BackgroundSpec>,
    /// When present, chunk requests are narrowed to these groups.
    #[serde(rename = "filterGroups", default)]
    pub filter_groups: Option<Vec<String>>,
}

impl MapSetup {
    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    /// Whether a layer falls outside the active dataset filter. Absent
    /// filter means nothing is filtered.
    pub fn is_layer_filtered_out(&self, layer: &str) -> bool {
        match &self.filter_groups {
            Some(filter) => !filter.iter().any(|f| f == layer),
            None => false,
        }
    }

    /// The chunk request this setup calls for, with revision pin and
    /// dataset filter applied when configured.
    pub fn chunk_request(&self) -> crate::protocol::ChunkRequest {
        let mut request = crate::protocol::ChunkRequest::new(self.id);
        if let Some(version) = self.version {
            request = request.with_version(version);
        }
        if let Some(filter) = &self.filter_groups {
            request = request.with_filter(filter);
        }
        request
    }
}
