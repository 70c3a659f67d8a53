//! Map coordinate reference system.
//!
//! Servers describe marker positions in an arbitrary rectangle with a
//! configurable origin corner, axis order and rotation. Rendering happens in
//! a normalized square (`[0, 0]` to `[100, 100]`). `CoordinateFrame` is the
//! bidirectional converter between the two spaces.
//!
//! Ordering contract:
//! - `MapPoint` is always `(row, col)` regardless of how the server orders
//!   raw tuples; `point_from_raw` applies the frame's axis order once, at
//!   the boundary.

use super::precision::round_places;
use super::vec::Vec2;

/// How raw two-element coordinate tuples are ordered on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AxisOrder {
    /// `[row, col]`.
    RowMajor,
    /// `[col, row]`.
    ColumnMajor,
}

/// Which corner of the server rectangle is the coordinate origin.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CrsOrigin {
    TopLeft,
    BottomLeft,
}

/// A point in the server's coordinate frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapPoint {
    pub row: f64,
    pub col: f64,
}

impl MapPoint {
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }
}

/// An axis-aligned box in the server's coordinate frame, `[corner, corner]`.
pub type MapBox = [MapPoint; 2];

/// Immutable converter between the server frame and normalized space.
///
/// Created once per map instance from server configuration. A degenerate
/// frame (`top_left == bottom_right`) is a configuration error that upstream
/// validation is responsible for; it is not handled here.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CoordinateFrame {
    top_left: MapPoint,
    bottom_right: MapPoint,
    axis_order: AxisOrder,
    rotation: f64,
    origin: CrsOrigin,
    scale: f64,
    // sin/cos of -rotation, fixed at construction.
    r_sin: f64,
    r_cos: f64,
}

impl CoordinateFrame {
    pub fn new(
        top_left: MapPoint,
        bottom_right: MapPoint,
        axis_order: AxisOrder,
        rotation: f64,
    ) -> Self {
        let origin = if top_left.row < bottom_right.row && top_left.col < bottom_right.col {
            CrsOrigin::TopLeft
        } else {
            CrsOrigin::BottomLeft
        };
        let scale = 100.0 / top_left.row.abs().max(bottom_right.row.abs());
        Self {
            top_left,
            bottom_right,
            axis_order,
            rotation,
            origin,
            scale,
            r_sin: (-rotation).sin(),
            r_cos: (-rotation).cos(),
        }
    }

    pub fn origin(&self) -> CrsOrigin {
        self.origin
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn axis_order(&self) -> AxisOrder {
        self.axis_order
    }

    /// Read a raw server tuple according to the frame's axis order.
    pub fn point_from_raw(&self, raw: [f64; 2]) -> MapPoint {
        match self.axis_order {
            AxisOrder::RowMajor => MapPoint::new(raw[0], raw[1]),
            AxisOrder::ColumnMajor => MapPoint::new(raw[1], raw[0]),
        }
    }

    // Row flip is an involution: the same expression maps both ways.
    fn flip_row(&self, row: f64) -> f64 {
        match self.origin {
            CrsOrigin::TopLeft => self.bottom_right.row - row,
            CrsOrigin::BottomLeft => row,
        }
    }

    /// Map a server-frame point into normalized space, respecting rotation.
    ///
    /// Non-destructive; the input is not consumed beyond its `Copy`.
    pub fn to_internal_point(&self, p: MapPoint) -> Vec2 {
        let row = self.flip_row(p.row) * self.scale;
        let col = p.col * self.scale;
        if self.rotation == 0.0 {
            // Pure scale/flip; keeps trig round-off out of unrotated frames.
            return Vec2::new(row, col);
        }
        Vec2::new(
            col * self.r_sin + row * self.r_cos,
            col * self.r_cos - row * self.r_sin,
        )
    }

    /// Map a server-frame box into normalized space.
    ///
    /// This does not respect rotation. Consumers needing rotated boxes must
    /// rotate the corners themselves.
    pub fn to_internal_box(&self, b: MapBox) -> [Vec2; 2] {
        [
            Vec2::new(self.flip_row(b[0].row) * self.scale, b[0].col * self.scale),
            Vec2::new(self.flip_row(b[1].row) * self.scale, b[1].col * self.scale),
        ]
    }

    /// Map a normalized-space point back into the server frame, undoing
    /// rotation. With `round`, coordinates are rounded to 3 decimal places
    /// (the precision used by stored marker identifiers).
    pub fn from_internal_point(&self, q: Vec2, round: bool) -> MapPoint {
        let (row_scaled, col_scaled) = if self.rotation == 0.0 {
            (q.x, q.y)
        } else {
            // The rotation matrix is a reflection, so it is its own inverse.
            (
                q.x * self.r_cos - q.y * self.r_sin,
                q.x * self.r_sin + q.y * self.r_cos,
            )
        };
        let mut row = self.flip_row(row_scaled / self.scale);
        let mut col = col_scaled / self.scale;
        if round {
            row = round_places(row, 3);
            col = round_places(col, 3);
        }
        MapPoint::new(row, col)
    }

    /// Human-readable coordinate label; field order follows the axis order.
    /// Numeric formatting is plain; locale concerns belong to the caller.
    pub fn format_label(&self, p: MapPoint) -> String {
        match self.axis_order {
            AxisOrder::RowMajor => format!("{:.2}, {:.2}", p.row, p.col),
            AxisOrder::ColumnMajor => format!("{:.2}, {:.2}", p.col, p.row),
        }
    }
}
