use foundation::handles::Handle;

/// Opaque handle to a runtime marker.
///
/// Marker content (icon, popup, geometry) is owned by the rendering glue;
/// the layer manager only indexes and queries markers through this handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerHandle(pub Handle);

impl MarkerHandle {
    pub fn from_index(index: u32) -> Self {
        Self(Handle::new(index, 0))
    }

    pub fn index(&self) -> u32 {
        self.0.index()
    }
}
