pub mod events;
pub mod layer_set;
pub mod manager;
pub mod marker;

pub use events::*;
pub use layer_set::*;
pub use manager::*;
pub use marker::*;
