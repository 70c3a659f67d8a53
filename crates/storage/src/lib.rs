pub mod backend;
pub mod events;
pub mod migrate;
pub mod store;
pub mod uid;

pub use backend::*;
pub use events::*;
pub use store::*;
pub use uid::*;
