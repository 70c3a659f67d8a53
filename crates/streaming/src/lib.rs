pub mod client;
pub mod config;
pub mod endpoint;
pub mod events;
pub mod instantiate;
pub mod protocol;

pub use client::*;
pub use config::*;
pub use endpoint::*;
pub use events::*;
pub use instantiate::*;
pub use protocol::*;
