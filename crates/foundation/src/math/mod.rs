pub mod crs;
pub mod precision;
pub mod vec;

pub use crs::*;
pub use precision::*;
pub use vec::*;
