pub mod remap;

pub use remap::*;
