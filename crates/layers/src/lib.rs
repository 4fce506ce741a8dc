pub mod layer;
pub mod registry;

pub use layer::*;
pub use registry::*;
