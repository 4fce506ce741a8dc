pub mod closest;
pub mod selectable;

pub use closest::*;
pub use selectable::*;
