pub mod event_bus;
pub mod history;

pub use event_bus::*;
pub use history::*;
