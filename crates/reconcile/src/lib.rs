pub mod issue;
pub mod machine;
pub mod state;

pub use issue::*;
pub use machine::*;
pub use state::*;
