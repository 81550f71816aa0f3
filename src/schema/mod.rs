pub mod actor;
pub mod event;

pub use actor::*;
pub use event::*;
