pub mod event_bus;
pub mod generation;
pub mod lazy;

pub use event_bus::*;
pub use generation::*;
pub use lazy::*;
