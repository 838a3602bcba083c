pub mod config;
pub mod controller;
pub mod export;
pub mod popup;
pub mod state;
pub mod surface;
pub mod transition;

#[cfg(test)]
mod testing;

pub use config::*;
pub use controller::*;
pub use popup::*;
pub use state::*;
pub use surface::*;
pub use transition::*;
