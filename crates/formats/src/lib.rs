pub mod risk_dataset;
pub mod sample;
pub mod taxonomy;

pub use risk_dataset::*;
pub use sample::*;
pub use taxonomy::*;
