pub mod layer;
pub mod raster;
pub mod symbology;
pub mod terrain;

pub use layer::*;
