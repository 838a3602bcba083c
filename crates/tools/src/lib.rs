pub mod source;
pub mod table;

pub use source::*;
pub use table::*;
