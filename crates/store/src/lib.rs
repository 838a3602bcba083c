pub mod feature_store;
pub mod fetch;

pub use feature_store::*;
pub use fetch::*;
