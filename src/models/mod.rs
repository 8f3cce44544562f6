pub mod listing;
pub mod sheet;

pub use listing::*;
pub use sheet::*;
