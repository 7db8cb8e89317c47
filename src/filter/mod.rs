pub mod types;
pub mod filter_where;
pub mod error;

pub use types::*;
pub use filter_where::FilterWhere;
pub use error::FilterError;
