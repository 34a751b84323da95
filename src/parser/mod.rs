pub mod results;
pub mod types;

pub use results::{extract, parse_results, ExtractError};
pub use types::ResultTree;
