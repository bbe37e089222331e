mod analytics;
mod tenant;

pub use analytics::*;
pub use tenant::*;
