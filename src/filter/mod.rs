pub mod listing;
pub mod types;

pub use listing::{escape_like, ListingFilter, ALL_TYPES};
pub use types::{ListingOrder, PageRequest, SqlResult};
