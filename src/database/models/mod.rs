pub mod listing;
pub mod user;

pub use listing::{missing_required, ImagesInput, Listing, ListingInput, ListingRow, ListingStatus, NewListing};
pub use user::{NewUser, UserAccount};
