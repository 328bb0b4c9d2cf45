pub mod extract;

pub use extract::{parse_id, ApiJson, RecordId};
