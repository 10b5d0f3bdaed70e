//! Utilities
//!
//! Hashing, time and input validation helpers shared by the memory modules.

mod hashing;
mod time;
mod validation;

pub use hashing::feature_bucket;
pub use time::{format_datetime, now_utc};
pub use validation::{validate_embedding, validate_event, ValidationError};
