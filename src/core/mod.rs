pub mod error;
pub mod types;

pub use error::{DriverError, Result, StoreError, StoreResult};
pub use types::{Condition, ID_FIELD, condition_identifier, merge_documents};
