pub mod changeset;
pub mod condition;
pub mod query;

pub use changeset::{apply_changeset, reported_identifier};
pub use condition::{normalize, normalize_or_all};
pub use query::read_collection;
