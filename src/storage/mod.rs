pub mod engine;
pub mod matcher;
pub mod memory;
pub mod mongo;

pub use engine::{DatabaseInfo, DocumentCursor, DocumentStore, FindSpec, UpdateOutcome};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
