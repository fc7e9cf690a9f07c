pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use memory::MemoryTableStore;
pub use sqlite::SqliteTableStore;
pub use traits::*;
