pub mod decisions;
pub mod error;
pub mod memory;
pub mod sqlite;

pub use decisions::DecisionStore;
pub use error::StoreError;
pub use memory::RecentDecisionCache;
pub use sqlite::SqliteStore;
