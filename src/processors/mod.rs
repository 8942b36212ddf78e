pub mod sync_engine;

pub use sync_engine::{MergeDecision, SyncEngine, SyncReport};
