pub mod engine;
pub mod store;
pub mod strategy;
pub mod warming;

pub use engine::{CacheContext, CacheEngine, Fetched, RefreshSignal};
pub use store::{CacheStats, CacheStore, MemoryStore, StoreError};
pub use strategy::{CacheStrategy, QueryType};
pub use warming::{WarmupEntry, warm_startup};
