pub mod ledger;
pub mod redis;
pub mod sqlite;

pub use ledger::Ledger;
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
pub use sqlite::create_pool;
