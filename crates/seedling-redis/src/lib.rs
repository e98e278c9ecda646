//! Redis fixture loading.
//!
//! Each database of each resolved fixture becomes one [`WriteBatch`]:
//! `SELECT`, `FLUSHDB` on first use within the load, `SET` per key, `HSET`
//! per hash field, `SADD` per set member and finally `EXPIRE` for sets with
//! expiring members. A batch is sent as a single `MULTI`/`EXEC` pipeline.

#![warn(missing_docs)]

pub mod batch;
pub mod loader;
pub mod options;
pub mod store;

pub use batch::{KvCommand, WriteBatch};
pub use loader::RedisLoader;
pub use options::RedisLoaderOptions;
pub use store::{KeyValueStore, RedisStore};
