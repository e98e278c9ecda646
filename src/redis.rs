//! Redis loader.
//!
//! # Examples
//!
//! ```rust,no_run
//! use seedling::redis::{RedisLoader, RedisLoaderOptions, RedisStore};
//! ```

#[cfg(feature = "redis")]
pub use seedling_redis::*;
