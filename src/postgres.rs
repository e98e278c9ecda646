//! PostgreSQL loader.
//!
//! # Examples
//!
//! ```rust,no_run
//! use seedling::postgres::{PostgresLoader, PostgresLoaderOptions};
//! ```

#[cfg(feature = "postgres")]
pub use seedling_postgres::*;
