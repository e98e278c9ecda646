//! # Seedling
//!
//! Declarative YAML fixtures for integration tests against PostgreSQL and
//! Redis.
//!
//! Fixtures are YAML documents describing rows per table or keys, hashes and
//! sets per database. Documents can inherit templates from other documents,
//! extend templates and named records with `$extend`, and reference values
//! the database generated for earlier rows with `$row.field`.
//!
//! ## Feature Flags
//!
//! - `postgres` (default) - transactional, dependency-ordered relational loader
//! - `redis` (default) - per-database atomic key-value loader
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use seedling::postgres::{PgStore, PostgresLoader};
//! use seedling::{FileSystemSource, FixtureConfig, FixtureLoader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = FixtureConfig::new().with_fixture_dir("tests/fixtures");
//! let source = Arc::new(FileSystemSource::from_config(&config)?);
//! let store = PgStore::connect("postgres://localhost/app_test").await?;
//!
//! let loader = PostgresLoader::new(store, source);
//! let summary = loader.load(&["users".to_string(), "orders".to_string()]).await?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub use seedling_fixtures::{
	BoxError, FieldValue, FileSystemSource, FixtureConfig, FixtureDocument, FixtureLoader,
	FixtureResolver, FixtureSource, LoadSummary, MemorySource, ResolveContext, RowReference,
	SeedingError, SeedingResult,
};

pub mod fixtures;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "redis")]
pub mod redis;
