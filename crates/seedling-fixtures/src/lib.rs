//! Fixture documents, template registry and inheritance resolution.
//!
//! This crate is store-agnostic. It turns fixture documents into fully
//! merged datasets that the store crates (`seedling-postgres`,
//! `seedling-redis`) write out.
//!
//! # Architecture
//!
//! - [`ResolveContext`] - per-load registry of templates and named records
//! - [`FixtureResolver`] - resolves a fixture after everything it inherits
//! - [`FixtureSource`] - maps fixture names to decoded documents
//! - [`kv`] - key-value documents (keys, hash maps, sets)
//! - [`sql`] - relational documents (rows per table)
//! - [`FieldValue`] - closed set of relational value kinds
//!
//! # Example
//!
//! ```
//! use seedling_fixtures::{FixtureResolver, MemorySource, ResolveContext};
//! use seedling_fixtures::sql::SqlFixtureDocument;
//!
//! let source = MemorySource::new().with_document(
//!     "users",
//!     "tables:\n  users:\n    - $name: alice\n      email: alice@example.com\n",
//! );
//! let mut ctx = ResolveContext::new();
//! let mut resolver = FixtureResolver::<SqlFixtureDocument, _>::new(&source);
//! let fixture = resolver.resolve(&mut ctx, "users").unwrap();
//! assert_eq!(fixture.tables[0].rows.len(), 1);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod kv;
pub mod loader;
pub mod resolver;
pub mod source;
pub mod sql;
pub mod template;
pub mod value;

pub use config::FixtureConfig;
pub use error::{BoxError, SeedingError, SeedingResult};
pub use loader::{FixtureLoader, LoadSummary};
pub use resolver::{FixtureDocument, FixtureResolver};
pub use source::{FileSystemSource, FixtureSource, MemorySource};
pub use template::{ResolveContext, TemplateKind, TemplateStore, ValueSet};
pub use value::{FieldValue, RowReference};
