//! Dependency-ordered, transactional PostgreSQL fixture loading.
//!
//! Resolved relational fixtures are merged per table, ordered so that every
//! table a row references is inserted first, and written in one
//! transaction:
//!
//! 1. `TRUNCATE TABLE "<table>" CASCADE` for every table, in plan order
//! 2. one `INSERT ... RETURNING row_to_json(<alias>)` per table (or per
//!    batch when rows reference rows of their own table)
//! 3. an optional `DO` block restarting user sequences
//!
//! Values returned by the store are captured under each row's `$name` so
//! later statements can substitute `$name.field` references.

#![warn(missing_docs)]

pub mod loader;
pub mod options;
pub mod plan;
pub mod statement;
pub mod store;

pub use loader::PostgresLoader;
pub use options::PostgresLoaderOptions;
pub use plan::{LoadPlan, TablePlan, plan};
pub use statement::{InsertedRows, StatementBuilder};
pub use store::{PgStore, RelationalStore, RelationalTransaction};
