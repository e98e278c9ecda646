//! Transactional PostgreSQL fixture loader.

use std::sync::Arc;

use async_trait::async_trait;
use seedling_fixtures::sql::{Row, SqlFixture, SqlFixtureDocument};
use seedling_fixtures::{
	BoxError, FixtureLoader, FixtureResolver, FixtureSource, LoadSummary, ResolveContext,
	SeedingError, SeedingResult,
};
use serde_json::Value;

use crate::options::PostgresLoaderOptions;
use crate::plan::{LoadPlan, TablePlan, plan};
use crate::statement::{InsertedRows, StatementBuilder, sequence_restart_statement};
use crate::store::{RelationalStore, RelationalTransaction};

const TRANSACTION_TARGET: &str = "transaction";
const SEQUENCES_TARGET: &str = "sequences";

/// Loads relational fixtures inside a single transaction.
///
/// A load truncates every table it touches, inserts rows table by table in
/// dependency order and optionally restarts sequences. Any failure rolls
/// the whole load back.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use seedling_fixtures::FileSystemSource;
/// use seedling_postgres::{PgStore, PostgresLoader, PostgresLoaderOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let store = PgStore::connect("postgres://localhost/app_test").await?;
/// let loader = PostgresLoader::new(store, Arc::new(FileSystemSource::new(["fixtures"])))
///     .with_options(PostgresLoaderOptions::new().with_sequence_start(5000));
///
/// let summary = loader.load_fixtures(&["users", "orders"]).await?;
/// println!("{summary}");
/// # Ok(())
/// # }
/// ```
pub struct PostgresLoader<S> {
	store: S,
	source: Arc<dyn FixtureSource<SqlFixtureDocument>>,
	options: PostgresLoaderOptions,
	statements: StatementBuilder,
}

impl<S: RelationalStore> PostgresLoader<S> {
	/// Creates a loader with default options.
	pub fn new(store: S, source: Arc<dyn FixtureSource<SqlFixtureDocument>>) -> Self {
		let options = PostgresLoaderOptions::default();
		let statements = StatementBuilder::new(options.alias_suffix.clone());
		Self {
			store,
			source,
			options,
			statements,
		}
	}

	/// Replaces the loader options.
	pub fn with_options(mut self, options: PostgresLoaderOptions) -> Self {
		self.statements = StatementBuilder::new(options.alias_suffix.clone());
		self.options = options;
		self
	}

	/// Current options.
	pub fn options(&self) -> &PostgresLoaderOptions {
		&self.options
	}

	/// Underlying store.
	pub fn store(&self) -> &S {
		&self.store
	}

	/// Resolves `names` against a fresh registry.
	pub fn resolve<N: AsRef<str>>(&self, names: &[N]) -> SeedingResult<Vec<Arc<SqlFixture>>> {
		let mut ctx = ResolveContext::new();
		let mut resolver = FixtureResolver::<SqlFixtureDocument, _>::new(self.source.as_ref());
		resolver.resolve_all(&mut ctx, names)
	}

	/// Resolves `names` and computes their load plan without touching the store.
	pub fn plan<N: AsRef<str>>(&self, names: &[N]) -> SeedingResult<LoadPlan> {
		let fixtures = self.resolve(names)?;
		plan(fixtures.iter().map(Arc::as_ref))
	}

	/// Resolves, plans and loads `names`.
	///
	/// # Errors
	///
	/// Resolution and planning errors are returned before the store is
	/// contacted. Store errors are returned as [`SeedingError::StoreWrite`]
	/// after the transaction has been rolled back.
	pub async fn load_fixtures<N: AsRef<str>>(&self, names: &[N]) -> SeedingResult<LoadSummary> {
		let fixtures = self.resolve(names)?;
		let load_plan = plan(fixtures.iter().map(Arc::as_ref))?;

		let summary = LoadSummary {
			fixtures: fixtures.iter().map(|f| f.name.clone()).collect(),
			targets: load_plan
				.table_names()
				.into_iter()
				.map(str::to_string)
				.collect(),
			records: load_plan.row_count(),
		};

		if load_plan.is_empty() {
			tracing::debug!(fixtures = ?summary.fixtures, "no tables to load");
			return Ok(summary);
		}

		self.execute_plan(&load_plan).await?;
		tracing::info!(
			fixtures = ?summary.fixtures,
			tables = summary.targets.len(),
			rows = summary.records,
			"loaded relational fixtures"
		);
		Ok(summary)
	}

	/// Runs `load_plan` in one transaction, returning the named rows the
	/// store confirmed.
	pub async fn execute_plan(&self, load_plan: &LoadPlan) -> SeedingResult<InsertedRows> {
		let mut tx = self
			.store
			.begin()
			.await
			.map_err(|e| SeedingError::store_write(TRANSACTION_TARGET, "begin", e))?;

		match self.run(tx.as_mut(), load_plan).await {
			Ok(inserted) => {
				tx.commit()
					.await
					.map_err(|e| SeedingError::store_write(TRANSACTION_TARGET, "commit", e))?;
				Ok(inserted)
			}
			Err(error) => {
				if let Err(rollback_error) = tx.rollback().await {
					tracing::warn!(error = %rollback_error, "failed to roll back fixture load");
				} else {
					tracing::warn!(error = %error, "fixture load rolled back");
				}
				Err(error)
			}
		}
	}

	async fn run(
		&self,
		tx: &mut dyn RelationalTransaction,
		load_plan: &LoadPlan,
	) -> SeedingResult<InsertedRows> {
		for table in load_plan.tables() {
			let sql = self.statements.truncate(&table.name);
			tracing::debug!(table = %table.name, "truncating table");
			tx.execute(&sql)
				.await
				.map_err(|e| SeedingError::store_write(&table.name, "truncate", e))?;
		}

		let mut inserted = InsertedRows::new();
		for table in load_plan.tables() {
			self.insert_table(tx, table, &mut inserted).await?;
		}

		if self.options.restart_sequences {
			let sql = sequence_restart_statement(self.options.sequence_start);
			tx.execute(&sql)
				.await
				.map_err(|e| SeedingError::store_write(SEQUENCES_TARGET, "restart sequences", e))?;
		}

		Ok(inserted)
	}

	async fn insert_table(
		&self,
		tx: &mut dyn RelationalTransaction,
		table: &TablePlan,
		inserted: &mut InsertedRows,
	) -> SeedingResult<()> {
		for batch in &table.batches {
			let sql = self.statements.insert(&table.name, batch, inserted)?;
			tracing::debug!(table = %table.name, rows = batch.len(), "inserting rows");
			let returned = tx
				.fetch_json(&sql)
				.await
				.map_err(|e| SeedingError::store_write(&table.name, "insert", e))?;
			capture_returned(&table.name, batch, returned, inserted)?;
		}
		Ok(())
	}
}

/// Stores the returned projection of every named row.
fn capture_returned(
	table: &str,
	rows: &[Row],
	returned: Vec<Value>,
	inserted: &mut InsertedRows,
) -> SeedingResult<()> {
	if returned.len() != rows.len() {
		let message = format!(
			"expected {} returned row(s), got {}",
			rows.len(),
			returned.len()
		);
		return Err(SeedingError::store_write(
			table,
			"capture returned rows",
			BoxError::from(message),
		));
	}

	for (row, value) in rows.iter().zip(returned) {
		let Some(name) = &row.name else {
			continue;
		};
		let value = match value {
			Value::String(text) => serde_json::from_str(&text)
				.map_err(|e| SeedingError::store_write(table, "decode returned row", e))?,
			other => other,
		};
		inserted.insert(name.clone(), value);
	}
	Ok(())
}

#[async_trait]
impl<S: RelationalStore> FixtureLoader for PostgresLoader<S> {
	async fn load(&self, names: &[String]) -> SeedingResult<LoadSummary> {
		self.load_fixtures(names).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use seedling_fixtures::{FieldValue, ValueSet};
	use serde_json::json;

	fn named(name: &str) -> Row {
		let mut fields = ValueSet::new();
		fields.insert("f".to_string(), FieldValue::Bool(true));
		Row::new(fields).with_name(name)
	}

	#[rstest]
	fn test_capture_parses_text_projection() {
		let rows = vec![named("a"), Row::new(ValueSet::new())];
		let mut inserted = InsertedRows::new();
		capture_returned(
			"t",
			&rows,
			vec![json!("{\"id\":7}"), json!({"id": 8})],
			&mut inserted,
		)
		.unwrap();

		assert_eq!(inserted.len(), 1);
		assert_eq!(inserted["a"], json!({"id": 7}));
	}

	#[rstest]
	fn test_capture_rejects_count_mismatch() {
		let rows = vec![named("a"), named("b")];
		let mut inserted = InsertedRows::new();
		let result = capture_returned("t", &rows, vec![json!({"id": 1})], &mut inserted);
		assert!(matches!(
			result,
			Err(SeedingError::StoreWrite { target, .. }) if target == "t"
		));
	}
}
