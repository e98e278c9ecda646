//! Redis fixture loader.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use seedling_fixtures::kv::{DatabaseId, KvFixture, KvFixtureDocument};
use seedling_fixtures::{
	FixtureLoader, FixtureResolver, FixtureSource, LoadSummary, ResolveContext, SeedingError,
	SeedingResult,
};

use crate::batch::WriteBatch;
use crate::options::RedisLoaderOptions;
use crate::store::KeyValueStore;

/// Loads key-value fixtures, one atomic batch per fixture database.
///
/// Every database is flushed the first time a load writes to it, so two
/// fixtures targeting the same database both keep their data.
pub struct RedisLoader<S> {
	store: S,
	source: Arc<dyn FixtureSource<KvFixtureDocument>>,
	options: RedisLoaderOptions,
}

impl<S: KeyValueStore> RedisLoader<S> {
	/// Creates a loader with default options.
	pub fn new(store: S, source: Arc<dyn FixtureSource<KvFixtureDocument>>) -> Self {
		Self {
			store,
			source,
			options: RedisLoaderOptions::default(),
		}
	}

	/// Replaces the loader options.
	pub fn with_options(mut self, options: RedisLoaderOptions) -> Self {
		self.options = options;
		self
	}

	/// Current options.
	pub fn options(&self) -> &RedisLoaderOptions {
		&self.options
	}

	/// Underlying store.
	pub fn store(&self) -> &S {
		&self.store
	}

	/// Resolves `names` against a fresh registry.
	pub fn resolve<N: AsRef<str>>(&self, names: &[N]) -> SeedingResult<Vec<Arc<KvFixture>>> {
		let mut ctx = ResolveContext::new();
		let mut resolver = FixtureResolver::<KvFixtureDocument, _>::new(self.source.as_ref());
		resolver.resolve_all(&mut ctx, names)
	}

	/// Builds the write batches for `fixtures` in load order.
	pub fn batches(&self, fixtures: &[Arc<KvFixture>]) -> Vec<WriteBatch> {
		let mut flushed: HashSet<DatabaseId> = HashSet::new();
		let mut batches = Vec::new();
		for fixture in fixtures {
			for (&database, data) in &fixture.databases {
				let flush = self.options.flush_databases && flushed.insert(database);
				batches.push(WriteBatch::for_database(database, data, flush));
			}
		}
		batches
	}

	/// Resolves and loads `names`.
	///
	/// # Errors
	///
	/// Resolution errors are returned before the store is contacted. A
	/// rejected batch stops the load with [`SeedingError::StoreWrite`];
	/// batches already applied stay applied.
	pub async fn load_fixtures<N: AsRef<str>>(&self, names: &[N]) -> SeedingResult<LoadSummary> {
		let fixtures = self.resolve(names)?;
		let batches = self.batches(&fixtures);

		let mut summary = LoadSummary {
			fixtures: fixtures.iter().map(|f| f.name.clone()).collect(),
			..LoadSummary::default()
		};
		for batch in &batches {
			let target = database_target(batch.database());
			tracing::debug!(
				database = batch.database(),
				flush = batch.flushes(),
				commands = batch.commands().len(),
				"executing redis batch"
			);
			self.store
				.execute(batch)
				.await
				.map_err(|e| SeedingError::store_write(&target, "exec", e))?;

			summary.records += batch.record_count();
			if !summary.targets.contains(&target) {
				summary.targets.push(target);
			}
		}

		tracing::info!(
			fixtures = ?summary.fixtures,
			databases = summary.targets.len(),
			records = summary.records,
			"loaded redis fixtures"
		);
		Ok(summary)
	}
}

fn database_target(database: DatabaseId) -> String {
	format!("db {}", database)
}

#[async_trait]
impl<S: KeyValueStore> FixtureLoader for RedisLoader<S> {
	async fn load(&self, names: &[String]) -> SeedingResult<LoadSummary> {
		self.load_fixtures(names).await
	}
}
