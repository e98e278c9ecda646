//! Loads the fixtures under `tests/fixtures` against a recording store.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rstest::{fixture, rstest};
use seedling_fixtures::kv::{DatabaseId, KvFixtureDocument};
use seedling_fixtures::{BoxError, FileSystemSource, FixtureLoader, FixtureSource, SeedingError};
use seedling_redis::{KeyValueStore, RedisLoader, RedisLoaderOptions, WriteBatch};

/// Store that renders every executed batch as one `MULTI ... EXEC` block.
#[derive(Clone, Default)]
struct RecordingStore {
	executed: Arc<Mutex<Vec<Vec<String>>>>,
	fail_database: Option<DatabaseId>,
}

impl RecordingStore {
	fn failing_on(database: DatabaseId) -> Self {
		Self {
			fail_database: Some(database),
			..Self::default()
		}
	}

	fn executed(&self) -> Vec<Vec<String>> {
		self.executed.lock().clone()
	}
}

#[async_trait]
impl KeyValueStore for RecordingStore {
	async fn execute(&self, batch: &WriteBatch) -> Result<(), BoxError> {
		if self.fail_database == Some(batch.database()) {
			return Err("EXECABORT Transaction discarded because of previous errors.".into());
		}
		let commands = batch.commands().iter().map(ToString::to_string).collect();
		self.executed.lock().push(commands);
		Ok(())
	}
}

#[fixture]
fn source() -> Arc<dyn FixtureSource<KvFixtureDocument>> {
	Arc::new(FileSystemSource::new([
		PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
	]))
}

#[rstest]
#[tokio::test]
async fn test_database_flushed_once_per_load(source: Arc<dyn FixtureSource<KvFixtureDocument>>) {
	let store = RecordingStore::default();
	let loader = RedisLoader::new(store.clone(), source);

	let summary = loader
		.load_fixtures(&["sessions", "profiles"])
		.await
		.unwrap();

	assert_eq!(
		store.executed(),
		vec![
			vec![
				"SELECT 1",
				"FLUSHDB",
				"SET session:alice token-a EX 1800",
				"SET session:bob token-b",
				"SADD online alice",
				"SADD online bob",
				"EXPIRE online 60",
			],
			vec![
				"SELECT 1",
				"HSET profile:alice locale en",
				"HSET profile:alice theme dark",
			],
			vec!["SELECT 2", "FLUSHDB", "SET counter 42"],
		]
	);
	assert_eq!(summary.fixtures, vec!["sessions", "profiles"]);
	assert_eq!(summary.targets, vec!["db 1", "db 2"]);
	assert_eq!(summary.records, 7);
}

#[rstest]
#[tokio::test]
async fn test_flush_can_be_disabled(source: Arc<dyn FixtureSource<KvFixtureDocument>>) {
	let store = RecordingStore::default();
	let loader = RedisLoader::new(store.clone(), source)
		.with_options(RedisLoaderOptions::new().with_flush_databases(false));

	loader.load_fixtures(&["profiles"]).await.unwrap();

	let executed = store.executed();
	assert_eq!(executed.len(), 2);
	assert!(executed.iter().flatten().all(|command| command != "FLUSHDB"));
}

#[rstest]
#[tokio::test]
async fn test_resolution_error_writes_nothing(source: Arc<dyn FixtureSource<KvFixtureDocument>>) {
	let store = RecordingStore::default();
	let loader = RedisLoader::new(store.clone(), source);

	let error = loader
		.load_fixtures(&["sessions", "broken"])
		.await
		.unwrap_err();

	match error {
		SeedingError::TemplateNotFound { kind, name } => {
			assert_eq!(kind, "map");
			assert_eq!(name, "missingProfile");
		}
		other => panic!("expected TemplateNotFound, got {:?}", other),
	}
	assert!(store.executed().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_rejected_batch_reports_database(source: Arc<dyn FixtureSource<KvFixtureDocument>>) {
	let store = RecordingStore::failing_on(2);
	let loader: Box<dyn FixtureLoader> = Box::new(RedisLoader::new(store.clone(), source));

	let error = loader
		.load(&["sessions".to_string(), "profiles".to_string()])
		.await
		.unwrap_err();

	match error {
		SeedingError::StoreWrite { target, context, .. } => {
			assert_eq!(target, "db 2");
			assert_eq!(context, "exec");
		}
		other => panic!("expected StoreWrite, got {:?}", other),
	}
	// Batches issued before the failure stay applied.
	assert_eq!(store.executed().len(), 2);
}

#[rstest]
fn test_batches_follow_request_order(source: Arc<dyn FixtureSource<KvFixtureDocument>>) {
	let loader = RedisLoader::new(RecordingStore::default(), source);
	let fixtures = loader.resolve(&["profiles", "sessions", "profiles"]).unwrap();
	let batches = loader.batches(&fixtures);

	let order: Vec<(DatabaseId, bool)> = batches
		.iter()
		.map(|batch| (batch.database(), batch.flushes()))
		.collect();
	assert_eq!(order, vec![(1, true), (2, true), (1, false)]);
}
