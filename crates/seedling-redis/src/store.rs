//! Key-value store boundary.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use seedling_fixtures::BoxError;

use crate::batch::WriteBatch;
use crate::options::RedisLoaderOptions;

/// Applies write batches to a key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
	/// Sends every command of `batch` as one `MULTI`/`EXEC` transaction.
	///
	/// Commands rejected while queueing abort the whole transaction.
	/// Errors raised while executing a queued command do not undo the
	/// commands that already ran.
	async fn execute(&self, batch: &WriteBatch) -> Result<(), BoxError>;
}

/// Redis store over a reconnecting connection manager.
#[derive(Clone)]
pub struct RedisStore {
	connection: ConnectionManager,
}

impl RedisStore {
	/// Wraps an existing connection manager.
	pub fn new(connection: ConnectionManager) -> Self {
		Self { connection }
	}

	/// Connects to `url`.
	pub async fn connect(url: &str) -> Result<Self, BoxError> {
		let client = redis::Client::open(url)?;
		let connection = ConnectionManager::new(client).await?;
		Ok(Self::new(connection))
	}

	/// Connects to the URL configured in `options`.
	pub async fn from_options(options: &RedisLoaderOptions) -> Result<Self, BoxError> {
		Self::connect(&options.url).await
	}
}

#[async_trait]
impl KeyValueStore for RedisStore {
	async fn execute(&self, batch: &WriteBatch) -> Result<(), BoxError> {
		let mut pipe = redis::pipe();
		pipe.atomic();
		for command in batch.commands() {
			let mut args = command.args().into_iter();
			let Some(name) = args.next() else {
				continue;
			};
			let mut cmd = redis::cmd(&name);
			for arg in args {
				cmd.arg(arg);
			}
			pipe.add_command(cmd);
		}

		let mut conn = self.connection.clone();
		pipe.query_async::<()>(&mut conn).await?;
		Ok(())
	}
}
