//! Redis loader options.

use serde::Deserialize;

/// Address used when none is configured.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Options for [`RedisLoader`](crate::RedisLoader) and [`RedisStore`](crate::RedisStore).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedisLoaderOptions {
	/// Connection URL.
	pub url: String,

	/// Flush every database the first time a load writes to it.
	pub flush_databases: bool,
}

impl Default for RedisLoaderOptions {
	fn default() -> Self {
		Self {
			url: DEFAULT_REDIS_URL.to_string(),
			flush_databases: true,
		}
	}
}

impl RedisLoaderOptions {
	/// Creates default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the connection URL.
	pub fn with_url(mut self, url: impl Into<String>) -> Self {
		self.url = url.into();
		self
	}

	/// Enables or disables flushing databases before the first write.
	pub fn with_flush_databases(mut self, flush: bool) -> Self {
		self.flush_databases = flush;
		self
	}
}
