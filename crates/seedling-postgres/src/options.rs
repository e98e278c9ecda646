//! PostgreSQL loader options.

use serde::Deserialize;

/// Suffix appended to the table name to build the `INSERT` row alias.
pub const DEFAULT_ALIAS_SUFFIX: &str = "table_gonkey";

/// Value every user sequence is restarted at after a load.
pub const DEFAULT_SEQUENCE_START: i64 = 1_000_000;

/// Options for [`PostgresLoader`](crate::PostgresLoader).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PostgresLoaderOptions {
	/// Suffix of the row alias used by `RETURNING row_to_json(<alias>)`.
	pub alias_suffix: String,

	/// Restart user sequences once all rows are inserted.
	pub restart_sequences: bool,

	/// Value sequences are restarted at.
	pub sequence_start: i64,
}

impl Default for PostgresLoaderOptions {
	fn default() -> Self {
		Self {
			alias_suffix: DEFAULT_ALIAS_SUFFIX.to_string(),
			restart_sequences: true,
			sequence_start: DEFAULT_SEQUENCE_START,
		}
	}
}

impl PostgresLoaderOptions {
	/// Creates default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the row alias suffix.
	pub fn with_alias_suffix(mut self, suffix: impl Into<String>) -> Self {
		self.alias_suffix = suffix.into();
		self
	}

	/// Enables or disables the post-load sequence restart.
	pub fn with_restart_sequences(mut self, restart: bool) -> Self {
		self.restart_sequences = restart;
		self
	}

	/// Sets the value sequences are restarted at.
	pub fn with_sequence_start(mut self, start: i64) -> Self {
		self.sequence_start = start;
		self
	}
}
