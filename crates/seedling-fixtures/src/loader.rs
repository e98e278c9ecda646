//! Common loader interface.

use std::fmt;

use async_trait::async_trait;

use crate::error::SeedingResult;

/// Statistics of a completed load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
	/// Fixtures that contributed data, in load order.
	pub fixtures: Vec<String>,
	/// Tables or databases written, in write order.
	pub targets: Vec<String>,
	/// Rows, keys, fields and members written.
	pub records: usize,
}

impl fmt::Display for LoadSummary {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"loaded {} record(s) into {} target(s) from {} fixture(s)",
			self.records,
			self.targets.len(),
			self.fixtures.len()
		)
	}
}

/// Loads named fixtures into a store.
///
/// Implementations resolve, plan and write; the first unrecoverable error
/// aborts the load.
#[async_trait]
pub trait FixtureLoader: Send + Sync {
	/// Loads `names` in order.
	async fn load(&self, names: &[String]) -> SeedingResult<LoadSummary>;
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_summary_display() {
		let summary = LoadSummary {
			fixtures: vec!["users".to_string()],
			targets: vec!["users".to_string(), "orders".to_string()],
			records: 7,
		};
		assert_eq!(
			summary.to_string(),
			"loaded 7 record(s) into 2 target(s) from 1 fixture(s)"
		);
	}
}
