//! Loader configuration.
//!
//! Configuration is plain data: structs with `Default`, `with_*` builders and
//! serde support so they can be embedded in a larger settings file. Use
//! [`from_toml_str`] / [`from_toml_file`] to read any of them from TOML.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{SeedingError, SeedingResult};

/// Settings shared by every loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
	/// Directories searched, in order, for fixture files.
	pub fixture_dirs: Vec<PathBuf>,
}

impl FixtureConfig {
	/// Creates an empty configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a fixture directory.
	pub fn with_fixture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.fixture_dirs.push(dir.into());
		self
	}

	/// Fails when no fixture directory is configured.
	pub fn validate(&self) -> SeedingResult<()> {
		if self.fixture_dirs.is_empty() {
			return Err(SeedingError::Config(
				"at least one fixture directory must be configured".to_string(),
			));
		}
		Ok(())
	}
}

/// Deserializes a configuration value from TOML text.
pub fn from_toml_str<T: DeserializeOwned>(content: &str) -> SeedingResult<T> {
	toml::from_str(content).map_err(|e| SeedingError::Config(e.to_string()))
}

/// Reads and deserializes a configuration value from a TOML file.
pub fn from_toml_file<T: DeserializeOwned>(path: &Path) -> SeedingResult<T> {
	let content = std::fs::read_to_string(path)?;
	from_toml_str(&content)
}
