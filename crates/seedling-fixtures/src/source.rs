//! Fixture sources.
//!
//! A source maps a fixture name to its decoded document. The resolver never
//! touches files itself; it asks a [`FixtureSource`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::config::FixtureConfig;
use crate::error::{SeedingError, SeedingResult};

const EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Maps fixture names to decoded documents.
pub trait FixtureSource<D>: Send + Sync {
	/// Fetches and decodes the fixture called `name`.
	fn fetch(&self, name: &str) -> SeedingResult<D>;
}

/// Decodes YAML fixture text, attributing failures to `fixture`.
pub fn decode_yaml<D: DeserializeOwned>(fixture: &str, content: &str) -> SeedingResult<D> {
	serde_yaml::from_str(content).map_err(|e| SeedingError::parse(fixture, e))
}

/// Reads `<name>.yml` / `<name>.yaml` from a list of directories.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
	dirs: Vec<PathBuf>,
}

impl FileSystemSource {
	/// Creates a source searching `dirs` in order.
	pub fn new<I, P>(dirs: I) -> Self
	where
		I: IntoIterator<Item = P>,
		P: Into<PathBuf>,
	{
		Self {
			dirs: dirs.into_iter().map(Into::into).collect(),
		}
	}

	/// Creates a source from validated configuration.
	pub fn from_config(config: &FixtureConfig) -> SeedingResult<Self> {
		config.validate()?;
		Ok(Self::new(config.fixture_dirs.iter().cloned()))
	}

	/// Returns the directories searched by this source.
	pub fn dirs(&self) -> &[PathBuf] {
		&self.dirs
	}

	/// Finds the file backing `name`.
	///
	/// Names that already carry a YAML extension are used as-is, otherwise
	/// `.yml` is tried before `.yaml` in every directory.
	pub fn locate(&self, name: &str) -> SeedingResult<PathBuf> {
		let has_extension = Path::new(name)
			.extension()
			.and_then(|e| e.to_str())
			.is_some_and(|e| EXTENSIONS.contains(&e));

		for dir in &self.dirs {
			if has_extension {
				let candidate = dir.join(name);
				if candidate.is_file() {
					return Ok(candidate);
				}
				continue;
			}
			for ext in EXTENSIONS {
				let candidate = dir.join(format!("{}.{}", name, ext));
				if candidate.is_file() {
					return Ok(candidate);
				}
			}
		}
		Err(SeedingError::FixtureNotFound(name.to_string()))
	}
}

impl<D: DeserializeOwned> FixtureSource<D> for FileSystemSource {
	fn fetch(&self, name: &str) -> SeedingResult<D> {
		let path = self.locate(name)?;
		tracing::debug!(fixture = name, path = %path.display(), "reading fixture");
		let content = std::fs::read_to_string(&path)?;
		decode_yaml(name, &content)
	}
}

/// In-memory YAML documents keyed by fixture name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
	documents: HashMap<String, String>,
}

impl MemorySource {
	/// Creates an empty source.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a YAML document under `name`.
	pub fn with_document(mut self, name: impl Into<String>, yaml: impl Into<String>) -> Self {
		self.documents.insert(name.into(), yaml.into());
		self
	}
}

impl<D: DeserializeOwned> FixtureSource<D> for MemorySource {
	fn fetch(&self, name: &str) -> SeedingResult<D> {
		let content = self
			.documents
			.get(name)
			.ok_or_else(|| SeedingError::FixtureNotFound(name.to_string()))?;
		decode_yaml(name, content)
	}
}
