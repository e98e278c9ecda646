//! Error types for fixture resolution and loading.
//!
//! Every component returns the first error it encounters; loaders attach
//! the table or database they were writing to before handing the error back.

use thiserror::Error;

/// Boxed error coming from a store driver (sqlx, redis, ...).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while resolving or loading fixtures.
#[derive(Debug, Error)]
pub enum SeedingError {
	/// A fixture document is malformed.
	#[error("Parse error in fixture '{fixture}': {message}")]
	Parse {
		/// Fixture the document belongs to.
		fixture: String,
		/// What went wrong.
		message: String,
	},

	/// No fixture with the given name could be located.
	#[error("Fixture not found: {0}")]
	FixtureNotFound(String),

	/// Fixtures inherit from each other in a loop.
	#[error("Fixture inheritance cycle: {}", .0.join(" -> "))]
	InheritanceCycle(Vec<String>),

	/// A template or named record was registered twice for the same kind.
	#[error("Duplicate {kind} name: {name}")]
	DuplicateName {
		/// Kind of the registry entry.
		kind: &'static str,
		/// Offending name.
		name: String,
	},

	/// An `$extend` reference names a template that is not registered.
	#[error("{kind} template not found: {name}")]
	TemplateNotFound {
		/// Kind of the registry entry.
		kind: &'static str,
		/// Missing name.
		name: String,
	},

	/// Tables reference each other in a loop.
	#[error("Cyclic reference between tables: {}", .0.join(", "))]
	CyclicReference(Vec<String>),

	/// A reference expression points at a row that was never defined or inserted.
	#[error("Unresolved reference ${row}.{field}: {reason}")]
	UnresolvedReference {
		/// Referenced row name.
		row: String,
		/// Referenced field.
		field: String,
		/// Why the reference could not be resolved.
		reason: String,
	},

	/// The target store rejected a write.
	#[error("Store write failed for {target} ({context}): {source}")]
	StoreWrite {
		/// Table or database being written.
		target: String,
		/// Operation that failed.
		context: String,
		/// Underlying driver error.
		#[source]
		source: BoxError,
	},

	/// Loader configuration is invalid.
	#[error("Configuration error: {0}")]
	Config(String),

	/// I/O operation failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl SeedingError {
	/// Builds a parse error for the given fixture.
	pub fn parse(fixture: impl Into<String>, message: impl std::fmt::Display) -> Self {
		Self::Parse {
			fixture: fixture.into(),
			message: message.to_string(),
		}
	}

	/// Wraps a driver error with the target it was writing to.
	pub fn store_write(
		target: impl Into<String>,
		context: impl Into<String>,
		source: impl Into<BoxError>,
	) -> Self {
		Self::StoreWrite {
			target: target.into(),
			context: context.into(),
			source: source.into(),
		}
	}
}

/// Result type alias for seeding operations.
pub type SeedingResult<T> = Result<T, SeedingError>;
