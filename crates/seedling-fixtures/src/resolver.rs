//! Fixture resolution.
//!
//! Resolving a fixture first resolves everything it `inherits` (which only
//! contributes templates and named records to the registry), then registers
//! the fixture's own templates, then merges its records.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{SeedingError, SeedingResult};
use crate::source::FixtureSource;
use crate::template::ResolveContext;

/// A decoded fixture document that can be merged against the registry.
pub trait FixtureDocument: DeserializeOwned {
	/// Fully merged data produced by this document.
	type Resolved;

	/// Fixtures that must be resolved before this one.
	fn inherits(&self) -> &[String];

	/// Registers this document's templates and merges its records.
	///
	/// Called after every inherited fixture has been resolved.
	fn resolve(self, fixture: &str, ctx: &mut ResolveContext) -> SeedingResult<Self::Resolved>;
}

/// Resolves fixtures by name, each at most once per resolver.
pub struct FixtureResolver<'s, D: FixtureDocument, S: ?Sized> {
	source: &'s S,
	resolved: HashMap<String, Arc<D::Resolved>>,
	stack: Vec<String>,
}

impl<'s, D, S> FixtureResolver<'s, D, S>
where
	D: FixtureDocument,
	S: FixtureSource<D> + ?Sized,
{
	/// Creates a resolver reading documents from `source`.
	pub fn new(source: &'s S) -> Self {
		Self {
			source,
			resolved: HashMap::new(),
			stack: Vec::new(),
		}
	}

	/// Resolves `name` and everything it inherits.
	///
	/// A fixture that was already resolved is returned from cache without
	/// touching the registry again.
	///
	/// # Errors
	///
	/// Returns [`SeedingError::InheritanceCycle`] when `name` (transitively)
	/// inherits itself, or the first error raised by the source or registry.
	pub fn resolve(
		&mut self,
		ctx: &mut ResolveContext,
		name: &str,
	) -> SeedingResult<Arc<D::Resolved>> {
		if let Some(done) = self.resolved.get(name) {
			return Ok(Arc::clone(done));
		}
		if let Some(pos) = self.stack.iter().position(|n| n == name) {
			let mut chain = self.stack[pos..].to_vec();
			chain.push(name.to_string());
			return Err(SeedingError::InheritanceCycle(chain));
		}

		let document: D = self.source.fetch(name)?;
		self.stack.push(name.to_string());
		let result = self.resolve_document(ctx, name, document);
		self.stack.pop();

		let resolved = Arc::new(result?);
		self.resolved.insert(name.to_string(), Arc::clone(&resolved));
		Ok(resolved)
	}

	fn resolve_document(
		&mut self,
		ctx: &mut ResolveContext,
		name: &str,
		document: D,
	) -> SeedingResult<D::Resolved> {
		for parent in document.inherits().to_vec() {
			tracing::trace!(fixture = name, parent = %parent, "resolving inherited fixture");
			self.resolve(ctx, &parent)?;
		}
		document.resolve(name, ctx)
	}

	/// Resolves every fixture in `names`, in order.
	///
	/// A name listed more than once is only returned the first time.
	pub fn resolve_all<N: AsRef<str>>(
		&mut self,
		ctx: &mut ResolveContext,
		names: &[N],
	) -> SeedingResult<Vec<Arc<D::Resolved>>> {
		let mut seen = HashSet::new();
		let mut fixtures = Vec::with_capacity(names.len());
		for name in names {
			let name = name.as_ref();
			if !seen.insert(name.to_string()) {
				continue;
			}
			fixtures.push(self.resolve(ctx, name)?);
		}
		Ok(fixtures)
	}
}
