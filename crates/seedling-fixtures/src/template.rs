//! Template registry.
//!
//! Templates are named, reusable value-sets. A template (or a record) may
//! `$extend` another one: the parent's resolved values are copied and the
//! child's own values are laid over them, key by key.
//!
//! The registry lives in a [`ResolveContext`] that is created per load and
//! passed explicitly through the resolver. Nothing here is global.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{SeedingError, SeedingResult};
use crate::kv::{KeyValue, SetMember};
use crate::value::FieldValue;

/// Ordered mapping of field/member name to value.
pub type ValueSet<V> = IndexMap<String, V>;

/// Kind of a registry entry. Names are unique per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
	/// Scalar key/value pairs.
	Keys,
	/// Hash map field/value pairs.
	Map,
	/// Set members.
	Set,
	/// Relational row fields.
	Row,
}

impl TemplateKind {
	/// Human-readable kind name used in error messages.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Keys => "keys",
			Self::Map => "map",
			Self::Set => "set",
			Self::Row => "row",
		}
	}
}

/// Lays `own` over `base`. Keys already present keep their position, new
/// keys are appended in `own` order.
pub fn overlay<V: Clone>(base: &mut ValueSet<V>, own: &ValueSet<V>) {
	for (key, value) in own {
		base.insert(key.clone(), value.clone());
	}
}

/// Named value-sets of a single kind.
#[derive(Debug, Clone)]
pub struct TemplateStore<V> {
	kind: TemplateKind,
	entries: HashMap<String, ValueSet<V>>,
}

impl<V: Clone> TemplateStore<V> {
	/// Creates an empty store for `kind`.
	pub fn new(kind: TemplateKind) -> Self {
		Self {
			kind,
			entries: HashMap::new(),
		}
	}

	/// Returns the kind of entries held by this store.
	pub fn kind(&self) -> TemplateKind {
		self.kind
	}

	/// Registers a resolved value-set under `name`.
	///
	/// # Errors
	///
	/// Returns [`SeedingError::DuplicateName`] if `name` is already taken.
	pub fn register(&mut self, name: &str, values: ValueSet<V>) -> SeedingResult<()> {
		if self.entries.contains_key(name) {
			return Err(SeedingError::DuplicateName {
				kind: self.kind.as_str(),
				name: name.to_string(),
			});
		}
		tracing::trace!(kind = self.kind.as_str(), name, "registered template");
		self.entries.insert(name.to_string(), values);
		Ok(())
	}

	/// Returns an owned copy of the value-set registered under `name`.
	///
	/// # Errors
	///
	/// Returns [`SeedingError::TemplateNotFound`] if `name` is unknown.
	pub fn resolve(&self, name: &str) -> SeedingResult<ValueSet<V>> {
		self.entries
			.get(name)
			.cloned()
			.ok_or_else(|| SeedingError::TemplateNotFound {
				kind: self.kind.as_str(),
				name: name.to_string(),
			})
	}

	/// Merges `own` over the resolved `parent`, or copies `own` when there is
	/// no parent. The stored parent is never modified.
	pub fn extend(&self, parent: Option<&str>, own: &ValueSet<V>) -> SeedingResult<ValueSet<V>> {
		match parent {
			Some(parent) => {
				let mut merged = self.resolve(parent)?;
				overlay(&mut merged, own);
				Ok(merged)
			}
			None => Ok(own.clone()),
		}
	}

	/// Returns the value-set registered under `name`, if any.
	pub fn get(&self, name: &str) -> Option<&ValueSet<V>> {
		self.entries.get(name)
	}

	/// Returns true if `name` is registered.
	pub fn contains(&self, name: &str) -> bool {
		self.entries.contains_key(name)
	}

	/// Returns the number of registered entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Per-load registry of every template kind.
///
/// Row templates and `$name`d rows share one namespace, so both are usable
/// as `$extend` targets.
#[derive(Debug, Clone)]
pub struct ResolveContext {
	/// Scalar key templates.
	pub keys: TemplateStore<KeyValue>,
	/// Hash map templates.
	pub maps: TemplateStore<String>,
	/// Set templates.
	pub sets: TemplateStore<SetMember>,
	/// Row templates and named rows, as authored.
	pub rows: TemplateStore<FieldValue>,
}

impl ResolveContext {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self {
			keys: TemplateStore::new(TemplateKind::Keys),
			maps: TemplateStore::new(TemplateKind::Map),
			sets: TemplateStore::new(TemplateKind::Set),
			rows: TemplateStore::new(TemplateKind::Row),
		}
	}
}

impl Default for ResolveContext {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::time::Duration;

	fn values(pairs: &[(&str, &str)]) -> ValueSet<String> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[rstest]
	fn test_three_level_extends_chain() {
		let mut store = TemplateStore::new(TemplateKind::Map);

		let grandparent = store.extend(None, &values(&[("a", "1"), ("b", "2")])).unwrap();
		store.register("grandparent", grandparent).unwrap();

		let parent = store
			.extend(Some("grandparent"), &values(&[("b", "20"), ("c", "3")]))
			.unwrap();
		store.register("parent", parent).unwrap();

		let child = store
			.extend(Some("parent"), &values(&[("c", "30"), ("d", "4")]))
			.unwrap();
		store.register("child", child).unwrap();

		let resolved = store.resolve("child").unwrap();
		assert_eq!(
			resolved,
			values(&[("a", "1"), ("b", "20"), ("c", "30"), ("d", "4")])
		);
		// Keys keep the position they were first declared at.
		let keys: Vec<&str> = resolved.keys().map(String::as_str).collect();
		assert_eq!(keys, vec!["a", "b", "c", "d"]);

		// Parents are untouched by their children's overrides.
		assert_eq!(
			store.resolve("parent").unwrap(),
			values(&[("a", "1"), ("b", "20"), ("c", "3")])
		);
		assert_eq!(
			store.resolve("grandparent").unwrap(),
			values(&[("a", "1"), ("b", "2")])
		);
	}

	#[rstest]
	fn test_register_duplicate_name() {
		let mut store = TemplateStore::new(TemplateKind::Keys);
		store.register("base", ValueSet::<KeyValue>::new()).unwrap();

		let result = store.register("base", ValueSet::new());
		assert!(matches!(
			result,
			Err(SeedingError::DuplicateName { kind: "keys", .. })
		));
	}

	#[rstest]
	fn test_same_name_in_different_kinds() {
		let mut ctx = ResolveContext::new();
		ctx.maps.register("shared", ValueSet::new()).unwrap();
		ctx.sets.register("shared", ValueSet::new()).unwrap();
		assert!(ctx.maps.contains("shared"));
		assert!(ctx.sets.contains("shared"));
		assert!(ctx.keys.is_empty());
	}

	#[rstest]
	fn test_extend_unknown_parent() {
		let store = TemplateStore::<String>::new(TemplateKind::Map);
		let result = store.extend(Some("missing"), &ValueSet::new());
		match result {
			Err(SeedingError::TemplateNotFound { kind, name }) => {
				assert_eq!(kind, "map");
				assert_eq!(name, "missing");
			}
			other => panic!("expected TemplateNotFound, got {:?}", other),
		}
	}

	#[rstest]
	fn test_resolved_copy_does_not_alias_parent() {
		let mut store = TemplateStore::new(TemplateKind::Set);
		let mut parent = ValueSet::new();
		parent.insert(
			"a".to_string(),
			SetMember {
				expiration: Some(Duration::from_secs(10)),
			},
		);
		parent.insert("b".to_string(), SetMember::default());
		store.register("parent", parent).unwrap();

		let mut copy = store.resolve("parent").unwrap();
		copy.get_mut("a").unwrap().expiration = None;
		copy.insert("c".to_string(), SetMember::default());

		let stored = store.get("parent").unwrap();
		assert_eq!(stored.len(), 2);
		assert_eq!(stored["a"].expiration, Some(Duration::from_secs(10)));
	}
}
