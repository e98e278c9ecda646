//! Key-value fixture documents.
//!
//! ```yaml
//! inherits:
//!   - base_sessions
//! templates:
//!   keys:
//!     - $name: defaults
//!       values:
//!         feature_flag: "on"
//!   maps:
//!     - $name: profile
//!       values: {locale: en}
//!   sets:
//!     - $name: roles
//!       values:
//!         reader:
//!         writer: {expiration: 10s}
//! databases:
//!   1:
//!     keys:
//!       $extend: defaults
//!       values:
//!         session: {value: abc, expiration: 1m}
//!         counter: 3
//!     maps:
//!       values:
//!         user:1:
//!           $extend: profile
//!           values: {name: alice}
//!     sets:
//!       values:
//!         user:1:roles:
//!           $extend: roles
//! ```

use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{SeedingError, SeedingResult};
use crate::resolver::FixtureDocument;
use crate::template::{ResolveContext, TemplateStore, ValueSet};

/// Redis database index.
pub type DatabaseId = i64;

/// A scalar key value with an optional time to live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValue {
	/// Stored value.
	pub value: String,
	/// Key expiration; `None` keeps the key forever.
	pub expiration: Option<Duration>,
}

impl KeyValue {
	/// Creates a value without expiration.
	pub fn new(value: impl Into<String>) -> Self {
		Self {
			value: value.into(),
			expiration: None,
		}
	}

	/// Sets the expiration.
	pub fn with_expiration(mut self, expiration: Duration) -> Self {
		self.expiration = Some(expiration);
		self
	}
}

impl<'de> Deserialize<'de> for KeyValue {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Repr {
			Full {
				value: Value,
				#[serde(default)]
				expiration: Option<Value>,
			},
			Short(Value),
		}

		let (value, expiration) = match Repr::deserialize(deserializer)? {
			Repr::Full { value, expiration } => (value, expiration),
			Repr::Short(value) => (value, None),
		};
		Ok(Self {
			value: scalar_to_string(value).map_err(de::Error::custom)?,
			expiration: parse_expiration(expiration).map_err(de::Error::custom)?,
		})
	}
}

/// A set member with an optional per-member expiration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetMember {
	/// Member expiration; `None` keeps the member forever.
	pub expiration: Option<Duration>,
}

impl<'de> Deserialize<'de> for SetMember {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		#[derive(Deserialize)]
		struct Repr {
			#[serde(default)]
			expiration: Option<Value>,
		}

		let repr = Option::<Repr>::deserialize(deserializer)?;
		let expiration = match repr {
			Some(repr) => parse_expiration(repr.expiration).map_err(de::Error::custom)?,
			None => None,
		};
		Ok(Self { expiration })
	}
}

/// Hash map field value; any YAML scalar is accepted and stored as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapField(pub String);

impl<'de> Deserialize<'de> for MapField {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = Value::deserialize(deserializer)?;
		scalar_to_string(value).map(Self).map_err(de::Error::custom)
	}
}

fn scalar_to_string(value: Value) -> Result<String, String> {
	match value {
		Value::String(s) => Ok(s),
		Value::Number(n) => Ok(n.to_string()),
		Value::Bool(b) => Ok(b.to_string()),
		Value::Null => Err("expected a scalar value, found null".to_string()),
		other => Err(format!("expected a scalar value, found {}", other)),
	}
}

fn parse_expiration(value: Option<Value>) -> Result<Option<Duration>, String> {
	let duration = match value {
		None | Some(Value::Null) => return Ok(None),
		Some(Value::Number(n)) => n
			.as_u64()
			.map(Duration::from_secs)
			.ok_or_else(|| format!("invalid expiration: {}", n))?,
		Some(Value::String(s)) => parse_duration(&s)?,
		Some(other) => return Err(format!("invalid expiration: {}", other)),
	};
	Ok((!duration.is_zero()).then_some(duration))
}

/// Parses a Go-style duration such as `10s`, `1m30s`, `1.5h` or `250ms`.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
	let text = text.trim();
	if text == "0" {
		return Ok(Duration::ZERO);
	}
	if text.is_empty() {
		return Err("empty duration".to_string());
	}

	let mut total = 0f64;
	let mut rest = text;
	while !rest.is_empty() {
		let number_len = rest
			.find(|c: char| !(c.is_ascii_digit() || c == '.'))
			.unwrap_or(rest.len());
		if number_len == 0 {
			return Err(format!("invalid duration: {}", text));
		}
		let amount: f64 = rest[..number_len]
			.parse()
			.map_err(|_| format!("invalid duration: {}", text))?;
		rest = &rest[number_len..];

		let unit_len = rest
			.find(|c: char| c.is_ascii_digit() || c == '.')
			.unwrap_or(rest.len());
		let seconds_per_unit = match &rest[..unit_len] {
			"ns" => 1e-9,
			"us" | "µs" => 1e-6,
			"ms" => 1e-3,
			"s" => 1.0,
			"m" => 60.0,
			"h" => 3600.0,
			"" => return Err(format!("missing unit in duration: {}", text)),
			unit => return Err(format!("unknown unit '{}' in duration: {}", unit, text)),
		};
		rest = &rest[unit_len..];
		total += amount * seconds_per_unit;
	}
	Duration::try_from_secs_f64(total).map_err(|e| format!("invalid duration {}: {}", text, e))
}

/// A record as written in a document: optional `$name` / `$extend` plus its
/// own values.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordDocument<V> {
	/// Name under which the merged record is registered.
	#[serde(rename = "$name", default)]
	pub name: Option<String>,
	/// Template the record extends.
	#[serde(rename = "$extend", default)]
	pub extend: Option<String>,
	/// The record's own values.
	#[serde(default = "IndexMap::new")]
	pub values: IndexMap<String, V>,
}

/// `values:` wrapper used for maps and sets inside a database.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordCollection<V> {
	/// Records keyed by redis key.
	#[serde(default = "IndexMap::new")]
	pub values: IndexMap<String, RecordDocument<V>>,
}

/// Templates declared by a key-value fixture.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KvTemplates {
	/// Key templates.
	pub keys: Vec<RecordDocument<KeyValue>>,
	/// Hash map templates.
	pub maps: Vec<RecordDocument<MapField>>,
	/// Set templates.
	pub sets: Vec<RecordDocument<SetMember>>,
}

/// Data for one redis database as written in a document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KvDatabaseDocument {
	/// Scalar keys.
	pub keys: Option<RecordDocument<KeyValue>>,
	/// Hash maps.
	pub maps: Option<RecordCollection<MapField>>,
	/// Sets.
	pub sets: Option<RecordCollection<SetMember>>,
}

/// A decoded key-value fixture document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KvFixtureDocument {
	/// Fixtures resolved before this one.
	pub inherits: Vec<String>,
	/// Reusable templates.
	pub templates: KvTemplates,
	/// Data per database index.
	pub databases: IndexMap<DatabaseId, KvDatabaseDocument>,
}

/// A record after its `$extend` chain has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord<V> {
	/// Name the record was registered under, if any.
	pub name: Option<String>,
	/// Template the record extended, if any.
	pub extends: Option<String>,
	/// Flattened values.
	pub values: ValueSet<V>,
}

/// Resolved data for one redis database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvDatabase {
	/// Scalar keys.
	pub keys: Option<ResolvedRecord<KeyValue>>,
	/// Hash maps keyed by redis key.
	pub maps: IndexMap<String, ResolvedRecord<String>>,
	/// Sets keyed by redis key.
	pub sets: IndexMap<String, ResolvedRecord<SetMember>>,
}

impl KvDatabase {
	/// Number of individual writes (keys, map fields, set members).
	pub fn record_count(&self) -> usize {
		let keys = self.keys.as_ref().map_or(0, |k| k.values.len());
		let maps: usize = self.maps.values().map(|m| m.values.len()).sum();
		let sets: usize = self.sets.values().map(|s| s.values.len()).sum();
		keys + maps + sets
	}
}

/// A resolved key-value fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvFixture {
	/// Fixture name.
	pub name: String,
	/// Data per database index, in document order.
	pub databases: IndexMap<DatabaseId, KvDatabase>,
}

fn resolve_record<V: Clone>(
	store: &mut TemplateStore<V>,
	name: Option<String>,
	extend: Option<String>,
	own: ValueSet<V>,
) -> SeedingResult<ResolvedRecord<V>> {
	let values = store.extend(extend.as_deref(), &own)?;
	if let Some(name) = &name {
		store.register(name, values.clone())?;
	}
	Ok(ResolvedRecord {
		name,
		extends: extend,
		values,
	})
}

fn register_template<V: Clone>(
	store: &mut TemplateStore<V>,
	fixture: &str,
	name: Option<String>,
	extend: Option<String>,
	own: ValueSet<V>,
) -> SeedingResult<()> {
	if name.as_deref().is_none_or(str::is_empty) {
		return Err(SeedingError::parse(
			fixture,
			format!("{} template $name is required", store.kind().as_str()),
		));
	}
	resolve_record(store, name, extend, own).map(|_| ())
}

fn map_values(values: IndexMap<String, MapField>) -> ValueSet<String> {
	values.into_iter().map(|(k, v)| (k, v.0)).collect()
}

impl FixtureDocument for KvFixtureDocument {
	type Resolved = KvFixture;

	fn inherits(&self) -> &[String] {
		&self.inherits
	}

	fn resolve(self, fixture: &str, ctx: &mut ResolveContext) -> SeedingResult<KvFixture> {
		let templates = self.templates;
		for tpl in templates.keys {
			register_template(&mut ctx.keys, fixture, tpl.name, tpl.extend, tpl.values)?;
		}
		for tpl in templates.sets {
			register_template(&mut ctx.sets, fixture, tpl.name, tpl.extend, tpl.values)?;
		}
		for tpl in templates.maps {
			let own = map_values(tpl.values);
			register_template(&mut ctx.maps, fixture, tpl.name, tpl.extend, own)?;
		}

		let mut databases = IndexMap::with_capacity(self.databases.len());
		for (db, document) in self.databases {
			let mut database = KvDatabase::default();
			if let Some(keys) = document.keys {
				database.keys = Some(resolve_record(
					&mut ctx.keys,
					keys.name,
					keys.extend,
					keys.values,
				)?);
			}
			if let Some(maps) = document.maps {
				for (key, record) in maps.values {
					let own = map_values(record.values);
					let resolved = resolve_record(&mut ctx.maps, record.name, record.extend, own)?;
					database.maps.insert(key, resolved);
				}
			}
			if let Some(sets) = document.sets {
				for (key, record) in sets.values {
					let resolved =
						resolve_record(&mut ctx.sets, record.name, record.extend, record.values)?;
					database.sets.insert(key, resolved);
				}
			}
			databases.insert(db, database);
		}

		tracing::debug!(
			fixture,
			databases = databases.len(),
			"resolved key-value fixture"
		);
		Ok(KvFixture {
			name: fixture.to_string(),
			databases,
		})
	}
}

impl fmt::Display for KvFixture {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({} database(s))", self.name, self.databases.len())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::source::MemorySource;
	use crate::FixtureResolver;
	use rstest::rstest;

	#[rstest]
	#[case("10s", Duration::from_secs(10))]
	#[case("1m30s", Duration::from_secs(90))]
	#[case("250ms", Duration::from_millis(250))]
	#[case("2h", Duration::from_secs(7200))]
	#[case("0", Duration::ZERO)]
	fn test_parse_duration(#[case] text: &str, #[case] expected: Duration) {
		assert_eq!(parse_duration(text).unwrap(), expected);
	}

	#[rstest]
	#[case("")]
	#[case("10")]
	#[case("10x")]
	#[case("s")]
	#[case("99999999999999999999999h")]
	fn test_parse_duration_invalid(#[case] text: &str) {
		assert!(parse_duration(text).is_err());
	}

	#[rstest]
	fn test_parse_duration_out_of_range() {
		let digits = format!("{}s", "9".repeat(400));
		assert!(parse_duration(&digits).is_err());

		let result = serde_yaml::from_str::<IndexMap<String, KeyValue>>(
			"k: {value: v, expiration: 99999999999999999999999h}",
		);
		assert!(result.is_err());
	}

	#[rstest]
	fn test_key_value_forms() {
		let values: IndexMap<String, KeyValue> = serde_yaml::from_str(
			"a: 1\nb: {value: two}\nc: {value: three, expiration: 5s}\nd: {value: x, expiration: 30}",
		)
		.unwrap();
		assert_eq!(values["a"], KeyValue::new("1"));
		assert_eq!(values["b"], KeyValue::new("two"));
		assert_eq!(
			values["c"],
			KeyValue::new("three").with_expiration(Duration::from_secs(5))
		);
		assert_eq!(values["d"].expiration, Some(Duration::from_secs(30)));
	}

	#[rstest]
	fn test_set_member_forms() {
		let values: IndexMap<String, SetMember> =
			serde_yaml::from_str("a: {expiration: 10s}\nb:\nc: {}").unwrap();
		assert_eq!(values["a"].expiration, Some(Duration::from_secs(10)));
		assert_eq!(values["b"], SetMember::default());
		assert_eq!(values["c"], SetMember::default());
	}

	#[rstest]
	fn test_template_requires_name() {
		let source = MemorySource::new().with_document(
			"nameless",
			"templates:\n  maps:\n    - values: {a: 1}\n",
		);
		let mut ctx = ResolveContext::new();
		let mut resolver = FixtureResolver::<KvFixtureDocument, _>::new(&source);
		assert!(matches!(
			resolver.resolve(&mut ctx, "nameless"),
			Err(SeedingError::Parse { .. })
		));
	}

	#[rstest]
	fn test_named_record_registered_for_later_fixtures() {
		let source = MemorySource::new()
			.with_document(
				"first",
				"databases:\n  1:\n    maps:\n      values:\n        m1:\n          $name: shared\n          values: {a: 1}\n",
			)
			.with_document(
				"second",
				"databases:\n  2:\n    maps:\n      values:\n        m2:\n          $extend: shared\n          values: {b: 2}\n",
			);
		let mut ctx = ResolveContext::new();
		let mut resolver = FixtureResolver::<KvFixtureDocument, _>::new(&source);
		let fixtures = resolver.resolve_all(&mut ctx, &["first", "second"]).unwrap();

		let m2 = &fixtures[1].databases[&2].maps["m2"];
		let fields: Vec<(&str, &str)> = m2
			.values
			.iter()
			.map(|(k, v)| (k.as_str(), v.as_str()))
			.collect();
		assert_eq!(fields, vec![("a", "1"), ("b", "2")]);
	}

	#[rstest]
	fn test_record_count() {
		let source = MemorySource::new().with_document(
			"counted",
			"databases:\n  0:\n    keys:\n      values: {a: 1, b: 2}\n    maps:\n      values:\n        m: {values: {x: 1}}\n    sets:\n      values:\n        s: {values: {p: null, q: null}}\n",
		);
		let mut ctx = ResolveContext::new();
		let mut resolver = FixtureResolver::<KvFixtureDocument, _>::new(&source);
		let fixture = resolver.resolve(&mut ctx, "counted").unwrap();
		assert_eq!(fixture.databases[&0].record_count(), 5);
	}
}
