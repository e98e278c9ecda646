//! Relational fixture documents.
//!
//! ```yaml
//! inherits:
//!   - base_users
//! templates:
//!   active_user:
//!     status: active
//!     created_at: $eval(now())
//! tables:
//!   users:
//!     - $name: alice
//!       $extend: active_user
//!       email: alice@example.com
//!   orders:
//!     - user_id: $alice.id
//!       total: 10.5
//!       tags: [new, promo]
//! ```

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::SeedingResult;
use crate::resolver::FixtureDocument;
use crate::template::{ResolveContext, ValueSet};
use crate::value::{FieldValue, FiniteJson, RowReference};

const NAME_KEY: &str = "$name";
const EXTEND_KEY: &str = "$extend";

/// A row or row template as written in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct RowDocument {
	/// `$name` of the row.
	pub name: Option<String>,
	/// `$extend` target.
	pub extend: Option<String>,
	/// Field values in declaration order.
	pub fields: ValueSet<FieldValue>,
}

fn meta_string<E: de::Error>(key: &str, value: Value) -> Result<String, E> {
	match value {
		Value::String(s) if !s.is_empty() => Ok(s),
		other => Err(E::custom(format!(
			"{} must be a non-empty string, found {}",
			key, other
		))),
	}
}

impl<'de> Deserialize<'de> for RowDocument {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = IndexMap::<String, FiniteJson>::deserialize(deserializer)?;
		let mut row = RowDocument {
			name: None,
			extend: None,
			fields: ValueSet::with_capacity(raw.len()),
		};
		for (key, FiniteJson(value)) in raw {
			match key.as_str() {
				NAME_KEY => row.name = Some(meta_string(NAME_KEY, value)?),
				EXTEND_KEY => row.extend = Some(meta_string(EXTEND_KEY, value)?),
				_ => {
					row.fields.insert(key, FieldValue::from_json(value));
				}
			}
		}
		Ok(row)
	}
}

/// A decoded relational fixture document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SqlFixtureDocument {
	/// Fixtures resolved before this one.
	pub inherits: Vec<String>,
	/// Row templates keyed by name.
	pub templates: IndexMap<String, RowDocument>,
	/// Rows per table.
	pub tables: IndexMap<String, Vec<RowDocument>>,
}

/// A row after its `$extend` chain has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
	/// `$name` under which the store's copy of the row can be referenced.
	pub name: Option<String>,
	/// Flattened field values.
	pub fields: ValueSet<FieldValue>,
}

impl Row {
	/// Creates an anonymous row.
	pub fn new(fields: ValueSet<FieldValue>) -> Self {
		Self { name: None, fields }
	}

	/// Names the row.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// References held by this row's fields.
	pub fn references(&self) -> impl Iterator<Item = &RowReference> {
		self.fields.values().filter_map(FieldValue::reference)
	}
}

/// Rows of one table, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlTable {
	/// Table name, possibly schema-qualified.
	pub name: String,
	/// Rows to insert.
	pub rows: Vec<Row>,
}

/// A resolved relational fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFixture {
	/// Fixture name.
	pub name: String,
	/// Tables in document order.
	pub tables: Vec<SqlTable>,
}

impl FixtureDocument for SqlFixtureDocument {
	type Resolved = SqlFixture;

	fn inherits(&self) -> &[String] {
		&self.inherits
	}

	fn resolve(self, fixture: &str, ctx: &mut ResolveContext) -> SeedingResult<SqlFixture> {
		for (name, template) in self.templates {
			let fields = ctx
				.rows
				.extend(template.extend.as_deref(), &template.fields)?;
			ctx.rows.register(&name, fields)?;
		}

		let mut tables = Vec::with_capacity(self.tables.len());
		for (table, documents) in self.tables {
			let mut rows = Vec::with_capacity(documents.len());
			for document in documents {
				let fields = ctx
					.rows
					.extend(document.extend.as_deref(), &document.fields)?;
				if let Some(name) = &document.name {
					ctx.rows.register(name, fields.clone())?;
				}
				rows.push(Row {
					name: document.name,
					fields,
				});
			}
			tables.push(SqlTable { name: table, rows });
		}

		tracing::debug!(fixture, tables = tables.len(), "resolved relational fixture");
		Ok(SqlFixture {
			name: fixture.to_string(),
			tables,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::SeedingError;
	use crate::source::MemorySource;
	use crate::FixtureResolver;
	use rstest::rstest;

	#[rstest]
	fn test_row_document_meta_keys() {
		let row: RowDocument =
			serde_yaml::from_str("$name: r1\n$extend: base\nf1: v\nf2: $r0.id").unwrap();
		assert_eq!(row.name.as_deref(), Some("r1"));
		assert_eq!(row.extend.as_deref(), Some("base"));
		let keys: Vec<&str> = row.fields.keys().map(String::as_str).collect();
		assert_eq!(keys, vec!["f1", "f2"]);
		assert_eq!(
			row.fields["f2"],
			FieldValue::Reference(RowReference::new("r0", "id"))
		);
	}

	#[rstest]
	fn test_row_document_rejects_non_string_name() {
		let result: Result<RowDocument, _> = serde_yaml::from_str("$name: 12\nf1: v");
		assert!(result.is_err());
	}

	#[rstest]
	#[case("score: .inf")]
	#[case("score: .nan")]
	#[case("limits: {upper: -.inf}")]
	fn test_row_document_rejects_non_finite_numbers(#[case] yaml: &str) {
		let result: Result<RowDocument, _> = serde_yaml::from_str(yaml);
		assert!(result.is_err());
	}

	#[rstest]
	fn test_rows_extend_templates_and_named_rows() {
		let source = MemorySource::new().with_document(
			"extend",
			r#"
templates:
  baseTpl:
    f1: tplVal1
  ref3:
    $extend: baseTpl
    f2: tplVal2
tables:
  table1:
    - $name: ref1
      f1: value1
      f2: value2
  table2:
    - $name: ref2
      $extend: ref1
      f1: value1 overwritten
      f3: $eval("1" || "2" || 3 + 5)
  table3:
    - $extend: ref2
    - $extend: ref3
"#,
		);
		let mut ctx = ResolveContext::new();
		let mut resolver = FixtureResolver::<SqlFixtureDocument, _>::new(&source);
		let fixture = resolver.resolve(&mut ctx, "extend").unwrap();

		let table2 = &fixture.tables[1].rows[0];
		let fields: Vec<&str> = table2.fields.keys().map(String::as_str).collect();
		assert_eq!(fields, vec!["f1", "f2", "f3"]);
		assert_eq!(
			table2.fields["f1"],
			FieldValue::String("value1 overwritten".to_string())
		);

		let table3 = &fixture.tables[2];
		assert_eq!(table3.rows[0].fields, table2.fields);
		assert_eq!(table3.rows[1].fields.len(), 2);
		assert!(table3.rows[1].name.is_none());
	}

	#[rstest]
	fn test_duplicate_row_name_across_fixtures() {
		let source = MemorySource::new()
			.with_document("a", "tables:\n  t:\n    - $name: r\n      f: 1\n")
			.with_document("b", "tables:\n  t:\n    - $name: r\n      f: 2\n");
		let mut ctx = ResolveContext::new();
		let mut resolver = FixtureResolver::<SqlFixtureDocument, _>::new(&source);
		let result = resolver.resolve_all(&mut ctx, &["a", "b"]);
		assert!(matches!(
			result,
			Err(SeedingError::DuplicateName { kind: "row", .. })
		));
	}

	#[rstest]
	fn test_row_references() {
		let mut fields = ValueSet::new();
		fields.insert("a".to_string(), FieldValue::from_json(Value::from("$x.id")));
		fields.insert("b".to_string(), FieldValue::Null);
		fields.insert("c".to_string(), FieldValue::from_json(Value::from("$y.code")));
		let row = Row::new(fields).with_name("r");

		let refs: Vec<&str> = row.references().map(|r| r.row.as_str()).collect();
		assert_eq!(refs, vec!["x", "y"]);
	}
}
