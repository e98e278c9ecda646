//! Relational field values.
//!
//! A field value is classified once, when the document is decoded. The
//! statement builder then matches on [`FieldValue`] exhaustively instead of
//! inspecting strings at render time.

use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value};

const DEFAULT_MARKER: &str = "$default";
const EVAL_PREFIX: &str = "$eval(";

/// Pointer to a field of another named row, written `$row.field`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowReference {
	/// Name of the referenced row (its `$name`).
	pub row: String,
	/// Field read from the row as returned by the store.
	pub field: String,
}

impl RowReference {
	/// Creates a reference to `row.field`.
	pub fn new(row: impl Into<String>, field: impl Into<String>) -> Self {
		Self {
			row: row.into(),
			field: field.into(),
		}
	}

	fn parse(raw: &str) -> Option<Self> {
		let body = raw.strip_prefix('$')?;
		let (row, field) = body.split_once('.')?;
		let starts_like_name = row
			.chars()
			.next()
			.is_some_and(|c| c.is_alphabetic() || c == '_');
		if !starts_like_name || field.is_empty() {
			return None;
		}
		Some(Self::new(row, field))
	}
}

/// Value of a single relational field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	/// SQL `NULL`.
	Null,
	/// Boolean literal.
	Bool(bool),
	/// Numeric literal, kept in its source representation.
	Number(Number),
	/// String literal.
	String(String),
	/// Array or object, stored as a JSON string literal.
	Json(Value),
	/// Let the store apply the column default (`$default`).
	Default,
	/// Raw SQL fragment emitted unescaped (`$eval(...)`).
	Expr(String),
	/// Reference to a field of another row (`$row.field`).
	Reference(RowReference),
}

impl FieldValue {
	/// Classifies a decoded JSON/YAML value.
	pub fn from_json(value: Value) -> Self {
		match value {
			Value::Null => Self::Null,
			Value::Bool(b) => Self::Bool(b),
			Value::Number(n) => Self::Number(n),
			Value::String(s) => Self::from_text(s),
			other @ (Value::Array(_) | Value::Object(_)) => Self::Json(other),
		}
	}

	fn from_text(text: String) -> Self {
		if text == DEFAULT_MARKER {
			return Self::Default;
		}
		if let Some(expr) = text
			.strip_prefix(EVAL_PREFIX)
			.and_then(|rest| rest.strip_suffix(')'))
		{
			return Self::Expr(expr.trim().to_string());
		}
		match RowReference::parse(&text) {
			Some(reference) => Self::Reference(reference),
			None => Self::String(text),
		}
	}

	/// Returns the reference carried by this value, if any.
	pub fn reference(&self) -> Option<&RowReference> {
		match self {
			Self::Reference(reference) => Some(reference),
			_ => None,
		}
	}
}

impl<'de> Deserialize<'de> for FieldValue {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		FiniteJson::deserialize(deserializer).map(|json| Self::from_json(json.0))
	}
}

/// JSON value decoded from any self-describing format, rejecting
/// floating-point numbers that JSON cannot represent (`.inf`, `.nan`).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FiniteJson(pub(crate) Value);

impl<'de> Deserialize<'de> for FiniteJson {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		deserializer.deserialize_any(FiniteJsonVisitor).map(FiniteJson)
	}
}

struct FiniteJsonVisitor;

impl<'de> Visitor<'de> for FiniteJsonVisitor {
	type Value = Value;

	fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("a JSON-compatible value")
	}

	fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
		Ok(Value::Bool(v))
	}

	fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
		Ok(Value::Number(v.into()))
	}

	fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
		Ok(Value::Number(v.into()))
	}

	fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
		Number::from_f64(v)
			.map(Value::Number)
			.ok_or_else(|| E::custom(format!("number {} has no JSON representation", v)))
	}

	fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
		Ok(Value::String(v.to_string()))
	}

	fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
		Ok(Value::String(v))
	}

	fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
		Ok(Value::Null)
	}

	fn visit_none<E: de::Error>(self) -> Result<Value, E> {
		Ok(Value::Null)
	}

	fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
	where
		D: Deserializer<'de>,
	{
		FiniteJson::deserialize(deserializer).map(|json| json.0)
	}

	fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
	where
		A: SeqAccess<'de>,
	{
		let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
		while let Some(FiniteJson(item)) = seq.next_element()? {
			items.push(item);
		}
		Ok(Value::Array(items))
	}

	fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
	where
		A: MapAccess<'de>,
	{
		let mut object = Map::new();
		while let Some((key, FiniteJson(value))) = map.next_entry::<String, FiniteJson>()? {
			object.insert(key, value);
		}
		Ok(Value::Object(object))
	}
}
