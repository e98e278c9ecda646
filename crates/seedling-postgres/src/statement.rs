//! SQL statement rendering.
//!
//! Every table is written with a single multi-row `INSERT`. Values are
//! rendered as literals; references are substituted with the value the
//! store returned for the referenced row, so a statement can only be built
//! once everything it references has been inserted.

use std::collections::HashMap;

use indexmap::IndexSet;
use seedling_fixtures::sql::Row;
use seedling_fixtures::{FieldValue, RowReference, SeedingError, SeedingResult};
use serde_json::Value;

use crate::options::DEFAULT_ALIAS_SUFFIX;

/// Rows confirmed by the store, keyed by `$name`.
pub type InsertedRows = HashMap<String, Value>;

const EXPR_OPERATORS: &[char] = &[
	'+', '-', '*', '/', '%', '|', '&', '<', '>', '=', '!', '^', '~', ':',
];

/// Renders the statements of a load.
#[derive(Debug, Clone)]
pub struct StatementBuilder {
	alias_suffix: String,
}

impl Default for StatementBuilder {
	fn default() -> Self {
		Self::new(DEFAULT_ALIAS_SUFFIX)
	}
}

impl StatementBuilder {
	/// Creates a builder using `alias_suffix` for row aliases.
	pub fn new(alias_suffix: impl Into<String>) -> Self {
		Self {
			alias_suffix: alias_suffix.into(),
		}
	}

	/// Alias given to the inserted table in `RETURNING`.
	///
	/// The alias is emitted unquoted, so every character outside
	/// `[A-Za-z0-9_]` becomes `_` and a leading digit gets a `_` prefix.
	pub fn row_alias(&self, table: &str) -> String {
		let mut alias: String = format!("{}_{}", table, self.alias_suffix)
			.chars()
			.map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
			.collect();
		if alias.starts_with(|c: char| c.is_ascii_digit()) {
			alias.insert(0, '_');
		}
		alias
	}

	/// Renders `TRUNCATE TABLE "<table>" CASCADE`.
	pub fn truncate(&self, table: &str) -> String {
		format!("TRUNCATE TABLE {} CASCADE", quote_identifier(table))
	}

	/// Renders the bulk insert of `rows` into `table`.
	///
	/// The column list is the union of all rows' fields in first-seen
	/// order; a row lacking a column gets `default` in its place. A batch
	/// made only of field-less rows renders `DEFAULT VALUES`.
	///
	/// # Errors
	///
	/// Returns [`SeedingError::UnresolvedReference`] when a reference points
	/// at a row or field missing from `inserted`.
	pub fn insert(&self, table: &str, rows: &[Row], inserted: &InsertedRows) -> SeedingResult<String> {
		let alias = self.row_alias(table);
		let columns: IndexSet<&str> = rows
			.iter()
			.flat_map(|row| row.fields.keys().map(String::as_str))
			.collect();

		if columns.is_empty() {
			return Ok(format!(
				"INSERT INTO {} AS {alias} DEFAULT VALUES RETURNING row_to_json({alias})",
				quote_identifier(table)
			));
		}

		let mut tuples = Vec::with_capacity(rows.len());
		for row in rows {
			let mut values = Vec::with_capacity(columns.len());
			for column in &columns {
				let value = match row.fields.get(*column) {
					Some(value) => render_value(value, inserted)?,
					None => "default".to_string(),
				};
				values.push(value);
			}
			tuples.push(format!("({})", values.join(",")));
		}

		let column_list: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
		Ok(format!(
			"INSERT INTO {} AS {alias} ({}) VALUES {} RETURNING row_to_json({alias})",
			quote_identifier(table),
			column_list.join(","),
			tuples.join(",")
		))
	}
}

/// Double-quotes an identifier, segment by segment for `schema.table`.
pub fn quote_identifier(name: &str) -> String {
	name.split('.')
		.map(|segment| format!("\"{}\"", segment.replace('"', "\"\"")))
		.collect::<Vec<_>>()
		.join(".")
}

/// Single-quotes a string literal, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
	format!("'{}'", value.replace('\'', "''"))
}

/// PL/pgSQL block restarting every user sequence at `start`.
pub fn sequence_restart_statement(start: i64) -> String {
	format!(
		"DO $$
DECLARE
	seq record;
BEGIN
	FOR seq IN
		SELECT n.nspname AS schema_name, c.relname AS sequence_name
		FROM pg_class c
		JOIN pg_namespace n ON n.oid = c.relnamespace
		WHERE c.relkind = 'S'
			AND n.nspname NOT IN ('pg_catalog', 'information_schema')
			AND n.nspname NOT LIKE 'pg_toast%'
	LOOP
		EXECUTE format('ALTER SEQUENCE %I.%I RESTART WITH {start}', seq.schema_name, seq.sequence_name);
	END LOOP;
END $$"
	)
}

fn render_value(value: &FieldValue, inserted: &InsertedRows) -> SeedingResult<String> {
	Ok(match value {
		FieldValue::Null => "NULL".to_string(),
		FieldValue::Bool(b) => b.to_string(),
		FieldValue::Number(n) => n.to_string(),
		FieldValue::String(s) => quote_literal(s),
		FieldValue::Json(v) => quote_literal(&v.to_string()),
		FieldValue::Default => "default".to_string(),
		FieldValue::Expr(expr) => render_expr(expr),
		FieldValue::Reference(reference) => render_json(lookup(reference, inserted)?),
	})
}

fn render_expr(expr: &str) -> String {
	let needs_parens = expr
		.chars()
		.any(|c| c.is_whitespace() || EXPR_OPERATORS.contains(&c));
	if needs_parens {
		format!("({expr})")
	} else {
		expr.to_string()
	}
}

fn render_json(value: &Value) -> String {
	match value {
		Value::Null => "NULL".to_string(),
		Value::Bool(b) => b.to_string(),
		Value::Number(n) => n.to_string(),
		Value::String(s) => quote_literal(s),
		other => quote_literal(&other.to_string()),
	}
}

fn lookup<'a>(reference: &RowReference, inserted: &'a InsertedRows) -> SeedingResult<&'a Value> {
	let row = inserted
		.get(&reference.row)
		.ok_or_else(|| SeedingError::UnresolvedReference {
			row: reference.row.clone(),
			field: reference.field.clone(),
			reason: "row has not been inserted".to_string(),
		})?;
	row.get(&reference.field)
		.ok_or_else(|| SeedingError::UnresolvedReference {
			row: reference.row.clone(),
			field: reference.field.clone(),
			reason: "field is not present in the inserted row".to_string(),
		})
}
