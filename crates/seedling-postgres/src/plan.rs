//! Dependency planning.
//!
//! Rows may reference fields of other named rows as the store returned them,
//! so a row can only be rendered once the row it references is inserted.
//! The planner orders tables so that every referenced table comes first and
//! cuts each table's rows into statements so that same-table references
//! always point at an earlier statement.
//!
//! The plan is the only source of execution order; the loader runs it as is.

use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use seedling_fixtures::sql::{Row, SqlFixture};
use seedling_fixtures::{SeedingError, SeedingResult};

/// Rows of one table, grouped into insert statements.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePlan {
	/// Table name.
	pub name: String,
	/// Consecutive row batches; each batch becomes one `INSERT`.
	pub batches: Vec<Vec<Row>>,
}

impl TablePlan {
	/// Rows of the table in insertion order.
	pub fn rows(&self) -> impl Iterator<Item = &Row> {
		self.batches.iter().flatten()
	}

	/// Number of rows in the table.
	pub fn row_count(&self) -> usize {
		self.batches.iter().map(Vec::len).sum()
	}
}

/// Ordered tables of a load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadPlan {
	tables: Vec<TablePlan>,
}

impl LoadPlan {
	/// Tables in load order.
	pub fn tables(&self) -> &[TablePlan] {
		&self.tables
	}

	/// Table names in load order.
	pub fn table_names(&self) -> Vec<&str> {
		self.tables.iter().map(|t| t.name.as_str()).collect()
	}

	/// Total number of rows.
	pub fn row_count(&self) -> usize {
		self.tables.iter().map(TablePlan::row_count).sum()
	}

	/// Returns true if the plan touches no table.
	pub fn is_empty(&self) -> bool {
		self.tables.is_empty()
	}
}

/// Computes the load plan for the given fixtures, in request order.
///
/// # Errors
///
/// - [`SeedingError::UnresolvedReference`] when a row references a name
///   defined nowhere in the load, or a later row of its own table
/// - [`SeedingError::CyclicReference`] when tables reference each other
///   in a loop
pub fn plan<'a, I>(fixtures: I) -> SeedingResult<LoadPlan>
where
	I: IntoIterator<Item = &'a SqlFixture>,
{
	let mut tables: IndexMap<String, Vec<Row>> = IndexMap::new();
	for fixture in fixtures {
		for table in &fixture.tables {
			tables
				.entry(table.name.clone())
				.or_default()
				.extend(table.rows.iter().cloned());
		}
	}

	// Row name -> (table index, row position).
	let mut owners: HashMap<&str, (usize, usize)> = HashMap::new();
	for (table_idx, rows) in tables.values().enumerate() {
		for (pos, row) in rows.iter().enumerate() {
			let Some(name) = row.name.as_deref() else {
				continue;
			};
			if owners.insert(name, (table_idx, pos)).is_some() {
				return Err(SeedingError::DuplicateName {
					kind: "row",
					name: name.to_string(),
				});
			}
		}
	}

	let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); tables.len()];
	for (table_idx, rows) in tables.values().enumerate() {
		for (pos, row) in rows.iter().enumerate() {
			for reference in row.references() {
				let Some(&(owner_idx, owner_pos)) = owners.get(reference.row.as_str()) else {
					return Err(SeedingError::UnresolvedReference {
						row: reference.row.clone(),
						field: reference.field.clone(),
						reason: "no row with this name is defined in the load".to_string(),
					});
				};
				if owner_idx != table_idx {
					dependencies[table_idx].insert(owner_idx);
				} else if owner_pos >= pos {
					return Err(SeedingError::UnresolvedReference {
						row: reference.row.clone(),
						field: reference.field.clone(),
						reason: "row is not declared before the row referencing it".to_string(),
					});
				}
			}
		}
	}

	let order = topological_order(&tables, &dependencies)?;

	let mut entries: Vec<Option<(String, Vec<Row>)>> = tables.into_iter().map(Some).collect();
	let mut planned = Vec::with_capacity(order.len());
	for idx in order {
		if let Some((name, rows)) = entries[idx].take() {
			let batches = split_batches(rows);
			planned.push(TablePlan { name, batches });
		}
	}

	tracing::debug!(
		tables = ?planned.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
		"computed fixture load order"
	);
	Ok(LoadPlan { tables: planned })
}

/// Kahn's algorithm, always emitting the earliest ready table.
fn topological_order(
	tables: &IndexMap<String, Vec<Row>>,
	dependencies: &[BTreeSet<usize>],
) -> SeedingResult<Vec<usize>> {
	let count = dependencies.len();
	let mut in_degree: Vec<usize> = dependencies.iter().map(BTreeSet::len).collect();
	let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
	for (idx, deps) in dependencies.iter().enumerate() {
		for &dep in deps {
			dependents[dep].push(idx);
		}
	}

	// Ordered by first appearance so independent tables keep document order.
	let mut ready: BTreeSet<usize> = (0..count).filter(|&idx| in_degree[idx] == 0).collect();
	let mut order = Vec::with_capacity(count);

	while let Some(idx) = ready.pop_first() {
		order.push(idx);
		for &dependent in &dependents[idx] {
			in_degree[dependent] -= 1;
			if in_degree[dependent] == 0 {
				ready.insert(dependent);
			}
		}
	}

	if order.len() != count {
		let blocked: Vec<usize> = (0..count).filter(|&idx| in_degree[idx] > 0).collect();
		let names = cycle_members(blocked, dependencies)
			.into_iter()
			.filter_map(|idx| tables.get_index(idx).map(|(name, _)| name.clone()))
			.collect();
		return Err(SeedingError::CyclicReference(names));
	}
	Ok(order)
}

/// Narrows the blocked tables down to those taking part in a cycle by
/// repeatedly dropping tables no other blocked table depends on.
fn cycle_members(mut blocked: Vec<usize>, dependencies: &[BTreeSet<usize>]) -> Vec<usize> {
	loop {
		let depended_on: HashSet<usize> = blocked
			.iter()
			.flat_map(|&idx| dependencies[idx].iter().copied())
			.collect();
		let before = blocked.len();
		blocked.retain(|idx| depended_on.contains(idx));
		if blocked.len() == before {
			return blocked;
		}
	}
}

/// Cuts rows into statements so that a row never references a row inserted
/// by the same statement. Rows without fields get a statement of their own.
fn split_batches(rows: Vec<Row>) -> Vec<Vec<Row>> {
	let mut batches: Vec<Vec<Row>> = Vec::new();
	let mut current: Vec<Row> = Vec::new();
	let mut current_names: HashSet<String> = HashSet::new();

	for row in rows {
		let depends_on_current = row
			.references()
			.any(|reference| current_names.contains(&reference.row));
		let fieldless = row.fields.is_empty();
		if !current.is_empty() && (depends_on_current || fieldless) {
			batches.push(std::mem::take(&mut current));
			current_names.clear();
		}
		if let Some(name) = &row.name {
			current_names.insert(name.clone());
		}
		current.push(row);
		if fieldless {
			batches.push(std::mem::take(&mut current));
			current_names.clear();
		}
	}
	if !current.is_empty() {
		batches.push(current);
	}
	batches
}
