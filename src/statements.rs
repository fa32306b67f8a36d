//! Statement builders
//!
//! Pure functions from metadata and values to statement text plus a
//! positional binding list. Column order follows declaration order so the
//! generated text is deterministic, identifiers are double-quoted, and
//! every value is a bound `?` parameter; caller data never appears in
//! the SQL text itself.

use crate::error::{OrmError, OrmResult};
use crate::metadata::EntityMetadata;
use crate::value::SqlValue;

fn quote(ident: &str) -> String {
	format!("\"{ident}\"")
}

/// INSERT for an entity; the id column is included only when the caller
/// pre-assigned it, otherwise it is left to the database to generate.
/// `extras` carries the owned foreign-key columns resolved by the
/// relationship engine, appended after the declared columns.
pub fn build_insert(
	meta: &EntityMetadata,
	values: &[SqlValue],
	extras: &[(String, SqlValue)],
	include_id: bool,
) -> (String, Vec<SqlValue>) {
	let mut columns = Vec::new();
	let mut params = Vec::new();
	for (column, value) in meta.columns.iter().zip(values) {
		if column.is_id && !include_id {
			continue;
		}
		columns.push(quote(column.column));
		params.push(value.clone());
	}
	for (column, value) in extras {
		columns.push(quote(column));
		params.push(value.clone());
	}
	let placeholders = vec!["?"; columns.len()].join(", ");
	let sql = format!(
		"INSERT INTO {} ({}) VALUES ({})",
		quote(meta.table),
		columns.join(", "),
		placeholders
	);
	(sql, params)
}

/// UPDATE with a full SET clause over the non-id columns (plus owned
/// foreign-key extras), keyed by id. The id value is taken from its
/// declared slot in `values` and bound last. An entity contributing no
/// assignable column at all is rejected rather than emitting an empty
/// SET clause.
pub fn build_update(
	meta: &EntityMetadata,
	values: &[SqlValue],
	extras: &[(String, SqlValue)],
) -> OrmResult<(String, Vec<SqlValue>)> {
	let mut assignments = Vec::new();
	let mut params = Vec::new();
	let mut id_value = SqlValue::Null;
	for (column, value) in meta.columns.iter().zip(values) {
		if column.is_id {
			id_value = value.clone();
			continue;
		}
		assignments.push(format!("{} = ?", quote(column.column)));
		params.push(value.clone());
	}
	for (column, value) in extras {
		assignments.push(format!("{} = ?", quote(column)));
		params.push(value.clone());
	}
	if assignments.is_empty() {
		return Err(OrmError::persistence(format!(
			"no columns to update in table `{}`",
			meta.table
		)));
	}
	params.push(id_value);
	let sql = format!(
		"UPDATE {} SET {} WHERE {} = ?",
		quote(meta.table),
		assignments.join(", "),
		quote(meta.id().column)
	);
	Ok((sql, params))
}

pub fn build_delete(meta: &EntityMetadata) -> String {
	format!(
		"DELETE FROM {} WHERE {} = ?",
		quote(meta.table),
		quote(meta.id().column)
	)
}

/// SELECT by id. `*` rather than the declared column list: the row must
/// also carry the foreign-key columns the resolver reads.
pub fn build_select_by_id(meta: &EntityMetadata) -> String {
	format!(
		"SELECT * FROM {} WHERE {} = ?",
		quote(meta.table),
		quote(meta.id().column)
	)
}

/// SELECT all rows whose `column` equals a bound value (reverse
/// one-to-one and one-to-many loads).
pub fn build_select_by_column(meta: &EntityMetadata, column: &str) -> String {
	format!(
		"SELECT * FROM {} WHERE {} = ?",
		quote(meta.table),
		quote(column)
	)
}

/// SELECT the related side of a many-to-many through its join table.
pub fn build_select_via_join(
	meta: &EntityMetadata,
	join_table: &str,
	join_column: &str,
	inverse_join_column: &str,
) -> String {
	let related = quote(meta.table);
	let join = quote(join_table);
	format!(
		"SELECT {related}.* FROM {related} INNER JOIN {join} ON {join}.{} = {related}.{} WHERE {join}.{} = ?",
		quote(inverse_join_column),
		quote(meta.id().column),
		quote(join_column)
	)
}

/// Idempotent join-row insert: ON-CONFLICT-DO-NOTHING semantics expressed
/// as `INSERT ... SELECT ... WHERE NOT EXISTS`, so no unique index on the
/// join table is required. Binds `(join, inverse, join, inverse)`.
pub fn build_join_insert(join_table: &str, join_column: &str, inverse_join_column: &str) -> String {
	let join = quote(join_table);
	let left = quote(join_column);
	let right = quote(inverse_join_column);
	format!(
		"INSERT INTO {join} ({left}, {right}) SELECT ?, ? WHERE NOT EXISTS \
		 (SELECT 1 FROM {join} WHERE {left} = ? AND {right} = ?)"
	)
}
