//! Entity metadata registry
//!
//! Entities carry their table binding, column list, id column, and
//! relationship set as a declarative descriptor table returned from
//! [`Entity::schema`]. No runtime type inspection is involved: the schema
//! is plain data built once per call and validated by [`describe`].

use crate::error::{OrmError, OrmResult};
use crate::relations::RelationLink;
use crate::value::{Row, SqlValue};
use std::sync::Arc;

/// The four relationship kinds an entity field may declare
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
	/// One-to-one; the foreign key column lives on this table when
	/// `fk_held_here`, otherwise on the related table (resolved by a
	/// reverse lookup against `column` over there).
	OneToOne {
		column: &'static str,
		fk_held_here: bool,
	},
	/// Many-to-one; the foreign key column always lives on this table.
	ManyToOne { column: &'static str },
	/// One-to-many; no column on this table, resolved through the
	/// `mapped_by` column of the related table.
	OneToMany { mapped_by: &'static str },
	/// Many-to-many through a join table; only the owning side writes
	/// join rows on save.
	ManyToMany {
		join_table: &'static str,
		join_column: &'static str,
		inverse_join_column: &'static str,
		owning: bool,
	},
}

impl RelationKind {
	/// The foreign key column this side writes into its own row, if any.
	pub fn owned_column(&self) -> Option<&'static str> {
		match self {
			RelationKind::OneToOne {
				column,
				fk_held_here: true,
			} => Some(column),
			RelationKind::ManyToOne { column } => Some(column),
			_ => None,
		}
	}
}

/// A scalar field bound to a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
	pub field: &'static str,
	pub column: &'static str,
	pub is_id: bool,
}

/// A relationship field together with its typed link into the related type
pub struct Relation<E> {
	pub field: &'static str,
	pub kind: RelationKind,
	pub link: Arc<dyn RelationLink<E>>,
}

/// Declarative descriptor table for an entity type
///
/// Built field by field, in declaration order; [`describe`] validates it.
///
/// # Examples
///
/// ```
/// use grappelli::metadata::{Entity, EntitySchema, RelationKind};
/// use grappelli::relations::ToOne;
/// # use grappelli::value::{Row, SqlValue};
/// # use grappelli::error::OrmResult;
///
/// #[derive(Debug, Default, Clone)]
/// struct Department { id: Option<i64>, name: String }
///
/// #[derive(Debug, Default, Clone)]
/// struct Employee {
///     id: Option<i64>,
///     name: String,
///     department: Option<Department>,
/// }
/// # impl Entity for Department {
/// #     fn schema() -> EntitySchema<Self> {
/// #         EntitySchema::new("departments").id_column("id", "id").column("name", "name")
/// #     }
/// #     fn id_value(&self) -> Option<SqlValue> { self.id.map(SqlValue::Int) }
/// #     fn set_id_value(&mut self, v: SqlValue) -> OrmResult<()> { self.id = Some(i64::try_from(v)?); Ok(()) }
/// #     fn column_values(&self) -> Vec<SqlValue> { vec![self.id.into(), self.name.clone().into()] }
/// #     fn from_row(row: &Row) -> OrmResult<Self> {
/// #         Ok(Self { id: row.get_opt("id")?, name: row.get("name")? })
/// #     }
/// # }
///
/// impl Entity for Employee {
///     fn schema() -> EntitySchema<Self> {
///         EntitySchema::new("employees")
///             .id_column("id", "id")
///             .column("name", "name")
///             .relation(
///                 "department",
///                 RelationKind::ManyToOne { column: "department_id" },
///                 ToOne::link(
///                     |e: &mut Employee| e.department.as_mut(),
///                     |e: &mut Employee, v| e.department = v,
///                 ),
///             )
///     }
///     # fn id_value(&self) -> Option<SqlValue> { self.id.map(SqlValue::Int) }
///     # fn set_id_value(&mut self, v: SqlValue) -> OrmResult<()> { self.id = Some(i64::try_from(v)?); Ok(()) }
///     # fn column_values(&self) -> Vec<SqlValue> { vec![self.id.into(), self.name.clone().into()] }
///     # fn from_row(row: &Row) -> OrmResult<Self> {
///     #     Ok(Self { id: row.get_opt("id")?, name: row.get("name")?, department: None })
///     # }
/// }
/// ```
pub struct EntitySchema<E> {
	table: Option<&'static str>,
	columns: Vec<ColumnMeta>,
	relations: Vec<Relation<E>>,
}

impl<E> EntitySchema<E> {
	pub fn new(table: &'static str) -> Self {
		Self {
			table: Some(table),
			columns: Vec::new(),
			relations: Vec::new(),
		}
	}

	/// A schema with no table binding; [`describe`] rejects it.
	pub fn unmapped() -> Self {
		Self {
			table: None,
			columns: Vec::new(),
			relations: Vec::new(),
		}
	}

	pub fn id_column(mut self, field: &'static str, column: &'static str) -> Self {
		self.columns.push(ColumnMeta {
			field,
			column,
			is_id: true,
		});
		self
	}

	pub fn column(mut self, field: &'static str, column: &'static str) -> Self {
		self.columns.push(ColumnMeta {
			field,
			column,
			is_id: false,
		});
		self
	}

	pub fn relation(
		mut self,
		field: &'static str,
		kind: RelationKind,
		link: Arc<dyn RelationLink<E>>,
	) -> Self {
		self.relations.push(Relation { field, kind, link });
		self
	}

	pub fn table(&self) -> Option<&'static str> {
		self.table
	}

	pub fn columns(&self) -> &[ColumnMeta] {
		&self.columns
	}

	pub fn relations(&self) -> &[Relation<E>] {
		&self.relations
	}
}

/// A type the mapper can persist and reconstruct
pub trait Entity: Sized + Send + Sync + 'static {
	/// The declarative descriptor table for this type.
	fn schema() -> EntitySchema<Self>;

	/// Current id value; `None` when the id field is unset.
	fn id_value(&self) -> Option<SqlValue>;

	/// Write a database-generated id back into the id field.
	fn set_id_value(&mut self, value: SqlValue) -> OrmResult<()>;

	/// Scalar column values, parallel to the schema's column list.
	fn column_values(&self) -> Vec<SqlValue>;

	/// Reconstruct an instance from a result row. Relationship fields are
	/// left unresolved; the resolver fills them in afterwards.
	fn from_row(row: &Row) -> OrmResult<Self>;
}

/// Validated metadata: table name plus ordered column list with exactly
/// one id column. Recomputable at will from the type's declarations alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
	pub table: &'static str,
	pub columns: Vec<ColumnMeta>,
	id_index: usize,
}

impl EntityMetadata {
	pub fn id(&self) -> &ColumnMeta {
		&self.columns[self.id_index]
	}
}

/// Derive and validate the metadata for an entity type.
///
/// Fails with [`OrmError::Mapping`] when the type declares no table,
/// when it declares zero or more than one id column, or when a field
/// carries more than one relationship marker.
pub fn describe<E: Entity>() -> OrmResult<EntityMetadata> {
	let schema = E::schema();
	let type_name = std::any::type_name::<E>();

	let Some(table) = schema.table() else {
		return Err(OrmError::mapping(format!(
			"type `{type_name}` declares no table binding"
		)));
	};

	let id_indices: Vec<usize> = schema
		.columns()
		.iter()
		.enumerate()
		.filter(|(_, c)| c.is_id)
		.map(|(i, _)| i)
		.collect();
	let id_index = match id_indices.as_slice() {
		[index] => *index,
		[] => {
			return Err(OrmError::mapping(format!(
				"type `{type_name}` declares no id column"
			)));
		}
		_ => {
			return Err(OrmError::mapping(format!(
				"type `{type_name}` declares more than one id column"
			)));
		}
	};

	let mut seen_fields = std::collections::HashSet::new();
	for relation in schema.relations() {
		if !seen_fields.insert(relation.field) {
			return Err(OrmError::mapping(format!(
				"field `{}` of type `{type_name}` carries more than one relationship marker",
				relation.field
			)));
		}
	}

	Ok(EntityMetadata {
		table,
		columns: schema.columns().to_vec(),
		id_index,
	})
}
