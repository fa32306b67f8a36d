//! Shared fixtures for the integration tests
//!
//! Entity types mirroring a small company/school domain, the DDL to host
//! them, and helpers that stand up a mapper over a temporary SQLite file.

#![allow(dead_code)]

use grappelli::{
	ConnectionPool, DatabaseConfig, Entity, EntityMapper, EntitySchema, OrmResult, RelationKind,
	Row, SqliteConnector, SqlValue, ToMany, ToOne,
};
use std::sync::{Arc, Once};
use tempfile::TempDir;

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness once per process.
pub fn init_tracing() {
	TRACING.call_once(|| {
		let _ = tracing_subscriber::fmt()
			.with_max_level(tracing::Level::DEBUG)
			.with_test_writer()
			.try_init();
	});
}

pub const SCHEMA_DDL: &[&str] = &[
	"CREATE TABLE departments (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
	"CREATE TABLE employees (id INTEGER PRIMARY KEY, name TEXT NOT NULL, department_id INTEGER)",
	"CREATE TABLE cars (id INTEGER PRIMARY KEY, model TEXT NOT NULL, employee_id INTEGER)",
	"CREATE TABLE oceans (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
	"CREATE TABLE species (id INTEGER PRIMARY KEY, name TEXT NOT NULL, ocean_id INTEGER)",
	"CREATE TABLE students (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
	"CREATE TABLE projects (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
	"CREATE TABLE students_projects (student_id INTEGER NOT NULL, project_id INTEGER NOT NULL)",
];

/// Mapper over a fresh SQLite database in a temp directory. The returned
/// guard keeps the directory (and the database file) alive.
pub async fn setup_mapper(pool_size: usize) -> (EntityMapper, TempDir) {
	let dir = tempfile::tempdir().unwrap();
	let url = format!("sqlite://{}", dir.path().join("orm.db").display());
	let pool = setup_pool(&url, pool_size).await;
	let mapper = EntityMapper::new(pool);
	for ddl in SCHEMA_DDL {
		mapper.execute(ddl, &[]).await.unwrap();
	}
	(mapper, dir)
}

pub async fn setup_pool(url: &str, pool_size: usize) -> Arc<ConnectionPool> {
	init_tracing();
	let config = DatabaseConfig::new(url, pool_size);
	let pool = ConnectionPool::open(SqliteConnector::new(config))
		.await
		.unwrap();
	Arc::new(pool)
}

#[derive(Debug, Default, Clone)]
pub struct Department {
	pub id: Option<i64>,
	pub name: String,
	pub employees: Vec<Employee>,
}

impl Department {
	pub fn named(id: i64, name: &str) -> Self {
		Self {
			id: Some(id),
			name: name.to_string(),
			employees: Vec::new(),
		}
	}
}

impl Entity for Department {
	fn schema() -> EntitySchema<Self> {
		EntitySchema::new("departments")
			.id_column("id", "id")
			.column("name", "name")
			.relation(
				"employees",
				RelationKind::OneToMany {
					mapped_by: "department_id",
				},
				ToMany::link(
					|d: &mut Department| &mut d.employees,
					|d: &mut Department, v| d.employees = v,
				),
			)
	}

	fn id_value(&self) -> Option<SqlValue> {
		self.id.map(SqlValue::Int)
	}

	fn set_id_value(&mut self, value: SqlValue) -> OrmResult<()> {
		self.id = Some(i64::try_from(value)?);
		Ok(())
	}

	fn column_values(&self) -> Vec<SqlValue> {
		vec![self.id.into(), self.name.clone().into()]
	}

	fn from_row(row: &Row) -> OrmResult<Self> {
		Ok(Self {
			id: row.get_opt("id")?,
			name: row.get("name")?,
			employees: Vec::new(),
		})
	}
}

#[derive(Debug, Default, Clone)]
pub struct Employee {
	pub id: Option<i64>,
	pub name: String,
	pub department: Option<Department>,
	pub car: Option<Car>,
}

impl Employee {
	pub fn named(id: i64, name: &str) -> Self {
		Self {
			id: Some(id),
			name: name.to_string(),
			..Default::default()
		}
	}
}

impl Entity for Employee {
	fn schema() -> EntitySchema<Self> {
		EntitySchema::new("employees")
			.id_column("id", "id")
			.column("name", "name")
			.relation(
				"department",
				RelationKind::ManyToOne {
					column: "department_id",
				},
				ToOne::link(
					|e: &mut Employee| e.department.as_mut(),
					|e: &mut Employee, v| e.department = v,
				),
			)
			.relation(
				"car",
				RelationKind::OneToOne {
					column: "employee_id",
					fk_held_here: false,
				},
				ToOne::link(
					|e: &mut Employee| e.car.as_mut(),
					|e: &mut Employee, v| e.car = v,
				),
			)
	}

	fn id_value(&self) -> Option<SqlValue> {
		self.id.map(SqlValue::Int)
	}

	fn set_id_value(&mut self, value: SqlValue) -> OrmResult<()> {
		self.id = Some(i64::try_from(value)?);
		Ok(())
	}

	fn column_values(&self) -> Vec<SqlValue> {
		vec![self.id.into(), self.name.clone().into()]
	}

	fn from_row(row: &Row) -> OrmResult<Self> {
		Ok(Self {
			id: row.get_opt("id")?,
			name: row.get("name")?,
			..Default::default()
		})
	}
}

/// The car boxes its employee so the mutual one-to-one pair stays sized.
#[derive(Debug, Default, Clone)]
pub struct Car {
	pub id: Option<i64>,
	pub model: String,
	pub employee: Option<Box<Employee>>,
}

impl Entity for Car {
	fn schema() -> EntitySchema<Self> {
		EntitySchema::new("cars")
			.id_column("id", "id")
			.column("model", "model")
			.relation(
				"employee",
				RelationKind::OneToOne {
					column: "employee_id",
					fk_held_here: true,
				},
				ToOne::link(
					|c: &mut Car| c.employee.as_deref_mut(),
					|c: &mut Car, v| c.employee = v.map(Box::new),
				),
			)
	}

	fn id_value(&self) -> Option<SqlValue> {
		self.id.map(SqlValue::Int)
	}

	fn set_id_value(&mut self, value: SqlValue) -> OrmResult<()> {
		self.id = Some(i64::try_from(value)?);
		Ok(())
	}

	fn column_values(&self) -> Vec<SqlValue> {
		vec![self.id.into(), self.model.clone().into()]
	}

	fn from_row(row: &Row) -> OrmResult<Self> {
		Ok(Self {
			id: row.get_opt("id")?,
			model: row.get("model")?,
			employee: None,
		})
	}
}

#[derive(Debug, Default, Clone)]
pub struct Ocean {
	pub id: Option<i64>,
	pub name: String,
	pub species: Option<Box<Species>>,
}

impl Entity for Ocean {
	fn schema() -> EntitySchema<Self> {
		EntitySchema::new("oceans")
			.id_column("id", "id")
			.column("name", "name")
			.relation(
				"species",
				RelationKind::OneToOne {
					column: "ocean_id",
					fk_held_here: false,
				},
				ToOne::link(
					|o: &mut Ocean| o.species.as_deref_mut(),
					|o: &mut Ocean, v| o.species = v.map(Box::new),
				),
			)
	}

	fn id_value(&self) -> Option<SqlValue> {
		self.id.map(SqlValue::Int)
	}

	fn set_id_value(&mut self, value: SqlValue) -> OrmResult<()> {
		self.id = Some(i64::try_from(value)?);
		Ok(())
	}

	fn column_values(&self) -> Vec<SqlValue> {
		vec![self.id.into(), self.name.clone().into()]
	}

	fn from_row(row: &Row) -> OrmResult<Self> {
		Ok(Self {
			id: row.get_opt("id")?,
			name: row.get("name")?,
			species: None,
		})
	}
}

#[derive(Debug, Default, Clone)]
pub struct Species {
	pub id: Option<i64>,
	pub name: String,
	pub ocean: Option<Ocean>,
}

impl Entity for Species {
	fn schema() -> EntitySchema<Self> {
		EntitySchema::new("species")
			.id_column("id", "id")
			.column("name", "name")
			.relation(
				"ocean",
				RelationKind::OneToOne {
					column: "ocean_id",
					fk_held_here: true,
				},
				ToOne::link(
					|s: &mut Species| s.ocean.as_mut(),
					|s: &mut Species, v| s.ocean = v,
				),
			)
	}

	fn id_value(&self) -> Option<SqlValue> {
		self.id.map(SqlValue::Int)
	}

	fn set_id_value(&mut self, value: SqlValue) -> OrmResult<()> {
		self.id = Some(i64::try_from(value)?);
		Ok(())
	}

	fn column_values(&self) -> Vec<SqlValue> {
		vec![self.id.into(), self.name.clone().into()]
	}

	fn from_row(row: &Row) -> OrmResult<Self> {
		Ok(Self {
			id: row.get_opt("id")?,
			name: row.get("name")?,
			ocean: None,
		})
	}
}

#[derive(Debug, Default, Clone)]
pub struct Student {
	pub id: Option<i64>,
	pub name: String,
	pub projects: Vec<Project>,
}

impl Entity for Student {
	fn schema() -> EntitySchema<Self> {
		EntitySchema::new("students")
			.id_column("id", "id")
			.column("name", "name")
			.relation(
				"projects",
				RelationKind::ManyToMany {
					join_table: "students_projects",
					join_column: "student_id",
					inverse_join_column: "project_id",
					owning: true,
				},
				ToMany::link(
					|s: &mut Student| &mut s.projects,
					|s: &mut Student, v| s.projects = v,
				),
			)
	}

	fn id_value(&self) -> Option<SqlValue> {
		self.id.map(SqlValue::Int)
	}

	fn set_id_value(&mut self, value: SqlValue) -> OrmResult<()> {
		self.id = Some(i64::try_from(value)?);
		Ok(())
	}

	fn column_values(&self) -> Vec<SqlValue> {
		vec![self.id.into(), self.name.clone().into()]
	}

	fn from_row(row: &Row) -> OrmResult<Self> {
		Ok(Self {
			id: row.get_opt("id")?,
			name: row.get("name")?,
			projects: Vec::new(),
		})
	}
}

#[derive(Debug, Default, Clone)]
pub struct Project {
	pub id: Option<i64>,
	pub name: String,
	pub students: Vec<Student>,
}

impl Entity for Project {
	fn schema() -> EntitySchema<Self> {
		EntitySchema::new("projects")
			.id_column("id", "id")
			.column("name", "name")
			.relation(
				"students",
				RelationKind::ManyToMany {
					join_table: "students_projects",
					join_column: "project_id",
					inverse_join_column: "student_id",
					owning: false,
				},
				ToMany::link(
					|p: &mut Project| &mut p.students,
					|p: &mut Project, v| p.students = v,
				),
			)
	}

	fn id_value(&self) -> Option<SqlValue> {
		self.id.map(SqlValue::Int)
	}

	fn set_id_value(&mut self, value: SqlValue) -> OrmResult<()> {
		self.id = Some(i64::try_from(value)?);
		Ok(())
	}

	fn column_values(&self) -> Vec<SqlValue> {
		vec![self.id.into(), self.name.clone().into()]
	}

	fn from_row(row: &Row) -> OrmResult<Self> {
		Ok(Self {
			id: row.get_opt("id")?,
			name: row.get("name")?,
			students: Vec::new(),
		})
	}
}
