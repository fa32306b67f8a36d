//! Entity mapper façade
//!
//! Orchestrates the metadata registry, statement builders, relationship
//! resolver, and connection pool behind `save`/`find`/`update`/`delete`
//! plus raw `query`/`execute` escape hatches. Each statement runs on a
//! pooled connection acquired for exactly that purpose and released on
//! every exit path; nested relationship I/O performs its own scoped
//! acquisitions, so a pool of size one never deadlocks on recursion.

use crate::error::{OrmError, OrmResult};
use crate::metadata::{describe, Entity, EntityMetadata, RelationKind};
use crate::pool::ConnectionPool;
use crate::relations::ResolveContext;
use crate::statements::{
	build_delete, build_insert, build_join_insert, build_select_by_column, build_select_by_id,
	build_select_via_join, build_update,
};
use crate::value::{Row, SqlValue};
use std::sync::Arc;

/// The top-level mapper handle
///
/// Cheap to clone via the shared pool; multiple tasks may call into one
/// mapper concurrently; the pool is the only synchronization point.
pub struct EntityMapper {
	pool: Arc<ConnectionPool>,
}

impl EntityMapper {
	pub fn new(pool: Arc<ConnectionPool>) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &Arc<ConnectionPool> {
		&self.pool
	}

	/// Persist an entity as a new row.
	///
	/// Foreign-key columns owned by this side are resolved first (saving
	/// related entities whose ids are unset), then the INSERT executes; a
	/// database-generated id is written back into the entity when the
	/// caller left the id unset. Owning-side many-to-many join rows are
	/// written idempotently on the same connection. Observers are
	/// notified once on success.
	pub async fn save<E: Entity>(&self, entity: &mut E) -> OrmResult<()> {
		let mut ctx = ResolveContext::new();
		self.save_in(entity, &mut ctx).await
	}

	pub(crate) async fn save_in<E: Entity>(
		&self,
		entity: &mut E,
		ctx: &mut ResolveContext,
	) -> OrmResult<()> {
		let meta = describe::<E>()?;
		let schema = E::schema();

		// Owned foreign keys ride in the same INSERT; no extra round trip.
		let mut extras = Vec::new();
		for relation in schema.relations() {
			if let Some(column) = relation.kind.owned_column()
				&& let Some(id) = relation
					.link
					.owned_fk_value(self, entity, &relation.kind, ctx)
					.await?
			{
				extras.push((column.to_string(), id));
			}
		}

		// Join partners are resolved before any connection is held, so
		// the recursive saves acquire freely.
		let mut join_writes = Vec::new();
		for relation in schema.relations() {
			if let RelationKind::ManyToMany {
				join_table,
				join_column,
				inverse_join_column,
				owning: true,
			} = relation.kind
			{
				let partners = relation
					.link
					.join_partners(self, entity, &relation.kind, ctx)
					.await?;
				if !partners.is_empty() {
					join_writes.push((join_table, join_column, inverse_join_column, partners));
				}
			}
		}

		let include_id = entity.id_value().is_some();
		let values = entity.column_values();
		let (sql, params) = build_insert(&meta, &values, &extras, include_id);

		let mut conn = self.pool.acquire().await?;
		tracing::debug!(target: "grappelli::mapper", table = meta.table, sql = %sql, "insert");
		let result = conn.execute(&sql, &params).await?;
		if !include_id && let Some(id) = result.last_insert_id {
			entity.set_id_value(SqlValue::Int(id))?;
		}

		if !join_writes.is_empty() {
			let this_id = entity
				.id_value()
				.ok_or_else(|| OrmError::persistence("entity id is unset after insert"))?;
			for (join_table, join_column, inverse_join_column, partners) in join_writes {
				let join_sql = build_join_insert(join_table, join_column, inverse_join_column);
				for related_id in partners {
					let join_params = [
						this_id.clone(),
						related_id.clone(),
						this_id.clone(),
						related_id,
					];
					conn.execute(&join_sql, &join_params).await?;
				}
			}
		}
		drop(conn);

		self.pool
			.notify(&format!("entity saved in table {}", meta.table))
			.await;
		Ok(())
	}

	/// Look an entity up by id, eagerly resolving its relationships.
	/// `Ok(None)` when no row matches.
	pub async fn find<E: Entity>(&self, id: impl Into<SqlValue>) -> OrmResult<Option<E>> {
		let mut ctx = ResolveContext::new();
		self.find_in(id.into(), &mut ctx).await
	}

	pub(crate) async fn find_in<E: Entity>(
		&self,
		id: SqlValue,
		ctx: &mut ResolveContext,
	) -> OrmResult<Option<E>> {
		let meta = describe::<E>()?;
		if !ctx.enter(meta.table, &id) {
			// Already loading this row further up the call chain; leave
			// the reference unresolved instead of recursing forever.
			return Ok(None);
		}
		let result = self.find_row::<E>(&meta, &id, ctx).await;
		ctx.leave(meta.table, &id);
		result
	}

	async fn find_row<E: Entity>(
		&self,
		meta: &EntityMetadata,
		id: &SqlValue,
		ctx: &mut ResolveContext,
	) -> OrmResult<Option<E>> {
		let sql = build_select_by_id(meta);
		let row = {
			let mut conn = self.pool.acquire().await?;
			tracing::debug!(target: "grappelli::mapper", table = meta.table, sql = %sql, "select");
			conn.fetch_optional(&sql, std::slice::from_ref(id)).await?
		};
		let Some(row) = row else {
			return Ok(None);
		};
		let mut entity = E::from_row(&row)?;
		self.resolve_relations(&mut entity, &row, ctx).await?;
		Ok(Some(entity))
	}

	/// Load every entity whose `column` equals `value`, resolving
	/// relationships per row (reverse one-to-one and one-to-many loads).
	pub(crate) async fn find_by_column_in<E: Entity>(
		&self,
		column: &str,
		value: &SqlValue,
		first_only: bool,
		ctx: &mut ResolveContext,
	) -> OrmResult<Vec<E>> {
		let meta = describe::<E>()?;
		let sql = build_select_by_column(&meta, column);
		self.load_rows::<E>(&meta, &sql, value, first_only, ctx).await
	}

	/// Load the related side of a many-to-many through its join table.
	pub(crate) async fn find_via_join_in<E: Entity>(
		&self,
		join_table: &str,
		join_column: &str,
		inverse_join_column: &str,
		id: &SqlValue,
		ctx: &mut ResolveContext,
	) -> OrmResult<Vec<E>> {
		let meta = describe::<E>()?;
		let sql = build_select_via_join(&meta, join_table, join_column, inverse_join_column);
		self.load_rows::<E>(&meta, &sql, id, false, ctx).await
	}

	async fn load_rows<E: Entity>(
		&self,
		meta: &EntityMetadata,
		sql: &str,
		param: &SqlValue,
		first_only: bool,
		ctx: &mut ResolveContext,
	) -> OrmResult<Vec<E>> {
		let rows = {
			let mut conn = self.pool.acquire().await?;
			tracing::debug!(target: "grappelli::mapper", table = meta.table, sql = %sql, "select");
			conn.fetch_all(sql, std::slice::from_ref(param)).await?
		};
		let mut entities = Vec::with_capacity(rows.len());
		for row in rows {
			let mut entity = E::from_row(&row)?;
			let id = entity.id_value();
			let entered = match &id {
				Some(id) => ctx.enter(meta.table, id),
				None => false,
			};
			if entered {
				let resolved = self.resolve_relations(&mut entity, &row, ctx).await;
				if let Some(id) = &id {
					ctx.leave(meta.table, id);
				}
				resolved?;
			}
			entities.push(entity);
			if first_only {
				break;
			}
		}
		Ok(entities)
	}

	async fn resolve_relations<E: Entity>(
		&self,
		entity: &mut E,
		row: &Row,
		ctx: &mut ResolveContext,
	) -> OrmResult<()> {
		let schema = E::schema();
		for relation in schema.relations() {
			relation
				.link
				.load(self, entity, row, &relation.kind, ctx)
				.await?;
		}
		Ok(())
	}

	/// Rewrite an existing row; every non-id column is set, keyed by id.
	/// Fails with a persistence error when the id field is unset.
	/// Relationship columns owned by this side are included exactly as in
	/// [`EntityMapper::save`]; join rows and children are not touched.
	pub async fn update<E: Entity>(&self, entity: &mut E) -> OrmResult<()> {
		let meta = describe::<E>()?;
		if entity.id_value().is_none() {
			return Err(OrmError::persistence(format!(
				"cannot update a row of `{}` from an entity with no id",
				meta.table
			)));
		}
		let mut ctx = ResolveContext::new();
		let schema = E::schema();
		let mut extras = Vec::new();
		for relation in schema.relations() {
			if let Some(column) = relation.kind.owned_column()
				&& let Some(id) = relation
					.link
					.owned_fk_value(self, entity, &relation.kind, &mut ctx)
					.await?
			{
				extras.push((column.to_string(), id));
			}
		}
		let values = entity.column_values();
		let (sql, params) = build_update(&meta, &values, &extras)?;
		{
			let mut conn = self.pool.acquire().await?;
			tracing::debug!(target: "grappelli::mapper", table = meta.table, sql = %sql, "update");
			conn.execute(&sql, &params).await?;
		}
		self.pool
			.notify(&format!("entity updated in table {}", meta.table))
			.await;
		Ok(())
	}

	/// Delete the entity's row by id. Related rows and join-table entries
	/// are the caller's responsibility. Fails with a persistence error
	/// when the id field is unset.
	pub async fn delete<E: Entity>(&self, entity: &E) -> OrmResult<()> {
		let meta = describe::<E>()?;
		let Some(id) = entity.id_value() else {
			return Err(OrmError::persistence(format!(
				"cannot delete a row of `{}` from an entity with no id",
				meta.table
			)));
		};
		let sql = build_delete(&meta);
		{
			let mut conn = self.pool.acquire().await?;
			tracing::debug!(target: "grappelli::mapper", table = meta.table, sql = %sql, "delete");
			conn.execute(&sql, &[id]).await?;
		}
		self.pool
			.notify(&format!("entity deleted from table {}", meta.table))
			.await;
		Ok(())
	}

	/// Raw parameterized query; rows map through the entity's column
	/// population only; relationships are intentionally left unresolved.
	pub async fn query<E: Entity>(&self, sql: &str, params: &[SqlValue]) -> OrmResult<Vec<E>> {
		let rows = {
			let mut conn = self.pool.acquire().await?;
			tracing::debug!(target: "grappelli::mapper", sql = %sql, "raw query");
			conn.fetch_all(sql, params).await?
		};
		rows.iter().map(E::from_row).collect()
	}

	/// Raw parameterized statement; returns the affected-row count.
	pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> OrmResult<u64> {
		let mut conn = self.pool.acquire().await?;
		tracing::debug!(target: "grappelli::mapper", sql = %sql, "raw execute");
		let result = conn.execute(sql, params).await?;
		Ok(result.rows_affected)
	}
}
