//! Relationship resolution
//!
//! Each relationship field on a schema carries a typed link into the
//! related entity type. On save the link resolves the foreign-key value
//! this side owns (recursively saving a related entity whose id is still
//! unset) and lists the join partners of an owning-side many-to-many; on
//! load it performs the nested finds each kind requires.
//!
//! Recursion is bounded: a [`ResolveContext`] travels with every top-level
//! mapper operation, carrying a seen-set of `(table, id)` pairs currently
//! being loaded and a depth counter for the save path. A pair already in
//! flight is left unresolved instead of recursing, so mutual one-to-one
//! graphs load without looping.

use crate::error::{OrmError, OrmResult};
use crate::mapper::EntityMapper;
use crate::metadata::{Entity, RelationKind};
use crate::value::{Row, SqlValue};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

const MAX_SAVE_DEPTH: usize = 16;

/// Per-operation recursion state
#[derive(Debug, Default)]
pub struct ResolveContext {
	depth: usize,
	in_flight: HashSet<(String, String)>,
}

impl ResolveContext {
	pub fn new() -> Self {
		Self::default()
	}

	/// Mark a `(table, id)` pair as being loaded. Returns false when the
	/// pair is already in flight, i.e. a cycle was detected.
	pub(crate) fn enter(&mut self, table: &str, id: &SqlValue) -> bool {
		self.in_flight.insert((table.to_string(), id.key()))
	}

	pub(crate) fn leave(&mut self, table: &str, id: &SqlValue) {
		self.in_flight.remove(&(table.to_string(), id.key()));
	}

	pub(crate) fn descend(&mut self) -> OrmResult<()> {
		self.depth += 1;
		if self.depth > MAX_SAVE_DEPTH {
			return Err(OrmError::persistence(
				"relationship recursion exceeded the depth limit",
			));
		}
		Ok(())
	}

	pub(crate) fn ascend(&mut self) {
		self.depth = self.depth.saturating_sub(1);
	}
}

/// Typed bridge from a parent entity type to one related type
#[async_trait]
pub trait RelationLink<E>: Send + Sync {
	/// Resolve the foreign-key value this side stores in its own row, if
	/// the kind owns one. A related entity with an unset id is saved
	/// first so its id exists to reference.
	async fn owned_fk_value(
		&self,
		mapper: &EntityMapper,
		entity: &mut E,
		kind: &RelationKind,
		ctx: &mut ResolveContext,
	) -> OrmResult<Option<SqlValue>>;

	/// Ids of the related entities an owning-side many-to-many must link
	/// through its join table, saving unset related entities first.
	async fn join_partners(
		&self,
		mapper: &EntityMapper,
		entity: &mut E,
		kind: &RelationKind,
		ctx: &mut ResolveContext,
	) -> OrmResult<Vec<SqlValue>>;

	/// Populate the relationship field from a freshly loaded base row.
	async fn load(
		&self,
		mapper: &EntityMapper,
		entity: &mut E,
		row: &Row,
		kind: &RelationKind,
		ctx: &mut ResolveContext,
	) -> OrmResult<()>;
}

type GetMut<E, R> = for<'a> fn(&'a mut E) -> Option<&'a mut R>;
type Set<E, R> = fn(&mut E, Option<R>);

/// Link for single-valued relationships (`OneToOne`, `ManyToOne`)
pub struct ToOne<E, R> {
	get_mut: GetMut<E, R>,
	set: Set<E, R>,
}

impl<E, R> ToOne<E, R>
where
	E: Entity,
	R: Entity,
{
	pub fn link(get_mut: GetMut<E, R>, set: Set<E, R>) -> Arc<dyn RelationLink<E>> {
		Arc::new(Self { get_mut, set })
	}
}

#[async_trait]
impl<E, R> RelationLink<E> for ToOne<E, R>
where
	E: Entity,
	R: Entity,
{
	async fn owned_fk_value(
		&self,
		mapper: &EntityMapper,
		entity: &mut E,
		kind: &RelationKind,
		ctx: &mut ResolveContext,
	) -> OrmResult<Option<SqlValue>> {
		if kind.owned_column().is_none() {
			// The other table holds the key; the reverse side writes it
			// when it is saved.
			return Ok(None);
		}
		let Some(related) = (self.get_mut)(entity) else {
			return Ok(None);
		};
		if related.id_value().is_none() {
			ctx.descend()?;
			let result = mapper.save_in(related, ctx).await;
			ctx.ascend();
			result?;
		}
		Ok(related.id_value())
	}

	async fn join_partners(
		&self,
		_mapper: &EntityMapper,
		_entity: &mut E,
		_kind: &RelationKind,
		_ctx: &mut ResolveContext,
	) -> OrmResult<Vec<SqlValue>> {
		Ok(Vec::new())
	}

	async fn load(
		&self,
		mapper: &EntityMapper,
		entity: &mut E,
		row: &Row,
		kind: &RelationKind,
		ctx: &mut ResolveContext,
	) -> OrmResult<()> {
		match kind {
			RelationKind::ManyToOne { column }
			| RelationKind::OneToOne {
				column,
				fk_held_here: true,
			} => {
				let fk = row.value(column).cloned().unwrap_or(SqlValue::Null);
				if fk.is_null() {
					(self.set)(entity, None);
					return Ok(());
				}
				let related = mapper.find_in::<R>(fk, ctx).await?;
				(self.set)(entity, related);
			}
			RelationKind::OneToOne {
				column,
				fk_held_here: false,
			} => {
				let Some(id) = entity.id_value() else {
					return Ok(());
				};
				let mut matches = mapper.find_by_column_in::<R>(column, &id, true, ctx).await?;
				(self.set)(entity, matches.pop());
			}
			_ => {}
		}
		Ok(())
	}
}

type GetVec<E, R> = for<'a> fn(&'a mut E) -> &'a mut Vec<R>;
type SetVec<E, R> = fn(&mut E, Vec<R>);

/// Link for collection-valued relationships (`OneToMany`, `ManyToMany`)
pub struct ToMany<E, R> {
	get_mut: GetVec<E, R>,
	set: SetVec<E, R>,
}

impl<E, R> ToMany<E, R>
where
	E: Entity,
	R: Entity,
{
	pub fn link(get_mut: GetVec<E, R>, set: SetVec<E, R>) -> Arc<dyn RelationLink<E>> {
		Arc::new(Self { get_mut, set })
	}
}

#[async_trait]
impl<E, R> RelationLink<E> for ToMany<E, R>
where
	E: Entity,
	R: Entity,
{
	async fn owned_fk_value(
		&self,
		_mapper: &EntityMapper,
		_entity: &mut E,
		_kind: &RelationKind,
		_ctx: &mut ResolveContext,
	) -> OrmResult<Option<SqlValue>> {
		// Collections never contribute a column to this table. Saving the
		// one side of a one-to-many does not cascade to its children.
		Ok(None)
	}

	async fn join_partners(
		&self,
		mapper: &EntityMapper,
		entity: &mut E,
		kind: &RelationKind,
		ctx: &mut ResolveContext,
	) -> OrmResult<Vec<SqlValue>> {
		let RelationKind::ManyToMany { owning: true, .. } = kind else {
			return Ok(Vec::new());
		};
		let mut partners = Vec::new();
		for related in (self.get_mut)(entity).iter_mut() {
			if related.id_value().is_none() {
				ctx.descend()?;
				let result = mapper.save_in(related, ctx).await;
				ctx.ascend();
				result?;
			}
			let id = related.id_value().ok_or_else(|| {
				OrmError::persistence("related entity id is unset after save")
			})?;
			partners.push(id);
		}
		Ok(partners)
	}

	async fn load(
		&self,
		mapper: &EntityMapper,
		entity: &mut E,
		_row: &Row,
		kind: &RelationKind,
		ctx: &mut ResolveContext,
	) -> OrmResult<()> {
		let Some(id) = entity.id_value() else {
			return Ok(());
		};
		match kind {
			RelationKind::OneToMany { mapped_by } => {
				let children = mapper
					.find_by_column_in::<R>(mapped_by, &id, false, ctx)
					.await?;
				(self.set)(entity, children);
			}
			RelationKind::ManyToMany {
				join_table,
				join_column,
				inverse_join_column,
				..
			} => {
				let related = mapper
					.find_via_join_in::<R>(join_table, join_column, inverse_join_column, &id, ctx)
					.await?;
				(self.set)(entity, related);
			}
			_ => {}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_context_detects_in_flight_pairs() {
		let mut ctx = ResolveContext::new();
		let id = SqlValue::Int(1);
		assert!(ctx.enter("departments", &id));
		assert!(!ctx.enter("departments", &id));
		assert!(ctx.enter("employees", &id));
		ctx.leave("departments", &id);
		assert!(ctx.enter("departments", &id));
	}

	#[test]
	fn test_context_depth_limit() {
		let mut ctx = ResolveContext::new();
		for _ in 0..MAX_SAVE_DEPTH {
			ctx.descend().unwrap();
		}
		assert!(ctx.descend().unwrap_err().is_persistence());
	}
}
