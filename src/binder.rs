//! Parameter binder.
//!
//! Produces the bindings for one operation in the order their placeholders
//! first occur in the rendered statement.

use serde::Serialize;

use crate::engine::{Context, PAGE_NUMBER, PAGE_SIZE};
use crate::error::CrudResult;
use crate::planner::Operation;
use crate::schema::{Column, Relation};
use crate::types::{DbType, ResolvedType};

/// Page size used when the caller passes nothing.
pub const DEFAULT_PAGE_SIZE: i64 = 10;
/// First page.
pub const DEFAULT_PAGE_NUMBER: i64 = 1;

/// Where a bound value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "from", rename_all = "kebab-case")]
pub enum ValueSource {
    /// Caller-supplied scalar argument.
    Argument { name: String },
    /// Attribute of the supplied entity.
    Entity { property: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Input,
    /// Filled by the statement; only the post-insert identity.
    Output,
}

/// One placeholder binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    /// Placeholder name without prefix.
    pub name: String,
    pub source: ValueSource,
    pub direction: Direction,
    #[serde(rename = "type")]
    pub ty: ResolvedType,
}

fn paging_type() -> ResolvedType {
    ResolvedType::new("i32", DbType::Int32)
}

fn entity_input(ctx: &Context<'_>, relation: &Relation<'_>, column: &Column) -> CrudResult<Binding> {
    Ok(Binding {
        name: ctx.naming.column_marker(&column.name),
        source: ValueSource::Entity {
            property: ctx.naming.property_name(&column.name),
        },
        direction: Direction::Input,
        ty: ctx.resolve_column(relation, column)?,
    })
}

fn scalar_input(name: String, argument: String, ty: ResolvedType) -> Binding {
    Binding {
        name,
        source: ValueSource::Argument { name: argument },
        direction: Direction::Input,
        ty,
    }
}

fn entity_inputs(
    ctx: &Context<'_>,
    relation: &Relation<'_>,
    columns: &[&Column],
) -> CrudResult<Vec<Binding>> {
    columns
        .iter()
        .map(|c| entity_input(ctx, relation, c))
        .collect()
}

/// Foreign key filters, then `pageSize` and `pageNumber` for tables;
/// declared parameters for table functions; nothing for views.
pub fn read_all(op: &Operation<'_>, ctx: &Context<'_>) -> CrudResult<Vec<Binding>> {
    let relation = &op.relation;
    match op.relation {
        Relation::Table(table) => {
            let mut bindings = Vec::new();
            for filter in ctx.filters(table, op.settings.paging)? {
                let column = filter.column;
                bindings.push(scalar_input(
                    filter.marker,
                    filter.argument,
                    ctx.resolve(relation, &column.name, &column.declared_type)?,
                ));
            }
            if op.settings.paging {
                for name in [PAGE_SIZE, PAGE_NUMBER] {
                    bindings.push(scalar_input(
                        ctx.naming.scalar_marker(name),
                        ctx.naming.parameter_name(name),
                        paging_type(),
                    ));
                }
            }
            Ok(bindings)
        }
        Relation::View(_) => Ok(Vec::new()),
        Relation::Function(function) => function
            .parameters
            .iter()
            .map(|p| -> CrudResult<Binding> {
                Ok(scalar_input(
                    p.name.clone(),
                    ctx.naming.parameter_name(&p.name),
                    ctx.resolve(relation, &p.name, &p.declared_type)?,
                ))
            })
            .collect(),
    }
}

/// Governing key columns, read from the entity.
pub fn read_by_key(op: &Operation<'_>, ctx: &Context<'_>) -> CrudResult<Vec<Binding>> {
    entity_inputs(ctx, &op.relation, &ctx.key_columns(op)?)
}

/// Insertable columns, then the identity as an output binding.
pub fn insert(op: &Operation<'_>, ctx: &Context<'_>) -> CrudResult<Vec<Binding>> {
    let table = op.table()?;

    let mut bindings = entity_inputs(ctx, &op.relation, &ctx.insert_columns(table))?;
    if let Some(identity) = table.identity_column() {
        bindings.push(Binding {
            direction: Direction::Output,
            ..entity_input(ctx, &op.relation, identity)?
        });
    }
    Ok(bindings)
}

/// Update columns, then primary key columns.
pub fn update(op: &Operation<'_>, ctx: &Context<'_>) -> CrudResult<Vec<Binding>> {
    let table = op.table()?;

    let key = ctx.key_columns(op)?;
    let sets = ctx.update_columns(table);
    if sets.is_empty() {
        // Key assigned to itself; each key placeholder is bound once
        return entity_inputs(ctx, &op.relation, &key);
    }

    let mut bindings = entity_inputs(ctx, &op.relation, &sets)?;
    bindings.extend(entity_inputs(ctx, &op.relation, &key)?);
    Ok(bindings)
}

/// Primary key columns.
pub fn delete(op: &Operation<'_>, ctx: &Context<'_>) -> CrudResult<Vec<Binding>> {
    entity_inputs(ctx, &op.relation, &ctx.key_columns(op)?)
}
