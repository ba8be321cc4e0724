//! Statement shapes per operation kind.
//!
//! Each function builds the fragment sequence for one kind; render strategies
//! turn it into code later. Identifiers come from a validated schema and every
//! value is a placeholder.

use crate::engine::{Context, PAGE_NUMBER, PAGE_SIZE};
use crate::error::{CrudError, CrudResult};
use crate::planner::Operation;
use crate::schema::{Column, Relation};
use crate::statement::Statement;

fn projection(stmt: &mut Statement, relation: &Relation<'_>) {
    stmt.keyword("select")
        .list(relation.columns().iter().map(|c| c.name.as_str()), ",");
}

/// `Col = @Col` terms joined with `and`.
fn predicate(stmt: &mut Statement, ctx: &Context<'_>, key: &[&Column]) {
    let terms = key
        .iter()
        .map(|c| format!("{} = {}", c.name, ctx.column_marker(c)));
    stmt.keyword("where").list(terms, " and");
}

/// `select .. from R [where ..] [order by .. offset .. fetch ..]` for tables,
/// `select .. from V` for views, `select .. from F(@p, ..)` for functions.
pub fn read_all(op: &Operation<'_>, ctx: &Context<'_>) -> CrudResult<Statement> {
    let mut stmt = Statement::new();
    projection(&mut stmt, &op.relation);
    stmt.keyword("from");

    match op.relation {
        Relation::Table(table) => {
            stmt.item(op.relation.full_name());

            let filters = ctx.filters(table, op.settings.paging)?;
            if !filters.is_empty() {
                let terms = filters.iter().map(|f| {
                    let marker = ctx.dialect.marker(&f.marker);
                    format!("({} is null or {} = {})", marker, f.column.name, marker)
                });
                stmt.keyword("where").list(terms, " and");
            }

            if op.settings.paging {
                let first = table.columns.first().ok_or_else(|| {
                    CrudError::Schema(format!("{} has no columns to order by", table.name))
                })?;
                let size = ctx.scalar_marker(PAGE_SIZE);
                let number = ctx.scalar_marker(PAGE_NUMBER);
                stmt.keyword("order by")
                    .item(first.name.as_str())
                    .keyword(&format!("offset {} * ({} - 1) rows", size, number))
                    .keyword(&format!("fetch next {} rows only", size));
            }
        }
        Relation::View(_) => {
            stmt.item(op.relation.full_name());
        }
        Relation::Function(function) => {
            let args: Vec<String> = function
                .parameters
                .iter()
                .map(|p| ctx.dialect.marker(&p.name))
                .collect();
            stmt.item(format!("{}({})", op.relation.full_name(), args.join(", ")));
        }
    }

    Ok(stmt)
}

/// `select .. from R where k1 = @k1 and ..` over the primary key or the
/// governing unique constraint.
pub fn read_by_key(op: &Operation<'_>, ctx: &Context<'_>) -> CrudResult<Statement> {
    let key = ctx.key_columns(op)?;
    let mut stmt = Statement::new();
    projection(&mut stmt, &op.relation);
    stmt.keyword("from").item(op.relation.full_name());
    predicate(&mut stmt, ctx, &key);
    Ok(stmt)
}

/// `insert into R (..) values (..)` plus the identity retrieval clause.
pub fn insert(op: &Operation<'_>, ctx: &Context<'_>) -> CrudResult<Statement> {
    let table = op.table()?;
    let columns = ctx.insert_columns(table);

    let mut stmt = Statement::new();
    stmt.keyword("insert into").item(op.relation.full_name());

    if columns.is_empty() {
        stmt.keyword("default values");
    } else {
        stmt.item("(")
            .list(columns.iter().map(|c| c.name.as_str()), ",")
            .item(")")
            .keyword("values")
            .item("(")
            .list(columns.iter().map(|c| ctx.column_marker(c)), ",")
            .item(")");
    }

    if let Some(identity) = table.identity_column() {
        let clause = ctx
            .dialect
            .identity_retrieval(&identity.name, &ctx.column_marker(identity));
        stmt.keyword(&clause);
    }

    Ok(stmt)
}

/// `update R set c = @c, .. where k = @k and ..`.
///
/// A table whose every column is part of the key sets the key to itself.
pub fn update(op: &Operation<'_>, ctx: &Context<'_>) -> CrudResult<Statement> {
    let table = op.table()?;
    let key = ctx.key_columns(op)?;
    let mut sets = ctx.update_columns(table);
    if sets.is_empty() {
        sets = key.clone();
    }

    let mut stmt = Statement::new();
    stmt.keyword("update")
        .item(op.relation.full_name())
        .keyword("set")
        .list(
            sets.iter()
                .map(|c| format!("{} = {}", c.name, ctx.column_marker(c))),
            ",",
        );
    predicate(&mut stmt, ctx, &key);
    Ok(stmt)
}

/// `delete from R where k = @k and ..`.
pub fn delete(op: &Operation<'_>, ctx: &Context<'_>) -> CrudResult<Statement> {
    let key = ctx.key_columns(op)?;
    let mut stmt = Statement::new();
    stmt.keyword("delete from").item(op.relation.full_name());
    predicate(&mut stmt, ctx, &key);
    Ok(stmt)
}
