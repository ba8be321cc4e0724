//! Synthesis engine.
//!
//! Drives one pass per relation: plan the operations, then for each one run
//! the renderer and binder picked from a single dispatch table, assemble the
//! method descriptor, and check that the statement's placeholders and the
//! bindings line up.

use serde::Serialize;

use crate::assembler::{self, MethodDescriptor};
use crate::binder::{self, Binding};
use crate::dialect::SqlDialect;
use crate::error::{CrudError, CrudResult};
use crate::naming::{DefaultNaming, Naming};
use crate::parser;
use crate::planner::{self, Operation, OperationKind};
use crate::schema::{Column, Relation, RelationKind, Schema, Table};
use crate::settings::Settings;
use crate::statement::Statement;
use crate::transpiler;
use crate::types::{ResolvedType, SqlServerTypes, TypeResolver};

/// Paging scalar names before naming conventions apply.
pub const PAGE_SIZE: &str = "pageSize";
pub const PAGE_NUMBER: &str = "pageNumber";

/// Read-all filter on a single-column foreign key.
#[derive(Debug, Clone)]
pub struct Filter<'t> {
    pub column: &'t Column,
    /// Placeholder name without prefix.
    pub marker: String,
    /// Caller argument name.
    pub argument: String,
}

/// Collaborators shared by renderers, binders and the assembler.
pub struct Context<'s> {
    pub naming: &'s dyn Naming,
    pub types: &'s dyn TypeResolver,
    pub dialect: &'s dyn SqlDialect,
    pub insert_exclusions: &'s [String],
    pub update_exclusions: &'s [String],
}

impl Context<'_> {
    /// Placeholder for a value read from the entity, prefix included.
    pub fn column_marker(&self, column: &Column) -> String {
        self.dialect.marker(&self.naming.column_marker(&column.name))
    }

    /// Placeholder for a caller-supplied scalar, prefix included.
    pub fn scalar_marker(&self, name: &str) -> String {
        self.dialect.marker(&self.naming.scalar_marker(name))
    }

    /// Resolve a declared type, failing with the offending identifier.
    pub fn resolve(
        &self,
        relation: &Relation<'_>,
        column: &str,
        declared: &str,
    ) -> CrudResult<ResolvedType> {
        self.types
            .resolve(declared)
            .ok_or_else(|| CrudError::unresolved(relation.full_name(), column, declared))
    }

    /// Resolve a column read from or written to the entity; nullable
    /// columns carry `Option<T>`.
    pub fn resolve_column(&self, relation: &Relation<'_>, column: &Column) -> CrudResult<ResolvedType> {
        let ty = self.resolve(relation, &column.name, &column.declared_type)?;
        Ok(if column.nullable { ty.nullable() } else { ty })
    }

    /// Columns written by insert: all but the identity and exclusions.
    pub fn insert_columns<'t>(&self, table: &'t Table) -> Vec<&'t Column> {
        table
            .columns
            .iter()
            .filter(|c| table.identity.as_deref() != Some(c.name.as_str()))
            .filter(|c| !self.insert_exclusions.contains(&c.name))
            .collect()
    }

    /// Columns written by update: all but key, identity and exclusions.
    pub fn update_columns<'t>(&self, table: &'t Table) -> Vec<&'t Column> {
        let key = table.primary_key.as_deref().unwrap_or_default();
        table
            .columns
            .iter()
            .filter(|c| !key.contains(&c.name))
            .filter(|c| table.identity.as_deref() != Some(c.name.as_str()))
            .filter(|c| !self.update_exclusions.contains(&c.name))
            .collect()
    }

    /// Columns of single-column foreign keys, in declaration order.
    pub fn filter_columns<'t>(&self, table: &'t Table) -> CrudResult<Vec<&'t Column>> {
        let mut columns: Vec<&Column> = Vec::new();
        for fk in &table.foreign_keys {
            let Some(name) = fk.single_column() else {
                tracing::debug!(
                    "Skipping multi-column foreign key {:?} on {} in read-all filters",
                    fk.columns,
                    table.name
                );
                continue;
            };
            let column = table
                .find_column(name)
                .ok_or_else(|| CrudError::unknown_column(&table.name, name))?;
            if !columns.iter().any(|c| c.name == column.name) {
                columns.push(column);
            }
        }
        Ok(columns)
    }

    /// Filters for table read-all. Names that clash with a paging scalar or
    /// an earlier filter get a `Filter` suffix until they are unique.
    pub fn filters<'t>(&self, table: &'t Table, paging: bool) -> CrudResult<Vec<Filter<'t>>> {
        let mut taken: Vec<String> = Vec::new();
        if paging {
            for name in [PAGE_SIZE, PAGE_NUMBER] {
                taken.push(self.naming.scalar_marker(name));
                taken.push(self.naming.parameter_name(name));
            }
        }

        let mut filters = Vec::new();
        for column in self.filter_columns(table)? {
            let mut marker = self.naming.scalar_marker(&column.name);
            let mut argument = self.naming.parameter_name(&column.name);
            while taken.contains(&marker) || taken.contains(&argument) {
                marker.push_str("Filter");
                argument.push_str("Filter");
            }
            tracing::trace!("Filter on {}.{} bound as {}", table.name, column.name, marker);
            taken.push(marker.clone());
            taken.push(argument.clone());
            filters.push(Filter {
                column,
                marker,
                argument,
            });
        }
        Ok(filters)
    }

    /// Governing key columns for key and unique lookups, update and delete.
    pub fn key_columns<'t>(&self, op: &Operation<'t>) -> CrudResult<Vec<&'t Column>> {
        let table = op
            .relation
            .as_table()
            .ok_or_else(|| CrudError::Schema(format!("{} has no keys", op.relation.full_name())))?;
        match (op.kind, op.unique) {
            (OperationKind::ReadByUnique, Some(unique)) => table.constraint_columns(&unique.columns),
            _ => table.key_columns(),
        }
    }
}

type RenderFn = fn(&Operation<'_>, &Context<'_>) -> CrudResult<Statement>;
type BindFn = fn(&Operation<'_>, &Context<'_>) -> CrudResult<Vec<Binding>>;

/// Renderer and binder for one operation kind.
#[derive(Clone, Copy)]
pub struct Handler {
    pub render: RenderFn,
    pub bind: BindFn,
}

/// The dispatch table.
pub fn handler(kind: OperationKind) -> Handler {
    match kind {
        OperationKind::ReadAll => Handler {
            render: transpiler::read_all,
            bind: binder::read_all,
        },
        OperationKind::ReadByKey | OperationKind::ReadByUnique => Handler {
            render: transpiler::read_by_key,
            bind: binder::read_by_key,
        },
        OperationKind::Insert => Handler {
            render: transpiler::insert,
            bind: binder::insert,
        },
        OperationKind::Update => Handler {
            render: transpiler::update,
            bind: binder::update,
        },
        OperationKind::Delete => Handler {
            render: transpiler::delete,
            bind: binder::delete,
        },
    }
}

/// Methods synthesized for one relation.
#[derive(Debug, Clone, Serialize)]
pub struct RelationMethods {
    pub relation: String,
    pub kind: RelationKind,
    pub entity: String,
    pub methods: Vec<MethodDescriptor>,
}

/// Synthesizes method descriptors from a schema.
pub struct Synthesizer {
    settings: Settings,
    dialect: Box<dyn SqlDialect>,
    types: Box<dyn TypeResolver>,
    naming: Box<dyn Naming>,
}

impl Synthesizer {
    /// Synthesizer with the settings' dialect, SQL Server types and default naming.
    pub fn new(settings: Settings) -> Self {
        Self {
            dialect: settings.dialect.generator(),
            types: Box::new(SqlServerTypes),
            naming: Box::new(DefaultNaming),
            settings,
        }
    }

    /// Replace the dialect, e.g. with a custom identity retrieval.
    pub fn with_dialect(mut self, dialect: impl SqlDialect + 'static) -> Self {
        self.dialect = Box::new(dialect);
        self
    }

    /// Replace the type resolver.
    pub fn with_types(mut self, types: impl TypeResolver + 'static) -> Self {
        self.types = Box::new(types);
        self
    }

    /// Replace the naming conventions.
    pub fn with_naming(mut self, naming: impl Naming + 'static) -> Self {
        self.naming = Box::new(naming);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn context(&self) -> Context<'_> {
        Context {
            naming: self.naming.as_ref(),
            types: self.types.as_ref(),
            dialect: self.dialect.as_ref(),
            insert_exclusions: &self.settings.insert_exclusions,
            update_exclusions: &self.settings.update_exclusions,
        }
    }

    pub fn naming(&self) -> &dyn Naming {
        self.naming.as_ref()
    }

    /// Synthesize one planned operation.
    pub fn synthesize_operation(&self, op: &Operation<'_>) -> CrudResult<MethodDescriptor> {
        op.relation.validate()?;
        self.synthesize_validated(op)
    }

    fn synthesize_validated(&self, op: &Operation<'_>) -> CrudResult<MethodDescriptor> {
        let ctx = self.context();
        let Handler { render, bind } = handler(op.kind);

        let statement = render(op, &ctx)?;
        let bindings = bind(op, &ctx)?;
        let query = op.settings.render_strategy.writer().write(&statement);
        let method = assembler::assemble(op, &ctx, query, statement.sql(), bindings)?;

        self.verify(&method)?;
        tracing::debug!("Synthesized {} ({}): {}", method.name, op.kind, method.body.sql);
        Ok(method)
    }

    /// Placeholders, in first-occurrence order, must equal the binding names.
    fn verify(&self, method: &MethodDescriptor) -> CrudResult<()> {
        let placeholders =
            parser::placeholders(&method.body.query.normalized(), self.dialect.marker_prefix());
        let bindings: Vec<String> = method.body.bindings.iter().map(|b| b.name.clone()).collect();
        if placeholders == bindings {
            Ok(())
        } else {
            Err(CrudError::BindingMismatch {
                method: method.name.clone(),
                placeholders,
                bindings,
            })
        }
    }

    /// Synthesize every operation a relation supports, in emission order.
    pub fn synthesize_relation(&self, relation: Relation<'_>) -> CrudResult<RelationMethods> {
        relation.validate()?;
        let settings = self.settings.for_relation(&relation);
        let methods = planner::plan_relation(relation, settings)
            .iter()
            .map(|op| self.synthesize_validated(op))
            .collect::<CrudResult<Vec<_>>>()?;

        Ok(RelationMethods {
            relation: relation.full_name(),
            kind: relation.kind(),
            entity: self.naming.entity_name(&relation),
            methods,
        })
    }

    /// Synthesize all relations: tables, then views, then table functions.
    pub fn synthesize_schema(&self, schema: &Schema) -> CrudResult<Vec<RelationMethods>> {
        schema
            .relations()
            .map(|relation| self.synthesize_relation(relation))
            .collect()
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
