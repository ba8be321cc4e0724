//! # crudgen
//!
//! Synthesizes the CRUD data-access methods of a relational schema.
//!
//! For every table, view and table-valued function, crudgen decides which
//! operations apply, renders the parameterized statement text, binds each
//! placeholder to a caller argument or entity attribute, and assembles a
//! [`MethodDescriptor`](assembler::MethodDescriptor) that a code emitter
//! turns into source.
//!
//! ## Quick Example
//!
//! ```rust
//! use crudgen::prelude::*;
//!
//! let order = Table::new("Order")
//!     .column("Id", "int")
//!     .column("CustomerId", "int")
//!     .column("Total", "decimal(12, 2)")
//!     .primary_key(&["Id"])
//!     .foreign_key(&["CustomerId"], "Customer")
//!     .identity("Id");
//!
//! let settings = Settings::builder().paging(true).build();
//! let methods = Synthesizer::new(settings)
//!     .synthesize_relation(Relation::Table(&order))
//!     .unwrap();
//!
//! assert_eq!(methods.methods[0].name, "get_all_order");
//! assert_eq!(
//!     methods.methods[0].body.sql,
//!     "select Id, CustomerId, Total from Order \
//!      where (@customerId is null or CustomerId = @customerId) \
//!      order by Id offset @pageSize * (@pageNumber - 1) rows fetch next @pageSize rows only"
//! );
//! ```
//!
//! ## Operations
//!
//! | Kind           | Tables                 | Views, functions |
//! |----------------|------------------------|------------------|
//! | read-all       | always                 | always           |
//! | read-by-key    | with a primary key     | never            |
//! | read-by-unique | one per unique         | never            |
//! | insert         | always                 | never            |
//! | update, delete | with a primary key     | never            |

pub mod assembler;
pub mod binder;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod naming;
pub mod parser;
pub mod planner;
pub mod schema;
pub mod settings;
pub mod statement;
pub mod transpiler;
pub mod types;

pub mod prelude {
    pub use crate::assembler::{
        CallerParameter, CallerType, DefaultValue, ExecuteCall, ExecutionContract,
        MethodDescriptor, ReturnShape, Step,
    };
    pub use crate::binder::{Binding, Direction, ValueSource};
    pub use crate::dialect::{Dialect, SqlDialect};
    pub use crate::engine::{RelationMethods, Synthesizer};
    pub use crate::error::*;
    pub use crate::naming::{DefaultNaming, Naming};
    pub use crate::planner::{Operation, OperationKind};
    pub use crate::schema::{Column, ForeignKey, Relation, Schema, Table, TableFunction, View};
    pub use crate::settings::{RenderStrategy, Settings};
    pub use crate::statement::RenderedQuery;
    pub use crate::types::{DbType, ResolvedType, SqlServerTypes, TypeResolver};
}

/// Synthesize every relation of a schema with the default collaborators.
///
/// # Example
///
/// ```
/// use crudgen::{settings::Settings, schema::Schema};
///
/// let schema = Schema::from_json(r#"{
///     "views": [{ "name": "Totals", "columns": [{ "name": "Total", "type": "money" }] }]
/// }"#).unwrap();
/// let out = crudgen::synthesize(&schema, Settings::default()).unwrap();
/// assert_eq!(out[0].methods[0].body.sql, "select Total from Totals");
/// ```
pub fn synthesize(
    schema: &schema::Schema,
    settings: settings::Settings,
) -> Result<Vec<engine::RelationMethods>, error::CrudError> {
    engine::Synthesizer::new(settings).synthesize_schema(schema)
}
