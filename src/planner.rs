//! Operation decision engine.
//!
//! Decides which operations a relation's shape permits. Decisions are pure
//! functions of the schema model and the relation's settings.
//!
//! | Relation       | Operations                                                   |
//! |----------------|--------------------------------------------------------------|
//! | Table          | ReadAll, ReadByKey*, Insert, Update*, Delete*, ReadByUnique+ |
//! | View           | ReadAll                                                      |
//! | Table function | ReadAll                                                      |
//!
//! `*` only with a primary key, `+` once per unique constraint.

use std::fmt;

use serde::Serialize;

use crate::error::{CrudError, CrudResult};
use crate::schema::{Relation, Schema, Table, Unique};
use crate::settings::{GenerationSettings, Settings};

/// The six operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    ReadAll,
    ReadByKey,
    ReadByUnique,
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    /// Writes return an affected-row count.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            OperationKind::Insert | OperationKind::Update | OperationKind::Delete
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::ReadAll => write!(f, "read-all"),
            OperationKind::ReadByKey => write!(f, "read-by-key"),
            OperationKind::ReadByUnique => write!(f, "read-by-unique"),
            OperationKind::Insert => write!(f, "insert"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Delete => write!(f, "delete"),
        }
    }
}

/// One planned operation. Lives for a single synthesis pass.
#[derive(Debug, Clone, Copy)]
pub struct Operation<'a> {
    pub kind: OperationKind,
    pub relation: Relation<'a>,
    /// Governing constraint for `ReadByUnique`.
    pub unique: Option<&'a Unique>,
    pub settings: GenerationSettings,
}

impl<'a> Operation<'a> {
    fn new(kind: OperationKind, relation: Relation<'a>, settings: GenerationSettings) -> Self {
        Self {
            kind,
            relation,
            unique: None,
            settings,
        }
    }

    /// The table behind a table-only operation.
    pub fn table(&self) -> CrudResult<&'a Table> {
        self.relation.as_table().ok_or_else(|| {
            CrudError::Schema(format!(
                "{} is not a table and only supports read-all",
                self.relation.full_name()
            ))
        })
    }
}

/// Plan the operations of one relation, in emission order.
pub fn plan_relation(relation: Relation<'_>, settings: GenerationSettings) -> Vec<Operation<'_>> {
    let table = match relation {
        Relation::Table(table) => table,
        Relation::View(_) | Relation::Function(_) => {
            return vec![Operation::new(OperationKind::ReadAll, relation, settings)];
        }
    };

    let has_key = table.primary_key.is_some();
    let mut ops = Vec::with_capacity(5 + table.uniques.len());

    ops.push(Operation::new(OperationKind::ReadAll, relation, settings));
    if has_key {
        ops.push(Operation::new(OperationKind::ReadByKey, relation, settings));
    }
    ops.push(Operation::new(OperationKind::Insert, relation, settings));
    if has_key {
        ops.push(Operation::new(OperationKind::Update, relation, settings));
        ops.push(Operation::new(OperationKind::Delete, relation, settings));
    }
    for unique in &table.uniques {
        ops.push(Operation {
            unique: Some(unique),
            ..Operation::new(OperationKind::ReadByUnique, relation, settings)
        });
    }

    tracing::debug!(
        "Planned {} operations for table {}",
        ops.len(),
        relation.full_name()
    );
    ops
}

/// Plan every relation: tables, then views, then table functions.
pub fn plan_schema<'a>(schema: &'a Schema, settings: &Settings) -> Vec<Operation<'a>> {
    schema
        .relations()
        .flat_map(|relation| plan_relation(relation, settings.for_relation(&relation)))
        .collect()
}
