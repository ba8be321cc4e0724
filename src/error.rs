//! Error types for crudgen.

use thiserror::Error;

/// The main error type for synthesis.
#[derive(Debug, Error)]
pub enum CrudError {
    /// A column or parameter type has no mapping in the type resolver.
    #[error("Unresolvable type '{declared}' for '{column}' in {relation}")]
    UnresolvedType {
        relation: String,
        column: String,
        declared: String,
    },

    /// A constraint names a column the relation does not have.
    #[error("Unknown column '{column}' in {relation}")]
    UnknownColumn { relation: String, column: String },

    /// A key, unique or foreign key without columns.
    #[error("Constraint '{constraint}' in {relation} has no columns")]
    EmptyConstraint {
        relation: String,
        constraint: String,
    },

    /// Identifier that cannot be embedded in statement text.
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Rendered placeholders disagree with the produced bindings.
    #[error("Binding mismatch in {method}: statement uses {placeholders:?}, bindings are {bindings:?}")]
    BindingMismatch {
        method: String,
        placeholders: Vec<String>,
        bindings: Vec<String>,
    },

    /// Schema document could not be read.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrudError {
    /// Create an unresolved type error.
    pub fn unresolved(
        relation: impl Into<String>,
        column: impl Into<String>,
        declared: impl Into<String>,
    ) -> Self {
        Self::UnresolvedType {
            relation: relation.into(),
            column: column.into(),
            declared: declared.into(),
        }
    }

    /// Create an unknown column error.
    pub fn unknown_column(relation: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            relation: relation.into(),
            column: column.into(),
        }
    }
}

/// Result type alias for crudgen operations.
pub type CrudResult<T> = Result<T, CrudError>;
