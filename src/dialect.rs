//! Dialect-specific pieces of statement text.
//!
//! Synthesis is dialect-agnostic except for the placeholder prefix and the
//! clause that reads back a generated identity after insert. Both live behind
//! [`SqlDialect`]; other back-ends plug in their own implementation.

use serde::{Deserialize, Serialize};

/// Dialect hooks used by the renderer.
pub trait SqlDialect {
    /// Character that introduces a named placeholder.
    fn marker_prefix(&self) -> char;

    /// Clause appended to an insert that stores the generated identity of
    /// `column` into the output placeholder `marker` (prefix included).
    fn identity_retrieval(&self, column: &str, marker: &str) -> String;

    /// Placeholder text for a marker name.
    fn marker(&self, name: &str) -> String {
        format!("{}{}", self.marker_prefix(), name)
    }
}

/// SQL Server, reading `@@identity`.
pub struct SqlServerDialect;

impl SqlDialect for SqlServerDialect {
    fn marker_prefix(&self) -> char {
        '@'
    }

    fn identity_retrieval(&self, _column: &str, marker: &str) -> String {
        format!("select {} = @@identity", marker)
    }
}

/// SQL Server, reading `scope_identity()`.
pub struct SqlServerScopedDialect;

impl SqlDialect for SqlServerScopedDialect {
    fn marker_prefix(&self) -> char {
        '@'
    }

    fn identity_retrieval(&self, _column: &str, marker: &str) -> String {
        format!("select {} = scope_identity()", marker)
    }
}

/// Oracle, `:name` markers and `returning .. into ..`.
pub struct OracleDialect;

impl SqlDialect for OracleDialect {
    fn marker_prefix(&self) -> char {
        ':'
    }

    fn identity_retrieval(&self, column: &str, marker: &str) -> String {
        format!("returning {} into {}", column, marker)
    }
}

/// Built-in dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Dialect {
    #[default]
    #[serde(rename = "sqlserver", alias = "mssql")]
    SqlServer,
    #[serde(rename = "sqlserver-scoped")]
    SqlServerScoped,
    #[serde(rename = "oracle")]
    Oracle,
}

impl Dialect {
    pub fn generator(&self) -> Box<dyn SqlDialect> {
        match self {
            Dialect::SqlServer => Box::new(SqlServerDialect),
            Dialect::SqlServerScoped => Box::new(SqlServerScopedDialect),
            Dialect::Oracle => Box::new(OracleDialect),
        }
    }
}
