//! Type resolution: declared schema types to target data types.
//!
//! The resolver answers two questions for every column or parameter that
//! ends up in a binding: which target type carries the value, and which
//! driver type tag an output binding must be declared with.

use serde::Serialize;

use crate::parser::parse_declared_type;

/// Driver-level type tag, used to declare output bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DbType {
    Boolean,
    Byte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    Currency,
    AnsiString,
    String,
    Date,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Time,
    Guid,
    Binary,
    Xml,
}

/// A resolved declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedType {
    /// Target data type, e.g. `i32`.
    pub target: String,
    /// Driver type tag.
    pub db_type: DbType,
}

impl ResolvedType {
    pub fn new(target: impl Into<String>, db_type: DbType) -> Self {
        Self {
            target: target.into(),
            db_type,
        }
    }

    /// Same type carried as `Option<T>`.
    pub fn nullable(self) -> Self {
        Self {
            target: format!("Option<{}>", self.target),
            db_type: self.db_type,
        }
    }

    pub fn is_guid(&self) -> bool {
        self.db_type == DbType::Guid
    }
}

/// Maps declared schema types to target types.
pub trait TypeResolver {
    /// Resolve a declared type, or `None` when it is unknown.
    fn resolve(&self, declared: &str) -> Option<ResolvedType>;
}

/// SQL Server type names mapped to Rust types.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerTypes;

impl TypeResolver for SqlServerTypes {
    fn resolve(&self, declared: &str) -> Option<ResolvedType> {
        let ty = parse_declared_type(declared)?;
        let (target, db_type) = match ty.base.as_str() {
            "bit" => ("bool", DbType::Boolean),
            "tinyint" => ("u8", DbType::Byte),
            "smallint" => ("i16", DbType::Int16),
            "int" | "integer" => ("i32", DbType::Int32),
            "bigint" => ("i64", DbType::Int64),
            "real" => ("f32", DbType::Single),
            "float" | "double precision" => ("f64", DbType::Double),
            "decimal" | "numeric" => ("Decimal", DbType::Decimal),
            "money" | "smallmoney" => ("Decimal", DbType::Currency),
            "char" | "varchar" | "text" => ("String", DbType::AnsiString),
            "nchar" | "nvarchar" | "ntext" | "sysname" => ("String", DbType::String),
            "date" => ("NaiveDate", DbType::Date),
            "datetime" | "smalldatetime" => ("NaiveDateTime", DbType::DateTime),
            "datetime2" => ("NaiveDateTime", DbType::DateTime2),
            "datetimeoffset" => ("DateTime<FixedOffset>", DbType::DateTimeOffset),
            "time" => ("NaiveTime", DbType::Time),
            "uniqueidentifier" => ("Uuid", DbType::Guid),
            "binary" | "varbinary" | "image" | "rowversion" | "timestamp" => {
                ("Vec<u8>", DbType::Binary)
            }
            "xml" => ("String", DbType::Xml),
            _ => return None,
        };
        Some(ResolvedType::new(target, db_type))
    }
}
