//! Schema model for synthesis.
//!
//! Relations, columns and constraints are immutable once loaded. Column order
//! is significant: it fixes projection order and insert/update column order.
//!
//! # Example
//! ```
//! use crudgen::schema::Schema;
//!
//! let json = r#"{
//!     "tables": [{
//!         "name": "Order",
//!         "columns": [
//!             { "name": "Id", "type": "int" },
//!             { "name": "Total", "type": "decimal(12, 2)" }
//!         ],
//!         "primary-key": ["Id"],
//!         "identity": "Id"
//!     }]
//! }"#;
//!
//! let schema = Schema::from_json(json).unwrap();
//! assert_eq!(schema.tables[0].columns[1].ordinal, 1);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CrudError, CrudResult};

/// Database schema: tables, views and table-valued functions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Schema {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub views: Vec<View>,
    #[serde(default)]
    pub functions: Vec<TableFunction>,
}

/// Column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type", alias = "typ")]
    pub declared_type: String,
    #[serde(default)]
    pub nullable: bool,
    /// Position within the relation, assigned from declaration order.
    #[serde(skip)]
    pub ordinal: usize,
}

/// Ordered set of columns used by a primary key or unique constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unique {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// Foreign key referencing another relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub references: String,
}

impl ForeignKey {
    /// Only single-column keys take part in read-all filtering.
    pub fn single_column(&self) -> Option<&str> {
        match self.columns.as_slice() {
            [column] => Some(column.as_str()),
            _ => None,
        }
    }
}

/// Table-valued function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", alias = "typ")]
    pub declared_type: String,
}

/// Table with keys and constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Table {
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub primary_key: Option<Vec<String>>,
    #[serde(default)]
    pub uniques: Vec<Unique>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    /// Column whose value the storage engine generates on insert.
    #[serde(default)]
    pub identity: Option<String>,
}

/// View: columns only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub columns: Vec<Column>,
}

/// Table-valued function with positional parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFunction {
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// The three relation shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    Table,
    View,
    TableFunction,
}

/// Borrowed view over any relation.
#[derive(Debug, Clone, Copy)]
pub enum Relation<'a> {
    Table(&'a Table),
    View(&'a View),
    Function(&'a TableFunction),
}

impl<'a> Relation<'a> {
    pub fn kind(&self) -> RelationKind {
        match *self {
            Relation::Table(_) => RelationKind::Table,
            Relation::View(_) => RelationKind::View,
            Relation::Function(_) => RelationKind::TableFunction,
        }
    }

    pub fn name(&self) -> &'a str {
        match *self {
            Relation::Table(t) => &t.name,
            Relation::View(v) => &v.name,
            Relation::Function(f) => &f.name,
        }
    }

    pub fn schema(&self) -> Option<&'a str> {
        match *self {
            Relation::Table(t) => t.schema.as_deref(),
            Relation::View(v) => v.schema.as_deref(),
            Relation::Function(f) => f.schema.as_deref(),
        }
    }

    /// `schema.name`, or just `name` without a schema.
    pub fn full_name(&self) -> String {
        qualify(self.schema(), self.name())
    }

    pub fn description(&self) -> Option<&'a str> {
        match *self {
            Relation::Table(t) => t.description.as_deref(),
            Relation::View(v) => v.description.as_deref(),
            Relation::Function(f) => f.description.as_deref(),
        }
    }

    pub fn columns(&self) -> &'a [Column] {
        match *self {
            Relation::Table(t) => &t.columns,
            Relation::View(v) => &v.columns,
            Relation::Function(f) => &f.columns,
        }
    }

    pub fn as_table(&self) -> Option<&'a Table> {
        match *self {
            Relation::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Identifiers are plain, columns exist, constraints are non-empty and
    /// reference existing columns.
    pub fn validate(&self) -> CrudResult<()> {
        let full = self.full_name();
        if let Some(schema) = self.schema() {
            check_identifier(schema)?;
        }
        check_identifier(self.name())?;
        if self.columns().is_empty() {
            return Err(CrudError::Schema(format!("{} has no columns", full)));
        }
        for column in self.columns() {
            check_identifier(&column.name)?;
        }
        match *self {
            Relation::Table(table) => table.validate_constraints(&full),
            Relation::Function(f) => f.parameters.iter().try_for_each(|p| check_identifier(&p.name)),
            Relation::View(_) => Ok(()),
        }
    }
}

fn qualify(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(s) => format!("{}.{}", s, name),
        None => name.to_string(),
    }
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load schema from JSON string.
    pub fn from_json(json: &str) -> CrudResult<Self> {
        let schema: Schema =
            serde_json::from_str(json).map_err(|e| CrudError::Schema(e.to_string()))?;
        schema.finish()
    }

    /// Load schema from TOML string.
    pub fn from_toml(input: &str) -> CrudResult<Self> {
        let schema: Schema = toml::from_str(input).map_err(|e| CrudError::Schema(e.to_string()))?;
        schema.finish()
    }

    /// Load schema from file path (`.json` is JSON, anything else TOML).
    pub fn from_file(path: &Path) -> CrudResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let schema = if path.extension().map(|e| e == "json").unwrap_or(false) {
            Self::from_json(&content)?
        } else {
            Self::from_toml(&content)?
        };
        tracing::info!(
            "Loaded schema from {} ({} tables, {} views, {} functions)",
            path.display(),
            schema.tables.len(),
            schema.views.len(),
            schema.functions.len()
        );
        Ok(schema)
    }

    /// Assign ordinals and validate.
    pub fn finish(mut self) -> CrudResult<Self> {
        for table in &mut self.tables {
            assign_ordinals(&mut table.columns);
        }
        for view in &mut self.views {
            assign_ordinals(&mut view.columns);
        }
        for function in &mut self.functions {
            assign_ordinals(&mut function.columns);
            for param in &mut function.parameters {
                if let Some(stripped) = param.name.strip_prefix('@') {
                    param.name = stripped.to_string();
                }
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Relations in synthesis order: tables, then views, then functions.
    pub fn relations(&self) -> impl Iterator<Item = Relation<'_>> {
        self.tables
            .iter()
            .map(Relation::Table)
            .chain(self.views.iter().map(Relation::View))
            .chain(self.functions.iter().map(Relation::Function))
    }

    /// Find a relation by plain or qualified name.
    pub fn relation(&self, name: &str) -> Option<Relation<'_>> {
        self.relations()
            .find(|r| r.name() == name || r.full_name() == name)
    }

    /// Check identifiers and constraint references.
    pub fn validate(&self) -> CrudResult<()> {
        self.relations().try_for_each(|relation| relation.validate())
    }
}

fn assign_ordinals(columns: &mut [Column]) {
    for (i, column) in columns.iter_mut().enumerate() {
        column.ordinal = i;
    }
}

/// Identifiers are embedded verbatim in statement text.
fn check_identifier(ident: &str) -> CrudResult<()> {
    let mut chars = ident.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(CrudError::InvalidIdentifier(ident.to_string()))
    }
}

impl Table {
    /// Create a new table definition.
    pub fn new(name: &str) -> Self {
        Self {
            schema: None,
            name: name.to_string(),
            description: None,
            columns: Vec::new(),
            primary_key: None,
            uniques: Vec::new(),
            foreign_keys: Vec::new(),
            identity: None,
        }
    }

    /// Builder: set the owning schema.
    pub fn in_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.to_string());
        self
    }

    /// Builder: add a column.
    pub fn column(mut self, name: &str, typ: &str) -> Self {
        self.columns.push(Column::new(name, typ, self.columns.len()));
        self
    }

    /// Builder: add a nullable column.
    pub fn nullable_column(mut self, name: &str, typ: &str) -> Self {
        let mut column = Column::new(name, typ, self.columns.len());
        column.nullable = true;
        self.columns.push(column);
        self
    }

    /// Builder: set the primary key.
    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Builder: add a unique constraint.
    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.uniques.push(Unique {
            name: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    /// Builder: add a foreign key.
    pub fn foreign_key(mut self, columns: &[&str], references: &str) -> Self {
        self.foreign_keys.push(ForeignKey {
            name: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            references: references.to_string(),
        });
        self
    }

    /// Builder: set the identity column.
    pub fn identity(mut self, column: &str) -> Self {
        self.identity = Some(column.to_string());
        self
    }

    /// Builder: set the description.
    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Resolve constraint column names, preserving constraint order.
    pub fn constraint_columns(&self, names: &[String]) -> CrudResult<Vec<&Column>> {
        names
            .iter()
            .map(|name| {
                self.find_column(name).ok_or_else(|| {
                    CrudError::unknown_column(qualify(self.schema.as_deref(), &self.name), name)
                })
            })
            .collect()
    }

    /// Primary key columns in key order; empty without a key.
    pub fn key_columns(&self) -> CrudResult<Vec<&Column>> {
        match &self.primary_key {
            Some(key) => self.constraint_columns(key),
            None => Ok(Vec::new()),
        }
    }

    pub fn identity_column(&self) -> Option<&Column> {
        self.identity.as_deref().and_then(|name| self.find_column(name))
    }

    fn validate_constraints(&self, relation: &str) -> CrudResult<()> {
        let empty = |constraint: &str| CrudError::EmptyConstraint {
            relation: relation.to_string(),
            constraint: constraint.to_string(),
        };

        if let Some(key) = &self.primary_key {
            if key.is_empty() {
                return Err(empty("primary key"));
            }
            self.constraint_columns(key)?;
        }
        for unique in &self.uniques {
            if unique.columns.is_empty() {
                return Err(empty(unique.name.as_deref().unwrap_or("unique")));
            }
            self.constraint_columns(&unique.columns)?;
        }
        for fk in &self.foreign_keys {
            if fk.columns.is_empty() {
                return Err(empty(fk.name.as_deref().unwrap_or("foreign key")));
            }
            self.constraint_columns(&fk.columns)?;
        }
        if let Some(identity) = &self.identity {
            if self.find_column(identity).is_none() {
                return Err(CrudError::unknown_column(relation, identity));
            }
        }
        Ok(())
    }
}

impl View {
    pub fn new(name: &str) -> Self {
        Self {
            schema: None,
            name: name.to_string(),
            description: None,
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, name: &str, typ: &str) -> Self {
        self.columns.push(Column::new(name, typ, self.columns.len()));
        self
    }
}

impl TableFunction {
    pub fn new(name: &str) -> Self {
        Self {
            schema: None,
            name: name.to_string(),
            description: None,
            columns: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn column(mut self, name: &str, typ: &str) -> Self {
        self.columns.push(Column::new(name, typ, self.columns.len()));
        self
    }

    pub fn parameter(mut self, name: &str, typ: &str) -> Self {
        self.parameters.push(Parameter {
            name: name.trim_start_matches('@').to_string(),
            declared_type: typ.to_string(),
        });
        self
    }
}

impl Column {
    pub fn new(name: &str, typ: &str, ordinal: usize) -> Self {
        Self {
            name: name.to_string(),
            declared_type: typ.to_string(),
            nullable: false,
            ordinal,
        }
    }
}
