//! Naming conventions: schema identifiers to generated names.

use convert_case::{Case, Casing};

use crate::planner::OperationKind;
use crate::schema::{Relation, Unique};

/// Derives generated names from schema identifiers.
///
/// Marker methods return placeholder names without the dialect prefix.
pub trait Naming {
    /// Row type for a relation.
    fn entity_name(&self, relation: &Relation<'_>) -> String;

    /// Entity attribute holding a column's value.
    fn property_name(&self, column: &str) -> String;

    /// Caller-facing scalar argument name.
    fn parameter_name(&self, name: &str) -> String;

    /// Generated method name.
    fn method_name(
        &self,
        relation: &Relation<'_>,
        kind: OperationKind,
        unique: Option<&Unique>,
    ) -> String;

    /// Placeholder for a value read from the entity.
    fn column_marker(&self, column: &str) -> String {
        column.to_string()
    }

    /// Placeholder for a caller-supplied scalar.
    fn scalar_marker(&self, name: &str) -> String {
        self.parameter_name(name)
    }
}

/// Rust conventions: `PascalCase` rows, `snake_case` fields and methods,
/// `camelCase` scalar markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNaming;

impl Naming for DefaultNaming {
    fn entity_name(&self, relation: &Relation<'_>) -> String {
        relation.name().to_case(Case::Pascal)
    }

    fn property_name(&self, column: &str) -> String {
        column.to_case(Case::Snake)
    }

    fn parameter_name(&self, name: &str) -> String {
        name.to_case(Case::Camel)
    }

    fn method_name(
        &self,
        relation: &Relation<'_>,
        kind: OperationKind,
        unique: Option<&Unique>,
    ) -> String {
        let base = relation.name().to_case(Case::Snake);
        match kind {
            OperationKind::ReadAll => format!("get_all_{}", base),
            OperationKind::ReadByKey => format!("get_{}", base),
            OperationKind::ReadByUnique => {
                let columns: Vec<String> = unique
                    .map(|u| u.columns.iter().map(|c| c.to_case(Case::Snake)).collect())
                    .unwrap_or_default();
                format!("get_{}_by_{}", base, columns.join("_and_"))
            }
            OperationKind::Insert => format!("add_{}", base),
            OperationKind::Update => format!("update_{}", base),
            OperationKind::Delete => format!("remove_{}", base),
        }
    }
}
