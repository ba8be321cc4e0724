//! Method assembler.
//!
//! Combines a planned operation, its rendered statement and its bindings
//! into a [`MethodDescriptor`] ready for source emission.

use serde::Serialize;

use crate::binder::{Binding, DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE, Direction, ValueSource};
use crate::engine::{Context, PAGE_NUMBER, PAGE_SIZE};
use crate::error::CrudResult;
use crate::planner::{Operation, OperationKind};
use crate::schema::{Relation, Table};
use crate::statement::RenderedQuery;

/// Name of the entity argument on key, unique and write methods.
pub const ENTITY_ARGUMENT: &str = "entity";

/// Type of a caller-facing parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CallerType {
    Scalar { target: String, optional: bool },
    /// Row instance; `mutable` when the method writes attributes back.
    Entity { name: String, mutable: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultValue {
    Int(i64),
    Null,
}

/// Caller-facing parameter, distinct from the internal bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: CallerType,
    pub default: Option<DefaultValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ReturnShape {
    /// Sequence of rows.
    Rows { entity: String },
    /// At most one row.
    OptionalRow { entity: String },
    /// Affected-row count.
    AffectedRows,
}

/// How the statement is handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExecuteCall {
    /// Run and map every row to `entity`.
    QueryRows { entity: String },
    /// Run and map the first row, if any.
    QueryOptionalRow { entity: String },
    /// Run and report the affected-row count.
    Execute,
}

/// One step of the execution contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum Step {
    AcquireConnection,
    /// Assign a freshly generated GUID to the key attribute.
    GenerateKey { property: String },
    Execute { call: ExecuteCall },
    /// Copy the identity output binding onto the entity.
    WriteBackIdentity {
        property: String,
        binding: String,
        target: String,
    },
    /// Runs on every exit path, success or failure.
    ReleaseConnection,
}

/// Ordered steps; the connection is scoped to one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionContract {
    pub steps: Vec<Step>,
}

impl ExecutionContract {
    fn new(before: Vec<Step>, call: ExecuteCall, after: Vec<Step>) -> Self {
        let mut steps = Vec::with_capacity(before.len() + after.len() + 3);
        steps.extend(before);
        steps.push(Step::AcquireConnection);
        steps.push(Step::Execute { call });
        steps.extend(after);
        steps.push(Step::ReleaseConnection);
        Self { steps }
    }

    pub fn call(&self) -> Option<&ExecuteCall> {
        self.steps.iter().find_map(|s| match s {
            Step::Execute { call } => Some(call),
            _ => None,
        })
    }

    pub fn identity_write_back(&self) -> Option<&Step> {
        self.steps
            .iter()
            .find(|s| matches!(s, Step::WriteBackIdentity { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodBody {
    pub query: RenderedQuery,
    /// Canonical single-line statement text.
    pub sql: String,
    pub bindings: Vec<Binding>,
    pub contract: ExecutionContract,
}

/// A callable operation, consumed by source emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub kind: OperationKind,
    pub relation: String,
    pub doc: Option<String>,
    pub parameters: Vec<CallerParameter>,
    pub returns: ReturnShape,
    pub body: MethodBody,
}

/// Assemble the descriptor for one operation.
pub fn assemble(
    op: &Operation<'_>,
    ctx: &Context<'_>,
    query: RenderedQuery,
    sql: String,
    bindings: Vec<Binding>,
) -> CrudResult<MethodDescriptor> {
    let entity = ctx.naming.entity_name(&op.relation);
    let name = ctx.naming.method_name(&op.relation, op.kind, op.unique);

    let (parameters, returns, call) = match op.kind {
        OperationKind::ReadAll => (
            read_all_parameters(op, ctx)?,
            ReturnShape::Rows {
                entity: entity.clone(),
            },
            ExecuteCall::QueryRows {
                entity: entity.clone(),
            },
        ),
        OperationKind::ReadByKey | OperationKind::ReadByUnique => (
            vec![entity_parameter(&entity, false)],
            ReturnShape::OptionalRow {
                entity: entity.clone(),
            },
            ExecuteCall::QueryOptionalRow {
                entity: entity.clone(),
            },
        ),
        OperationKind::Insert | OperationKind::Update | OperationKind::Delete => (
            Vec::new(),
            ReturnShape::AffectedRows,
            ExecuteCall::Execute,
        ),
    };

    let mut before = Vec::new();
    let mut after = Vec::new();
    if op.kind == OperationKind::Insert {
        if let Some(table) = op.relation.as_table() {
            if let Some(property) = guid_key_property(table, &op.relation, ctx)? {
                before.push(Step::GenerateKey { property });
            }
        }
        after.extend(bindings.iter().filter(|b| b.direction == Direction::Output).filter_map(
            |b| match &b.source {
                ValueSource::Entity { property } => Some(Step::WriteBackIdentity {
                    property: property.clone(),
                    binding: b.name.clone(),
                    target: b.ty.target.clone(),
                }),
                ValueSource::Argument { .. } => None,
            },
        ));
    }

    let parameters = if op.kind.is_write() {
        let mutable = !before.is_empty() || !after.is_empty();
        vec![entity_parameter(&entity, mutable)]
    } else {
        parameters
    };

    let doc = match op.kind {
        OperationKind::ReadAll => op.relation.description().map(str::to_string),
        _ => None,
    };

    Ok(MethodDescriptor {
        name,
        kind: op.kind,
        relation: op.relation.full_name(),
        doc,
        parameters,
        returns,
        body: MethodBody {
            query,
            sql,
            bindings,
            contract: ExecutionContract::new(before, call, after),
        },
    })
}

fn entity_parameter(entity: &str, mutable: bool) -> CallerParameter {
    CallerParameter {
        name: ENTITY_ARGUMENT.to_string(),
        ty: CallerType::Entity {
            name: entity.to_string(),
            mutable,
        },
        default: None,
    }
}

/// Paging scalars first, then one nullable filter per single-column foreign
/// key; declared parameters for table functions.
fn read_all_parameters(op: &Operation<'_>, ctx: &Context<'_>) -> CrudResult<Vec<CallerParameter>> {
    let relation = &op.relation;
    let mut parameters = Vec::new();

    match op.relation {
        Relation::Table(table) => {
            if op.settings.paging {
                for (name, default) in [
                    (PAGE_SIZE, DEFAULT_PAGE_SIZE),
                    (PAGE_NUMBER, DEFAULT_PAGE_NUMBER),
                ] {
                    parameters.push(CallerParameter {
                        name: ctx.naming.parameter_name(name),
                        ty: CallerType::Scalar {
                            target: "i32".to_string(),
                            optional: false,
                        },
                        default: Some(DefaultValue::Int(default)),
                    });
                }
            }
            for filter in ctx.filters(table, op.settings.paging)? {
                let column = filter.column;
                let ty = ctx.resolve(relation, &column.name, &column.declared_type)?;
                parameters.push(CallerParameter {
                    name: filter.argument,
                    ty: CallerType::Scalar {
                        target: ty.target,
                        optional: true,
                    },
                    default: Some(DefaultValue::Null),
                });
            }
        }
        Relation::View(_) => {}
        Relation::Function(function) => {
            for param in &function.parameters {
                let ty = ctx.resolve(relation, &param.name, &param.declared_type)?;
                parameters.push(CallerParameter {
                    name: ctx.naming.parameter_name(&param.name),
                    ty: CallerType::Scalar {
                        target: ty.target,
                        optional: false,
                    },
                    default: None,
                });
            }
        }
    }

    Ok(parameters)
}

/// Property of a single-column GUID primary key, if the table has one.
fn guid_key_property(
    table: &Table,
    relation: &Relation<'_>,
    ctx: &Context<'_>,
) -> CrudResult<Option<String>> {
    let key = table.key_columns()?;
    let [column] = key.as_slice() else {
        return Ok(None);
    };
    if table.identity.as_deref() == Some(column.name.as_str()) {
        return Ok(None);
    }
    let ty = ctx.resolve(relation, &column.name, &column.declared_type)?;
    Ok(ty.is_guid().then(|| ctx.naming.property_name(&column.name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Synthesizer;
    use crate::schema::{Table, TableFunction, View};
    use crate::settings::Settings;

    fn synthesize(relation: Relation<'_>, paging: bool) -> Vec<MethodDescriptor> {
        let settings = Settings::builder().paging(paging).build();
        Synthesizer::new(settings)
            .synthesize_relation(relation)
            .unwrap()
            .methods
    }

    fn order() -> Table {
        Table::new("Order")
            .column("Id", "int")
            .column("CustomerId", "int")
            .column("Total", "decimal(12, 2)")
            .primary_key(&["Id"])
            .foreign_key(&["CustomerId"], "Customer")
            .identity("Id")
            .describe("Customer orders")
    }

    #[test]
    fn test_read_all_caller_parameters() {
        let table = order();
        let methods = synthesize(Relation::Table(&table), true);
        let read_all = &methods[0];
        let params: Vec<(&str, &Option<DefaultValue>)> = read_all
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), &p.default))
            .collect();
        assert_eq!(
            params,
            vec![
                ("pageSize", &Some(DefaultValue::Int(10))),
                ("pageNumber", &Some(DefaultValue::Int(1))),
                ("customerId", &Some(DefaultValue::Null)),
            ]
        );
        assert_eq!(
            read_all.parameters[2].ty,
            CallerType::Scalar {
                target: "i32".into(),
                optional: true
            }
        );
        assert_eq!(
            read_all.returns,
            ReturnShape::Rows {
                entity: "Order".into()
            }
        );
        assert_eq!(read_all.doc.as_deref(), Some("Customer orders"));
    }

    #[test]
    fn test_lookup_returns_optional_row() {
        let table = order();
        let methods = synthesize(Relation::Table(&table), false);
        let get = &methods[1];
        assert_eq!(get.name, "get_order");
        assert_eq!(get.parameters[0].name, ENTITY_ARGUMENT);
        assert_eq!(
            get.returns,
            ReturnShape::OptionalRow {
                entity: "Order".into()
            }
        );
    }

    #[test]
    fn test_contract_scoped_connection() {
        let table = order();
        for method in synthesize(Relation::Table(&table), false) {
            let steps = &method.body.contract.steps;
            let acquire = steps
                .iter()
                .position(|s| *s == Step::AcquireConnection)
                .unwrap();
            let execute = steps
                .iter()
                .position(|s| matches!(s, Step::Execute { .. }))
                .unwrap();
            assert!(acquire < execute);
            assert_eq!(steps.last(), Some(&Step::ReleaseConnection));
        }
    }

    #[test]
    fn test_insert_writes_back_identity() {
        let table = order();
        let methods = synthesize(Relation::Table(&table), false);
        let insert = &methods[2];
        assert_eq!(insert.returns, ReturnShape::AffectedRows);
        assert_eq!(
            insert.parameters[0].ty,
            CallerType::Entity {
                name: "Order".into(),
                mutable: true
            }
        );
        assert_eq!(
            insert.body.contract.identity_write_back(),
            Some(&Step::WriteBackIdentity {
                property: "id".into(),
                binding: "Id".into(),
                target: "i32".into(),
            })
        );
    }

    #[test]
    fn test_update_entity_is_immutable() {
        let table = order();
        let methods = synthesize(Relation::Table(&table), false);
        let update = &methods[3];
        assert_eq!(update.kind, OperationKind::Update);
        assert_eq!(
            update.parameters[0].ty,
            CallerType::Entity {
                name: "Order".into(),
                mutable: false
            }
        );
        assert_eq!(update.body.contract.call(), Some(&ExecuteCall::Execute));
        assert!(update.body.contract.identity_write_back().is_none());
    }

    #[test]
    fn test_guid_key_generated_before_insert() {
        let table = Table::new("Document")
            .column("Id", "uniqueidentifier")
            .column("Title", "nvarchar(200)")
            .primary_key(&["Id"]);
        let methods = synthesize(Relation::Table(&table), false);
        let insert = &methods[2];
        assert_eq!(
            insert.body.contract.steps.first(),
            Some(&Step::GenerateKey {
                property: "id".into()
            })
        );
        assert_eq!(insert.body.sql, "insert into Document (Id, Title) values (@Id, @Title)");
    }

    #[test]
    fn test_view_and_function_parameters() {
        let view = View::new("Totals").column("Total", "money");
        assert!(synthesize(Relation::View(&view), true)[0].parameters.is_empty());

        let function = TableFunction::new("OrdersSince")
            .column("Id", "int")
            .parameter("@Since", "datetime");
        let methods = synthesize(Relation::Function(&function), false);
        assert_eq!(methods[0].parameters[0].name, "since");
        assert_eq!(
            methods[0].parameters[0].ty,
            CallerType::Scalar {
                target: "NaiveDateTime".into(),
                optional: false
            }
        );
        assert_eq!(methods[0].name, "get_all_orders_since");
    }
}
