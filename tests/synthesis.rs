use crudgen::parser::placeholders;
use crudgen::prelude::*;
use crudgen::schema::RelationKind;
use pretty_assertions::assert_eq;

const ORDER_SCHEMA: &str = r#"{
    "tables": [
        {
            "name": "Order",
            "description": "Customer orders",
            "columns": [
                { "name": "Id", "type": "int" },
                { "name": "CustomerId", "type": "int" },
                { "name": "Total", "type": "decimal(12, 2)" }
            ],
            "primary-key": ["Id"],
            "foreign-keys": [{ "columns": ["CustomerId"], "references": "Customer" }],
            "identity": "Id"
        },
        {
            "schema": "sales",
            "name": "OrderLine",
            "columns": [
                { "name": "OrderId", "type": "int" },
                { "name": "LineNo", "type": "smallint" },
                { "name": "ProductId", "type": "int" },
                { "name": "WarehouseId", "type": "int" },
                { "name": "Sku", "type": "varchar(20)" }
            ],
            "primary-key": ["OrderId", "LineNo"],
            "uniques": [{ "name": "UQ_OrderLine_Sku", "columns": ["OrderId", "Sku"] }],
            "foreign-keys": [
                { "columns": ["OrderId"], "references": "Order" },
                { "columns": ["ProductId", "WarehouseId"], "references": "Stock" },
                { "columns": ["ProductId"], "references": "Product" }
            ]
        },
        {
            "name": "AuditEntry",
            "columns": [
                { "name": "At", "type": "datetime2" },
                { "name": "Message", "type": "nvarchar(max)" }
            ]
        }
    ],
    "views": [
        { "name": "OrderTotals", "columns": [{ "name": "CustomerId", "type": "int" }, { "name": "Total", "type": "money" }] }
    ],
    "functions": [
        {
            "name": "OrdersSince",
            "columns": [{ "name": "Id", "type": "int" }],
            "parameters": [{ "name": "@Since", "type": "datetime" }]
        }
    ]
}"#;

fn schema() -> Schema {
    Schema::from_json(ORDER_SCHEMA).unwrap()
}

fn paged() -> Settings {
    Settings::builder().paging(true).build()
}

fn method<'a>(methods: &'a RelationMethods, kind: OperationKind) -> &'a MethodDescriptor {
    methods.methods.iter().find(|m| m.kind == kind).unwrap()
}

#[test]
fn test_order_read_all() {
    let schema = schema();
    let out = Synthesizer::new(paged())
        .synthesize_relation(schema.relation("Order").unwrap())
        .unwrap();
    let read_all = method(&out, OperationKind::ReadAll);

    assert_eq!(
        read_all.body.sql,
        "select Id, CustomerId, Total from Order where (@customerId is null or CustomerId = @customerId) \
         order by Id offset @pageSize * (@pageNumber - 1) rows fetch next @pageSize rows only"
    );

    let defaults: Vec<(&str, Option<DefaultValue>)> = read_all
        .parameters
        .iter()
        .map(|p| (p.name.as_str(), p.default.clone()))
        .collect();
    assert_eq!(
        defaults,
        vec![
            ("pageSize", Some(DefaultValue::Int(10))),
            ("pageNumber", Some(DefaultValue::Int(1))),
            ("customerId", Some(DefaultValue::Null)),
        ]
    );
    assert_eq!(read_all.doc.as_deref(), Some("Customer orders"));
}

#[test]
fn test_order_insert_identity() {
    let schema = schema();
    let out = Synthesizer::new(paged())
        .synthesize_relation(schema.relation("Order").unwrap())
        .unwrap();
    let insert = method(&out, OperationKind::Insert);

    assert!(insert
        .body
        .sql
        .starts_with("insert into Order (CustomerId, Total) values (@CustomerId, @Total)"));
    assert_eq!(
        insert.body.sql,
        "insert into Order (CustomerId, Total) values (@CustomerId, @Total) select @Id = @@identity"
    );

    let inputs = insert
        .body
        .bindings
        .iter()
        .filter(|b| b.direction == Direction::Input)
        .count();
    let outputs: Vec<&Binding> = insert
        .body
        .bindings
        .iter()
        .filter(|b| b.direction == Direction::Output)
        .collect();
    assert_eq!(insert.body.bindings.len(), 3);
    assert_eq!(inputs, 2);
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].ty.db_type, DbType::Int32);

    let steps = &insert.body.contract.steps;
    let execute = steps
        .iter()
        .position(|s| matches!(s, Step::Execute { .. }))
        .unwrap();
    let write_back = steps
        .iter()
        .position(|s| matches!(s, Step::WriteBackIdentity { .. }))
        .unwrap();
    assert!(execute < write_back);
    assert_eq!(steps.last(), Some(&Step::ReleaseConnection));
}

#[test]
fn test_operation_sets() {
    let schema = schema();
    let out = crudgen::synthesize(&schema, Settings::default()).unwrap();
    let kinds: Vec<(&str, Vec<OperationKind>)> = out
        .iter()
        .map(|r| (r.relation.as_str(), r.methods.iter().map(|m| m.kind).collect()))
        .collect();

    use crudgen::planner::OperationKind::*;
    assert_eq!(
        kinds,
        vec![
            ("Order", vec![ReadAll, ReadByKey, Insert, Update, Delete]),
            (
                "sales.OrderLine",
                vec![ReadAll, ReadByKey, Insert, Update, Delete, ReadByUnique]
            ),
            ("AuditEntry", vec![ReadAll, Insert]),
            ("OrderTotals", vec![ReadAll]),
            ("OrdersSince", vec![ReadAll]),
        ]
    );
}

#[test]
fn test_filters_follow_single_column_foreign_keys() {
    let schema = schema();
    let out = Synthesizer::new(paged())
        .synthesize_relation(schema.relation("sales.OrderLine").unwrap())
        .unwrap();
    let read_all = method(&out, OperationKind::ReadAll);

    assert_eq!(read_all.body.sql.matches(" is null or ").count(), 2);
    assert!(!read_all.body.sql.contains("@warehouseId"));
    assert_eq!(read_all.body.sql.matches("order by").count(), 1);

    let unique = method(&out, OperationKind::ReadByUnique);
    assert_eq!(unique.name, "get_order_line_by_order_id_and_sku");
    assert!(unique.body.sql.ends_with("where OrderId = @OrderId and Sku = @Sku"));
}

#[test]
fn test_paging_only_on_tables() {
    let schema = schema();
    let out = crudgen::synthesize(&schema, paged()).unwrap();
    for relation in &out {
        let read_all = method(relation, OperationKind::ReadAll);
        let paged = read_all.body.sql.contains("offset @pageSize");
        assert_eq!(paged, relation.kind == RelationKind::Table, "{}", relation.relation);
    }
}

#[test]
fn test_strategies_render_same_statement() {
    let schema = schema();
    let appended = Settings::builder()
        .paging(true)
        .render_strategy(RenderStrategy::IncrementalAppend)
        .build();
    let a = crudgen::synthesize(&schema, appended).unwrap();
    let b = crudgen::synthesize(&schema, paged()).unwrap();

    for (ra, rb) in a.iter().zip(&b) {
        for (ma, mb) in ra.methods.iter().zip(&rb.methods) {
            assert_eq!(ma.body.query.strategy, RenderStrategy::IncrementalAppend);
            assert_eq!(mb.body.query.strategy, RenderStrategy::LiteralBlock);
            assert_eq!(ma.body.query.normalized(), mb.body.query.normalized());
            assert_eq!(ma.body.sql, mb.body.sql);
            assert_eq!(ma.body.bindings, mb.body.bindings);
        }
    }
}

#[test]
fn test_placeholders_match_bindings() {
    let schema = schema();
    for settings in [Settings::default(), paged()] {
        for relation in crudgen::synthesize(&schema, settings).unwrap() {
            for m in &relation.methods {
                let names: Vec<String> = m.body.bindings.iter().map(|b| b.name.clone()).collect();
                assert_eq!(placeholders(&m.body.sql, '@'), names, "{}", m.name);
            }
        }
    }
}

#[test]
fn test_table_without_key() {
    let schema = schema();
    let out = Synthesizer::default()
        .synthesize_relation(schema.relation("AuditEntry").unwrap())
        .unwrap();
    let insert = method(&out, OperationKind::Insert);
    assert_eq!(
        insert.body.sql,
        "insert into AuditEntry (At, Message) values (@At, @Message)"
    );
    assert!(insert.body.contract.identity_write_back().is_none());
}

#[test]
fn test_function_read_all() {
    let schema = schema();
    let out = Synthesizer::default()
        .synthesize_relation(schema.relation("OrdersSince").unwrap())
        .unwrap();
    let read_all = &out.methods[0];
    assert_eq!(read_all.body.sql, "select Id from OrdersSince(@Since)");
    assert_eq!(read_all.parameters[0].name, "since");
    assert_eq!(read_all.body.bindings[0].name, "Since");
}

#[test]
fn test_settings_file_overrides() {
    let settings = Settings::from_toml(
        r#"
        dialect = "sqlserver-scoped"
        insert-exclusions = ["Total"]

        [defaults]
        paging = true

        [relations.Order]
        render-strategy = "incremental-append"
        paging = false
        "#,
    )
    .unwrap();
    let schema = schema();
    let out = Synthesizer::new(settings)
        .synthesize_relation(schema.relation("Order").unwrap())
        .unwrap();

    let read_all = method(&out, OperationKind::ReadAll);
    assert!(!read_all.body.sql.contains("order by"));
    assert_eq!(read_all.body.query.strategy, RenderStrategy::IncrementalAppend);

    let insert = method(&out, OperationKind::Insert);
    assert_eq!(
        insert.body.sql,
        "insert into Order (CustomerId) values (@CustomerId) select @Id = scope_identity()"
    );
}

#[test]
fn test_descriptor_serializes() {
    let schema = schema();
    let out = crudgen::synthesize(&schema, paged()).unwrap();
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json[0]["relation"], "Order");
    assert_eq!(json[0]["methods"][0]["kind"], "read-all");
    assert_eq!(json[0]["methods"][0]["parameters"][0]["default"]["int"], 10);
}

#[test]
fn test_schema_literal_validated_before_rendering() {
    let schema = Schema {
        tables: vec![Table::new("Order").column("Id", "int").column("Total--", "money")],
        ..Schema::default()
    };
    let err = crudgen::synthesize(&schema, Settings::default()).unwrap_err();
    assert!(matches!(err, CrudError::InvalidIdentifier(ref name) if name == "Total--"));

    let empty = Schema {
        views: vec![View::new("Nothing")],
        ..Schema::default()
    };
    assert!(matches!(
        crudgen::synthesize(&empty, Settings::default()),
        Err(CrudError::Schema(_))
    ));
}
