//! Invocation Property Tests
//!
//! End-to-end invocation against a scripted database:
//! - Singular methods return exactly one shaped row
//! - Set methods return every row in order
//! - No-result methods execute and never query
//! - Required arguments are enforced before any database call
//! - Optional arguments are dropped from the SQL when absent or null
//! - Null struct columns are omitted from the object

use std::sync::Arc;

use dbrpc::db::{MemoryDatabase, StatementKind};
use dbrpc::functions::{
    FunctionError, InputArg, Invocation, Invoker, InvokerConfig, Method, MethodRegistry,
    OutputArg,
};
use dbrpc::observability::MetricsRegistry;
use dbrpc::value::{Args, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn get_user() -> Method {
    Method::new("get_user", "rpc", "get_user")
        .returning("record")
        .with_input(InputArg::new("a_id", "integer", true, "a_"))
        .with_output(OutputArg::new("id", "integer"))
        .with_output(OutputArg::new("name", "text"))
}

fn list_users() -> Method {
    Method::new("list_users", "rpc", "list_users")
        .returning("integer")
        .set()
        .with_input(InputArg::new("a_limit", "integer", false, "a_"))
        .with_input(InputArg::new("a_offset", "integer", false, "a_"))
}

fn delete_user() -> Method {
    Method::new("delete_user", "rpc", "delete_user")
        .with_input(InputArg::new("a_id", "integer", true, "a_"))
}

fn profile() -> Method {
    Method::new("profile", "rpc", "profile")
        .returning("record")
        .with_output(OutputArg::new("id", "integer"))
        .with_output(OutputArg::new("nickname", "text"))
        .with_output(OutputArg::new("email", "text"))
}

fn setup(db: &Arc<MemoryDatabase>) -> Invoker {
    Invoker::new(
        db.clone(),
        Arc::new(MethodRegistry::with_methods(vec![
            get_user(),
            list_users(),
            delete_user(),
            profile(),
        ])),
        InvokerConfig::default(),
        Arc::new(MetricsRegistry::new()),
    )
}

fn args(pairs: &[(&str, Value)]) -> Args {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn object(pairs: &[(&str, Value)]) -> Value {
    Value::Object(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

// =============================================================================
// Shaping Scenarios
// =============================================================================

/// A struct method returning one row yields an object keyed by output name.
#[tokio::test]
async fn test_get_user_returns_object() {
    let db = Arc::new(MemoryDatabase::new());
    db.on_query_with(
        "\"rpc\".\"get_user\"",
        7,
        vec![vec![Value::Int(7), Value::from("Ann")]],
    );
    let invoker = setup(&db);

    let result = invoker
        .invoke("get_user", &args(&[("id", Value::Int(7))]))
        .await
        .unwrap();

    assert_eq!(
        result,
        Invocation::Value(object(&[("id", Value::Int(7)), ("name", Value::from("Ann"))]))
    );

    let statement = db.last_statement().unwrap();
    assert_eq!(statement.kind, StatementKind::Query);
    assert_eq!(
        statement.sql,
        r#"SELECT "id", "name" FROM "rpc"."get_user"("a_id" := $1)"#
    );
    assert_eq!(statement.params, vec![Value::Int(7)]);
}

/// A scalar set method yields the column values in row order.
#[tokio::test]
async fn test_list_users_returns_ordered_sequence() {
    let db = Arc::new(MemoryDatabase::new());
    db.on_query(
        "\"rpc\".\"list_users\"",
        vec![vec![Value::Int(1)], vec![Value::Int(2)], vec![Value::Int(3)]],
    );
    let invoker = setup(&db);

    let result = invoker.invoke("list_users", &Args::new()).await.unwrap();
    assert_eq!(
        result,
        Invocation::Value(Value::Array(vec![
            Value::Int(1),
            Value::Int(2),
            Value::Int(3)
        ]))
    );
}

/// A set method may return no rows.
#[tokio::test]
async fn test_set_method_allows_empty_result() {
    let db = Arc::new(MemoryDatabase::new());
    db.on_query("\"rpc\".\"list_users\"", vec![]);
    let invoker = setup(&db);

    let result = invoker.invoke("list_users", &Args::new()).await.unwrap();
    assert_eq!(result, Invocation::Value(Value::Array(vec![])));
}

/// A null middle column is left out of the object.
#[tokio::test]
async fn test_null_output_column_is_omitted() {
    let db = Arc::new(MemoryDatabase::new());
    db.on_query(
        "\"rpc\".\"profile\"",
        vec![vec![Value::Int(1), Value::Null, Value::from("a@b.c")]],
    );
    let invoker = setup(&db);

    let result = invoker.invoke("profile", &Args::new()).await.unwrap();
    match result.value() {
        Some(Value::Object(map)) => {
            assert_eq!(map.len(), 2);
            assert!(map.contains_key("id"));
            assert!(map.contains_key("email"));
            assert!(!map.contains_key("nickname"));
        }
        other => panic!("expected object, got {:?}", other),
    }
}

// =============================================================================
// Cardinality Tests
// =============================================================================

/// Singular methods reject zero rows.
#[tokio::test]
async fn test_singular_method_with_no_rows() {
    let db = Arc::new(MemoryDatabase::new());
    db.on_query("\"rpc\".\"get_user\"", vec![]);
    let invoker = setup(&db);

    let err = invoker
        .invoke("get_user", &args(&[("id", Value::Int(7))]))
        .await
        .unwrap_err();
    assert!(matches!(err, FunctionError::Cardinality(0)));
}

/// Singular methods reject more than one row.
#[tokio::test]
async fn test_singular_method_with_two_rows() {
    let db = Arc::new(MemoryDatabase::new());
    let row = vec![Value::Int(7), Value::from("Ann")];
    db.on_query("\"rpc\".\"get_user\"", vec![row.clone(), row]);
    let invoker = setup(&db);

    let err = invoker
        .invoke("get_user", &args(&[("id", Value::Int(7))]))
        .await
        .unwrap_err();
    assert!(matches!(err, FunctionError::Cardinality(2)));
    assert_eq!(err.to_string(), "Single row must be returned, got 2");
}

// =============================================================================
// No-Result Tests
// =============================================================================

/// No-result methods go through execute and report the affected rows.
#[tokio::test]
async fn test_delete_user_executes_without_query() {
    let db = Arc::new(MemoryDatabase::new());
    db.on_execute("\"rpc\".\"delete_user\"", 1);
    let invoker = setup(&db);

    let result = invoker
        .invoke("delete_user", &args(&[("id", Value::Int(9))]))
        .await
        .unwrap();

    assert_eq!(result.rows_affected(), Some(1));
    assert!(result.value().is_none());

    let statements = db.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements.iter().all(|s| s.kind == StatementKind::Execute));
    assert_eq!(
        statements[0].sql,
        r#"SELECT "rpc"."delete_user"("a_id" := $1)"#
    );
}

// =============================================================================
// Argument Binding Tests
// =============================================================================

/// A missing required argument fails before any database call.
#[tokio::test]
async fn test_missing_required_argument() {
    let db = Arc::new(MemoryDatabase::new());
    let invoker = setup(&db);

    let err = invoker.invoke("get_user", &Args::new()).await.unwrap_err();
    assert!(matches!(err, FunctionError::MissingRequiredArgument(ref k) if k == "id"));
    assert!(db.statements().is_empty());
}

/// An explicit null for a required argument is the same as leaving it out.
#[tokio::test]
async fn test_null_required_argument() {
    let db = Arc::new(MemoryDatabase::new());
    let invoker = setup(&db);

    let err = invoker
        .invoke("delete_user", &args(&[("id", Value::Null)]))
        .await
        .unwrap_err();
    assert!(matches!(err, FunctionError::MissingRequiredArgument(_)));
    assert!(db.statements().is_empty());
}

/// Parameter count equals the number of provided non-null arguments.
#[tokio::test]
async fn test_optional_arguments_control_parameter_count() {
    let db = Arc::new(MemoryDatabase::new());
    db.on_query("\"rpc\".\"list_users\"", vec![]);
    let invoker = setup(&db);

    let cases = vec![
        (Args::new(), 0),
        (args(&[("limit", Value::Int(10))]), 1),
        (args(&[("limit", Value::Int(10)), ("offset", Value::Null)]), 1),
        (args(&[("limit", Value::Int(10)), ("offset", Value::Int(20))]), 2),
    ];

    for (call_args, expected) in cases {
        invoker.invoke("list_users", &call_args).await.unwrap();
        let statement = db.last_statement().unwrap();
        assert_eq!(statement.params.len(), expected, "sql: {}", statement.sql);
        assert_eq!(statement.sql.matches('$').count(), expected);
    }

    let statement = db.last_statement().unwrap();
    assert_eq!(
        statement.sql,
        r#"SELECT "rpc"."list_users"("a_limit" := $1, "a_offset" := $2)"#
    );
}

/// The configured named-argument token is used in the SQL.
#[tokio::test]
async fn test_arrow_argument_syntax() {
    let db = Arc::new(MemoryDatabase::new());
    db.on_query("\"rpc\".\"get_user\"", vec![vec![Value::Int(1), Value::from("x")]]);
    let invoker = Invoker::new(
        db.clone(),
        Arc::new(MethodRegistry::with_methods(vec![get_user()])),
        InvokerConfig {
            arg_syntax: "=>".to_string(),
        },
        Arc::new(MetricsRegistry::new()),
    );

    invoker
        .invoke("get_user", &args(&[("id", Value::Int(1))]))
        .await
        .unwrap();
    assert!(db.last_statement().unwrap().sql.contains("\"a_id\" => $1"));
}

/// Unknown methods are reported by name.
#[tokio::test]
async fn test_unknown_method() {
    let db = Arc::new(MemoryDatabase::new());
    let invoker = setup(&db);

    let err = invoker.invoke("drop_everything", &Args::new()).await.unwrap_err();
    assert_eq!(err.to_string(), "Method not found: drop_everything");
}
