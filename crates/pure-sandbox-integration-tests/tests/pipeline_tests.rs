//! End-to-end pipeline scenarios: edit in, stamped messages out.

mod common;

use std::collections::HashMap;

use common::{drain, logs_for, sandbox, sandbox_with_modules, wait_for_terminal};
use pure_sandbox_core::{MessageView, RunStatus};
use pure_sandbox_types::{
    hash_canonical, CompileStatus, CompiledQuery, ExecutionMessage, OutboundRequest, RecordedBody,
    RecordedResponse, RecordedRows,
};
use serde_json::json;

#[tokio::test(flavor = "multi_thread")]
async fn test_log_output_end_to_end() {
    let (handle, mut rx) = sandbox();
    handle.submit_edit("const n: number = 1 + 1;\nconsole.log(n);").unwrap();

    let outcome = wait_for_terminal(&handle, 0).await;
    assert_eq!(outcome.status, RunStatus::Success);

    let messages = drain(&mut rx);
    let compile_states: Vec<_> = messages
        .iter()
        .filter_map(|m| match &m.message {
            ExecutionMessage::Compile { status, .. } => Some(*status),
            _ => None,
        })
        .collect();
    assert_eq!(
        compile_states,
        vec![CompileStatus::Compiling, CompileStatus::Success]
    );
    assert_eq!(
        logs_for(&messages, outcome.execution_id.as_u64()),
        vec![json!(2)]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_recorded_fetch_replays() {
    let (handle, mut rx) = sandbox();

    // The hash covers the normalized request: lowercased header names,
    // uppercased method, canonical key order.
    let request = OutboundRequest {
        url: "https://api.example.com/users".to_string(),
        method: "GET".to_string(),
        headers: Default::default(),
        body: serde_json::Value::Null,
    };
    let hash = hash_canonical(&serde_json::to_value(&request).unwrap());
    handle.record_fetch_mock(
        hash,
        RecordedResponse {
            status: 200,
            status_text: "OK".to_string(),
            headers: Default::default(),
            body: RecordedBody::Json {
                body: json!({ "ok": true }),
            },
        },
    );

    handle
        .submit_edit(
            r#"fetch("https://api.example.com/users")
  .then(async (r) => {
    console.log(r.status);
    const body = await r.json();
    console.log(body.ok);
  });"#,
        )
        .unwrap();

    let outcome = wait_for_terminal(&handle, 0).await;
    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(
        logs_for(&drain(&mut rx), outcome.execution_id.as_u64()),
        vec![json!(200), json!(true)]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unrecorded_fetch_gets_sentinel() {
    let (handle, mut rx) = sandbox();
    handle
        .submit_edit(
            r#"fetch("https://api.example.com/missing")
  .then(async (r) => {
    const body = await r.json();
    console.log(r.status, r.ok, body.easter);
  });"#,
        )
        .unwrap();

    let outcome = wait_for_terminal(&handle, 0).await;
    assert_eq!(outcome.status, RunStatus::Success);

    // The marker body keeps "no recording" distinguishable from a genuine
    // recorded empty object.
    let messages = drain(&mut rx);
    assert_eq!(
        logs_for(&messages, outcome.execution_id.as_u64()),
        vec![json!(599), json!(false), json!("egg")]
    );
    // The hash is still reported so the request can be recorded afterwards.
    assert!(messages
        .iter()
        .any(|m| matches!(m.message, ExecutionMessage::Fetch { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_undeclared_dependency_reports_validation_error() {
    let (handle, mut rx) = sandbox();
    handle
        .submit_edit("import _ from \"lodash\";\nconsole.log(_.chunk([1, 2], 1));")
        .unwrap();

    let outcome = wait_for_terminal(&handle, 0).await;
    assert_eq!(outcome.status, RunStatus::EvaluationFailed);

    let messages = drain(&mut rx);
    let error_text = messages
        .iter()
        .find_map(|m| match &m.message {
            ExecutionMessage::Error { messages, .. } => messages[0].as_str().map(str::to_string),
            _ => None,
        })
        .expect("expected an error message");
    assert!(error_text.contains("is not installed"), "got: {error_text}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_recorded_query_replays() {
    let (handle, mut rx) = sandbox();

    let query = CompiledQuery {
        sql: "select id from users".to_string(),
        parameters: vec![],
    };
    let hash = hash_canonical(&serde_json::to_value(&query).unwrap());
    handle.record_sql_mock(
        hash,
        RecordedRows {
            rows: vec![json!({ "id": 7 })],
        },
    );

    handle
        .submit_edit(
            "db.execute(\"select id from users\").then((rows) => console.log(rows[0].id));",
        )
        .unwrap();

    let outcome = wait_for_terminal(&handle, 0).await;
    assert_eq!(outcome.status, RunStatus::Success);

    let messages = drain(&mut rx);
    assert_eq!(
        logs_for(&messages, outcome.execution_id.as_u64()),
        vec![json!(7)]
    );
    assert!(messages
        .iter()
        .any(|m| matches!(m.message, ExecutionMessage::Sql { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unrecorded_query_falls_through_to_driver() {
    let (handle, mut rx) = sandbox();
    handle
        .submit_edit("db.execute(\"select 1\").then((rows) => console.log(rows.length));")
        .unwrap();

    let outcome = wait_for_terminal(&handle, 0).await;
    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(
        logs_for(&drain(&mut rx), outcome.execution_id.as_u64()),
        vec![json!(0)]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_nested_static_imports_retry_until_ready() {
    let mut modules = HashMap::new();
    modules.insert(
        "https://esm.sh/a@latest".to_string(),
        "import b from \"/b@1.0.0/index.mjs\";\nexport default b + 1;".to_string(),
    );
    modules.insert(
        "https://esm.sh/b@1.0.0/index.mjs".to_string(),
        "export default 41;".to_string(),
    );
    let (handle, mut rx) = sandbox_with_modules(modules);

    handle.set_dependencies(["a".to_string()].into_iter().collect());
    handle
        .submit_edit("import a from \"a\";\nconsole.log(a);")
        .unwrap();

    // The first run stops on `a`, the retry stops on the nested `b`, and
    // the run after that completes.
    let outcome = wait_for_terminal(&handle, 0).await;
    assert_eq!(outcome.status, RunStatus::Success);
    assert!(outcome.execution_id.as_u64() >= 2);

    let messages = drain(&mut rx);
    assert_eq!(
        logs_for(&messages, outcome.execution_id.as_u64()),
        vec![json!(42)]
    );
    // Pending runs end quietly; no error message is ever emitted.
    assert!(!messages
        .iter()
        .any(|m| matches!(m.message, ExecutionMessage::Error { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_message_view_shows_only_latest_run() {
    let (handle, mut rx) = sandbox();

    handle.submit_edit("console.log(\"first\");").unwrap();
    let first = wait_for_terminal(&handle, 0).await;

    handle.submit_edit("console.log(\"second\");").unwrap();
    let second = wait_for_terminal(&handle, first.execution_id.as_u64()).await;

    let mut view = MessageView::new();
    for message in drain(&mut rx) {
        view.apply(message);
    }

    assert_eq!(view.active_execution_id(), second.execution_id);
    let logged: Vec<_> = view
        .logs()
        .iter()
        .filter_map(|m| match &m.message {
            ExecutionMessage::Log { messages } => messages[0].as_str(),
            _ => None,
        })
        .collect();
    assert_eq!(logged, vec!["second"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sibling_function_modules_share_an_exports_object() {
    let (handle, mut rx) = sandbox();
    handle.set_function(
        "greet",
        "export const greet = (name: string): string => `hello ${name}`;",
    );

    handle
        .submit_edit(
            "const m = require(\"@pure/functions/greet\");\nconsole.log(m.greet(\"world\"));",
        )
        .unwrap();

    let outcome = wait_for_terminal(&handle, 0).await;
    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(
        logs_for(&drain(&mut rx), outcome.execution_id.as_u64()),
        vec![json!("hello world")]
    );
}
