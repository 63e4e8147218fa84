//! End-to-end dispatch tests
//!
//! Drives a small arithmetic service through `JsonRpcService::handle` exactly as
//! a transport would: decoded JSON in, serialized reply out.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use turul_json_rpc_service::prelude::*;

/// Per-call context a transport would supply
struct Session {
    user: String,
}

#[derive(Deserialize)]
struct DivideParams {
    x: i64,
    y: i64,
}

struct Divide;

#[async_trait]
impl JsonRpcMethod<Session> for Divide {
    fn validate(&self, params: RequestParams) -> ValidationOutcome {
        let integer = [Rule::required(), Rule::type_of(Kind::Integer)];
        Validation::new(params)
            .field("x", &integer)
            .field("y", &integer)
            .finalize()
    }

    async fn call(&self, params: Params, _session: &Session) -> MethodResult {
        let DivideParams { x, y } = params.parse()?;
        if y == 0 {
            return Err((12345, "divided by zero").into());
        }
        to_method_result(x / y)
    }
}

struct Tag;

#[async_trait]
impl JsonRpcMethod<Session> for Tag {
    fn validate(&self, params: RequestParams) -> ValidationOutcome {
        Validation::new(params)
            .field(
                "tags",
                &[Rule::required(), Rule::length(Bounds::default().max(3))],
            )
            .field("note", &[Rule::type_of(Kind::String), Rule::not_empty()])
            .field(
                "owner",
                &[
                    Rule::exclusion(["admin", "root"]),
                    Rule::length(Bounds::default().min(6)),
                ],
            )
            .finalize()
    }

    async fn call(&self, params: Params, session: &Session) -> MethodResult {
        Ok(json!({"user": session.user, "tags": params.get("tags")}))
    }
}

struct Crash;

#[async_trait]
impl JsonRpcMethod<Session> for Crash {
    async fn call(&self, params: Params, _session: &Session) -> MethodResult {
        let reason = params.get("reason").and_then(Value::as_str).unwrap_or("unknown");
        panic!("crashed: {}", reason);
    }
}

fn service() -> JsonRpcService<Session> {
    JsonRpcService::builder()
        .method("divide", Divide)
        .method("tag", Tag)
        .method("crash", Crash)
        .build()
        .unwrap()
}

fn session() -> Session {
    Session {
        user: "alice".to_string(),
    }
}

async fn roundtrip(service: &JsonRpcService<Session>, body: Value) -> Option<Value> {
    service
        .handle(body, &session())
        .await
        .map(|reply| serde_json::to_value(reply).unwrap())
}

#[tokio::test]
async fn test_divide_by_zero_reaches_handler() {
    let reply = roundtrip(
        &service(),
        json!({"jsonrpc": "2.0", "id": 2, "method": "divide", "params": {"x": 10, "y": 0}}),
    )
    .await;

    assert_eq!(
        reply,
        Some(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "error": {"code": 12345, "message": "divided by zero"}
        }))
    );
}

#[tokio::test]
async fn test_wrong_type_never_reaches_handler() {
    let reply = roundtrip(
        &service(),
        json!({"jsonrpc": "2.0", "id": 2, "method": "divide", "params": {"x": 10, "y": "0"}}),
    )
    .await
    .unwrap();

    assert_eq!(reply["error"]["code"], json!(INVALID_PARAMS));
    assert_eq!(reply["error"]["message"], json!("Invalid params"));
    assert_eq!(reply["error"]["data"], json!({"y": ["is not an integer"]}));
}

#[tokio::test]
async fn test_every_rule_failure_is_reported() {
    let reply = roundtrip(
        &service(),
        json!({
            "jsonrpc": "2.0",
            "id": "t1",
            "method": "tag",
            "params": {"tags": ["a", "b", "c", "d"], "note": "", "owner": "admin"}
        }),
    )
    .await
    .unwrap();

    assert_eq!(
        reply["error"]["data"],
        json!({
            "note": ["can't be empty"],
            "owner": [
                "must not be one of [\"admin\",\"root\"]",
                "should be at least 6 character(s)"
            ],
            "tags": ["should be at most 3 item(s)"]
        })
    );
}

#[tokio::test]
async fn test_length_rule_applies_to_strings_and_objects() {
    let service = service();

    let too_long = roundtrip(
        &service,
        json!({"jsonrpc": "2.0", "id": 1, "method": "tag", "params": {"tags": "abcd"}}),
    )
    .await
    .unwrap();
    assert_eq!(
        too_long["error"]["data"],
        json!({"tags": ["should be at most 3 character(s)"]})
    );

    let not_measurable = roundtrip(
        &service,
        json!({"jsonrpc": "2.0", "id": 2, "method": "tag", "params": {"tags": 7}}),
    )
    .await
    .unwrap();
    assert_eq!(
        not_measurable["error"]["data"],
        json!({"tags": ["is not a string, array or object"]})
    );

    let ok = roundtrip(
        &service,
        json!({"jsonrpc": "2.0", "id": 3, "method": "tag", "params": {"tags": {"a": 1}}}),
    )
    .await
    .unwrap();
    assert_eq!(ok["result"], json!({"user": "alice", "tags": {"a": 1}}));
}

#[tokio::test]
async fn test_optional_field_may_be_absent() {
    let reply = roundtrip(
        &service(),
        json!({"jsonrpc": "2.0", "id": 1, "method": "tag", "params": {"tags": ["x"]}}),
    )
    .await
    .unwrap();

    assert_eq!(reply["result"]["tags"], json!(["x"]));
}

#[tokio::test]
async fn test_notifications_are_silent() {
    let service = service();

    for body in [
        json!({"jsonrpc": "2.0", "method": "divide", "params": {"x": 1, "y": 0}}),
        json!({"jsonrpc": "2.0", "method": "divide", "params": {"x": "1"}}),
        json!({"jsonrpc": "2.0", "method": "crash"}),
        json!({"jsonrpc": "2.0", "method": "nothing_here"}),
        json!({"jsonrpc": "2.0", "id": null, "method": "divide", "params": {"x": 4, "y": 2}}),
    ] {
        assert_eq!(roundtrip(&service, body).await, None);
    }
}

#[tokio::test]
async fn test_unknown_method_names_the_method() {
    let reply = roundtrip(
        &service(),
        json!({"jsonrpc": "2.0", "id": 9, "method": "multiply", "params": [1, 2]}),
    )
    .await
    .unwrap();

    assert_eq!(reply["id"], json!(9));
    assert_eq!(reply["error"]["code"], json!(METHOD_NOT_FOUND));
    assert!(reply["error"]["message"].as_str().unwrap().contains("multiply"));
    assert_eq!(reply["error"]["data"]["method"], json!("multiply"));
}

#[tokio::test]
async fn test_crash_in_batch_is_isolated() {
    let reply = roundtrip(
        &service(),
        json!([
            {"jsonrpc": "2.0", "id": 1, "method": "divide", "params": {"x": 10, "y": 5}},
            {"jsonrpc": "2.0", "id": 2, "method": "crash", "params": {"reason": "disk"}},
            {"jsonrpc": "2.0", "method": "crash"},
            {"jsonrpc": "2.0", "id": 3, "method": "divide", "params": {"x": 10, "y": 0}}
        ]),
    )
    .await
    .unwrap();

    assert_eq!(
        reply,
        json!([
            {"jsonrpc": "2.0", "id": 1, "result": 2},
            {"jsonrpc": "2.0", "id": 2, "error": {"code": -32000, "message": "crashed: disk"}},
            {"jsonrpc": "2.0", "id": 3, "error": {"code": 12345, "message": "divided by zero"}}
        ])
    );
}

#[tokio::test]
async fn test_malformed_entries() {
    let service = service();

    let empty = roundtrip(&service, json!([])).await.unwrap();
    assert_eq!(empty["error"]["code"], json!(INVALID_REQUEST));
    assert_eq!(empty["id"], Value::Null);

    let batch = roundtrip(
        &service,
        json!([
            {"jsonrpc": "2.0", "id": 1, "method": 5},
            {"jsonrpc": "2.0", "id": [1], "method": "divide"},
            "divide"
        ]),
    )
    .await
    .unwrap();

    let entries = batch.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e["error"]["code"] == json!(INVALID_REQUEST)));
    assert_eq!(entries[0]["id"], json!(1));
    assert_eq!(entries[1]["id"], Value::Null);
}

#[tokio::test]
async fn test_id_above_i64_max_is_echoed() {
    let reply = roundtrip(
        &service(),
        json!({"jsonrpc": "2.0", "id": u64::MAX, "method": "divide", "params": {"x": 9, "y": 3}}),
    )
    .await
    .unwrap();

    assert_eq!(reply, json!({"jsonrpc": "2.0", "id": u64::MAX, "result": 3}));
}

#[tokio::test]
async fn test_replies_are_byte_identical() {
    let service = service();
    let body = json!([
        {"jsonrpc": "2.0", "id": 1, "method": "tag", "params": {"tags": ["b", "a"], "note": "n"}},
        {"jsonrpc": "2.0", "id": 2, "method": "divide", "params": {"y": "z"}}
    ]);

    let first = serde_json::to_string(&service.handle(body.clone(), &session()).await).unwrap();
    let second = serde_json::to_string(&service.handle(body, &session()).await).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_shared_across_tasks() {
    let service = Arc::new(
        JsonRpcService::<Session>::builder()
            .method("divide", Divide)
            .batch_mode(BatchMode::Concurrent)
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (1..=8i64)
        .map(|n| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let body = json!({"jsonrpc": "2.0", "id": n, "method": "divide", "params": {"x": n * 10, "y": n}});
                service.handle(body, &session()).await
            })
        })
        .collect();

    for (n, handle) in (1..=8i64).zip(handles) {
        let reply = handle.await.unwrap().unwrap();
        let message = &reply.messages()[0];
        assert_eq!(message.id(), Some(&RequestId::from(n)));
        assert_eq!(message.result(), Some(&json!(10)));
    }
}

#[test]
fn test_config_from_json() {
    let config: ServiceConfig =
        serde_json::from_value(json!({"duplicate_policy": "replace", "max_batch_size": 2})).unwrap();

    let service = JsonRpcService::<Session>::builder()
        .config(config)
        .method("divide", Divide)
        .method("divide", Crash)
        .build()
        .unwrap();

    assert_eq!(service.registered_methods(), vec!["divide".to_string()]);
    assert_eq!(service.config().max_batch_size, Some(2));
}
