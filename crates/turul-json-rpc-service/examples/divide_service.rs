//! # Divide Service Example
//!
//! A single-method service showing validation, business errors, notifications
//! and batches. Each sample body is dispatched and the serialized reply printed,
//! the way a transport would write it back.
//!
//! ```bash
//! RUST_LOG=turul_json_rpc_service=debug cargo run --example divide_service
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;
use turul_json_rpc_service::prelude::*;

#[derive(Deserialize)]
struct DivideParams {
    x: i64,
    y: i64,
}

struct Divide;

#[async_trait]
impl JsonRpcMethod for Divide {
    fn validate(&self, params: RequestParams) -> ValidationOutcome {
        let integer = [Rule::required(), Rule::type_of(Kind::Integer)];
        Validation::new(params)
            .field("x", &integer)
            .field("y", &integer)
            .finalize()
    }

    async fn call(&self, params: Params, _ctx: &()) -> MethodResult {
        let DivideParams { x, y } = params.parse()?;
        if y == 0 {
            return Err((12345, "divided by zero").into());
        }
        to_method_result(x / y)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let service = JsonRpcService::<()>::builder()
        .method("divide", Divide)
        .method(
            "sqrt",
            FnMethod::new(|(n,): (f64,), _ctx: &()| {
                if n < 0.0 {
                    Err(RpcError::new(12346).with_message("negative input"))
                } else {
                    Ok(n.sqrt())
                }
            }),
        )
        .build()?;

    info!(methods = ?service.registered_methods(), "Service ready");

    let samples = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "divide", "params": {"x": 10, "y": 2}}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "divide", "params": {"x": 10, "y": 0}}),
        json!({"jsonrpc": "2.0", "id": 3, "method": "divide", "params": {"x": 10, "y": "0"}}),
        json!({"jsonrpc": "2.0", "method": "divide", "params": {"x": 1, "y": 1}}),
        json!([
            {"jsonrpc": "2.0", "id": "a", "method": "sqrt", "params": [16.0]},
            {"jsonrpc": "2.0", "id": "b", "method": "sqrt", "params": [-1.0]},
            {"jsonrpc": "2.0", "id": "c", "method": "modulo", "params": [7, 2]}
        ]),
    ];

    for body in samples {
        println!("--> {}", body);
        match service.handle(body, &()).await {
            Some(reply) => println!("<-- {}", serde_json::to_string(&reply)?),
            None => println!("<-- (no reply)"),
        }
    }

    Ok(())
}
