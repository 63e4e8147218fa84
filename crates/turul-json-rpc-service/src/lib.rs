//! # JSON-RPC 2.0 Service
//!
//! A transport-independent JSON-RPC 2.0 dispatch pipeline. A transport decodes
//! a body into a `serde_json::Value`, hands it to [`JsonRpcService::handle`],
//! and serializes whatever reply comes back. Nothing here reads sockets or
//! speaks HTTP.
//!
//! ## Features
//! - Requests, notifications and batches, with per-entry failure isolation
//! - Methods as trait objects with overridable validation and fault hooks
//! - Rule-based parameter validation collecting every failure per field
//! - Panics inside methods converted to error replies, never propagated
//!
//! ```rust
//! use serde_json::json;
//! use turul_json_rpc_service::prelude::*;
//!
//! let service = JsonRpcService::<()>::builder()
//!     .method("add", FnMethod::new(|(a, b): (i64, i64), _ctx: &()| Ok::<_, RpcError>(a + b)))
//!     .build()
//!     .unwrap();
//!
//! let body = json!({"jsonrpc": "2.0", "id": 1, "method": "add", "params": [2, 3]});
//! let reply = futures::executor::block_on(service.handle(body, &())).unwrap();
//! assert_eq!(
//!     serde_json::to_value(&reply).unwrap(),
//!     json!({"jsonrpc": "2.0", "id": 1, "result": 5})
//! );
//! ```

pub mod config;
pub mod error;
pub mod method;
pub mod params;
pub mod request;
pub mod response;
pub mod service;
pub mod types;
pub mod validation;

pub mod prelude;

// Re-export main types
pub use config::{BatchMode, DuplicatePolicy, ServiceConfig};
pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, RpcError, ServiceError};
pub use method::{Fault, FaultKind, FnMethod, JsonRpcMethod, MethodResult, to_method_result};
pub use params::Params;
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessage, JsonRpcReply, JsonRpcResponse};
pub use service::{JsonRpcService, JsonRpcServiceBuilder};
pub use types::{JsonRpcVersion, RequestId};
pub use validation::{ErrorMap, Rule, Validation, ValidationOutcome};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
