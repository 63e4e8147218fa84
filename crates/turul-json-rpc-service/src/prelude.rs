//! # JSON-RPC Service Prelude
//!
//! Re-exports of the types needed to define methods and run a service.
//!
//! ```rust
//! use turul_json_rpc_service::prelude::*;
//! ```

// Service and configuration
pub use crate::config::{BatchMode, DuplicatePolicy, ServiceConfig};
pub use crate::service::{JsonRpcService, JsonRpcServiceBuilder};

// Methods
pub use crate::error::{RpcError, ServiceError};
pub use crate::method::{Fault, FaultKind, FnMethod, JsonRpcMethod, MethodResult, to_method_result};
pub use crate::params::Params;

// Wire types
pub use crate::error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject};
pub use crate::request::{JsonRpcRequest, RequestParams};
pub use crate::response::{JsonRpcMessage, JsonRpcReply, JsonRpcResponse};
pub use crate::types::{JsonRpcVersion, RequestId};

// Validation
pub use crate::validation::{Bounds, ErrorMap, Kind, Rule, Validation, ValidationOutcome};

// Standard error codes
pub use crate::error_codes::*;
