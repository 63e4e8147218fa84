use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::error_codes;
use crate::types::{JsonRpcVersion, RequestId};

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(i64), // -32099 to -32000
    /// Any code chosen by a method outside the reserved range
    Application(i64),
}

impl JsonRpcErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            error_codes::PARSE_ERROR => JsonRpcErrorCode::ParseError,
            error_codes::INVALID_REQUEST => JsonRpcErrorCode::InvalidRequest,
            error_codes::METHOD_NOT_FOUND => JsonRpcErrorCode::MethodNotFound,
            error_codes::INVALID_PARAMS => JsonRpcErrorCode::InvalidParams,
            error_codes::INTERNAL_ERROR => JsonRpcErrorCode::InternalError,
            c if (error_codes::SERVER_ERROR_START..=error_codes::SERVER_ERROR_END).contains(&c) => {
                JsonRpcErrorCode::ServerError(c)
            }
            c => JsonRpcErrorCode::Application(c),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::ServerError(code) => *code,
            JsonRpcErrorCode::Application(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError(_) => "Server error",
            JsonRpcErrorCode::Application(_) => "Application error",
        }
    }

    /// Whether the code falls in the range JSON-RPC 2.0 reserves for itself
    pub fn is_reserved(&self) -> bool {
        (-32768..=-32000).contains(&self.code())
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, None, data)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            Some(format!("Method '{}' not found", method)),
            Some(serde_json::json!({ "method": method })),
        )
    }

    pub fn invalid_params(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidParams, None, data)
    }

    pub fn internal_error(message: Option<String>, data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InternalError, message, data)
    }
}

impl From<RpcError> for JsonRpcErrorObject {
    fn from(error: RpcError) -> Self {
        Self::new(JsonRpcErrorCode::from_code(error.code), error.message, error.data)
    }
}

/// JSON-RPC Error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: Option<RequestId>,
    pub error: JsonRpcErrorObject,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            error,
        }
    }

    pub fn invalid_request(id: Option<RequestId>, reason: &str) -> Self {
        Self::new(
            id,
            JsonRpcErrorObject::invalid_request(Some(Value::String(reason.to_string()))),
        )
    }

    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(Some(id), JsonRpcErrorObject::method_not_found(method))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Error signalled by a method body.
///
/// Covers the three descriptor shapes a method can return: a bare code, a code
/// with a message or data, and a code with both. Returning it with `?` or
/// `return Err(..)` ends the method early.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64) -> Self {
        Self {
            code,
            message: None,
            data: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_PARAMS).with_message(message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR).with_message(message)
    }

    /// Generic server error (-32000) used for faults raised inside a method
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::SERVER_ERROR_END).with_message(message)
    }

    /// Whether this code collides with the range reserved by JSON-RPC 2.0
    pub fn is_reserved_code(&self) -> bool {
        JsonRpcErrorCode::from_code(self.code).is_reserved()
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fallback = JsonRpcErrorCode::from_code(self.code).message();
        write!(
            f,
            "{}: {}",
            self.code,
            self.message.as_deref().unwrap_or(fallback)
        )
    }
}

impl std::error::Error for RpcError {}

impl From<i64> for RpcError {
    fn from(code: i64) -> Self {
        Self::new(code)
    }
}

impl From<(i64, &str)> for RpcError {
    fn from((code, message): (i64, &str)) -> Self {
        Self::new(code).with_message(message)
    }
}

impl From<(i64, String)> for RpcError {
    fn from((code, message): (i64, String)) -> Self {
        Self::new(code).with_message(message)
    }
}

/// `(code, message_or_data)`: a JSON string becomes the message, anything else the data
impl From<(i64, Value)> for RpcError {
    fn from((code, message_or_data): (i64, Value)) -> Self {
        match message_or_data {
            Value::String(message) => Self::new(code).with_message(message),
            data => Self::new(code).with_data(data),
        }
    }
}

impl From<(i64, &str, Value)> for RpcError {
    fn from((code, message, data): (i64, &str, Value)) -> Self {
        Self::new(code).with_message(message).with_data(data)
    }
}

impl From<(i64, String, Value)> for RpcError {
    fn from((code, message, data): (i64, String, Value)) -> Self {
        Self::new(code).with_message(message).with_data(data)
    }
}

/// Errors raised while assembling a service
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Method '{0}' is registered more than once")]
    DuplicateMethod(String),

    #[error("Method names must not be empty")]
    EmptyMethodName,
}
