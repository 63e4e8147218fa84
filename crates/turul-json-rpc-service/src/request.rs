use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::JsonRpcError;
use crate::types::{JsonRpcVersion, RequestId};

/// Parameters for a JSON-RPC request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(Map<String, Value>),
}

impl Default for RequestParams {
    fn default() -> Self {
        RequestParams::Object(Map::new())
    }
}

impl RequestParams {
    /// Get a parameter by name (for object params)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            RequestParams::Object(map) => map.get(key),
            RequestParams::Array(_) => None, // Can't get by name from array
        }
    }

    /// Get a parameter by index (for array params only)
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            RequestParams::Array(vec) => vec.get(index),
            RequestParams::Object(_) => None, // Can't get by index from object
        }
    }

    /// Look up a field by name, or by its decimal index for positional params
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            RequestParams::Object(map) => map.get(name),
            RequestParams::Array(vec) => name.parse::<usize>().ok().and_then(|i| vec.get(i)),
        }
    }

    /// Check if parameters are empty
    pub fn is_empty(&self) -> bool {
        match self {
            RequestParams::Object(map) => map.is_empty(),
            RequestParams::Array(vec) => vec.is_empty(),
        }
    }

    /// Convert to a serde_json::Value
    pub fn to_value(&self) -> Value {
        match self {
            RequestParams::Object(map) => Value::Object(map.clone()),
            RequestParams::Array(arr) => Value::Array(arr.clone()),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            RequestParams::Object(map) => Value::Object(map),
            RequestParams::Array(arr) => Value::Array(arr),
        }
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(vec: Vec<Value>) -> Self {
        RequestParams::Array(vec)
    }
}

/// A JSON-RPC request. A request without an id is a notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<RequestParams>,
}

impl JsonRpcRequest {
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            method: method.into(),
            params,
        }
    }

    /// Create a notification (no id, no response expected)
    pub fn notification(method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self::new(None, method, params)
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Get a parameter by name (if params are an object)
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref()?.get(name)
    }

    /// Get a parameter by index (if params are an array)
    pub fn get_param_index(&self, index: usize) -> Option<&Value> {
        self.params.as_ref()?.get_index(index)
    }

    /// Build a request from one decoded request object.
    ///
    /// Checks the envelope structure only; the returned error is an
    /// `Invalid Request` envelope keyed by whatever id could be recovered.
    pub fn from_value(value: Value) -> Result<Self, JsonRpcError> {
        let Value::Object(mut object) = value else {
            return Err(JsonRpcError::invalid_request(None, "request must be an object"));
        };

        let id = match object.get("id") {
            None => None,
            Some(raw) => RequestId::from_value(raw).map_err(|_| {
                JsonRpcError::invalid_request(None, "id must be a string, an integer or null")
            })?,
        };

        match object.get("jsonrpc") {
            Some(Value::String(v)) if v == JsonRpcVersion::V2_0.as_str() => {}
            _ => {
                return Err(JsonRpcError::invalid_request(
                    id,
                    "jsonrpc must be exactly \"2.0\"",
                ));
            }
        }

        let method = match object.remove("method") {
            Some(Value::String(method)) if !method.is_empty() => method,
            _ => {
                return Err(JsonRpcError::invalid_request(
                    id,
                    "method must be a non-empty string",
                ));
            }
        };

        let params = match object.remove("params") {
            None => None,
            Some(Value::Object(map)) => Some(RequestParams::Object(map)),
            Some(Value::Array(vec)) => Some(RequestParams::Array(vec)),
            Some(_) => {
                return Err(JsonRpcError::invalid_request(
                    id,
                    "params must be an object or an array",
                ));
            }
        };

        Ok(Self {
            version: JsonRpcVersion::V2_0,
            id,
            method,
            params,
        })
    }
}
