use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{JsonRpcError, JsonRpcErrorObject};
use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: RequestId,
    pub result: Value,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            result,
        }
    }
}

/// Union type that represents either a successful response or an error response
/// This ensures JSON-RPC 2.0 compliance by keeping success and error responses separate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcError),
}

impl JsonRpcMessage {
    /// Create a success message
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Response(JsonRpcResponse::success(id, result))
    }

    /// Create an error message
    pub fn error(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self::Error(JsonRpcError::new(id, error))
    }

    /// Check if this is an error response
    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    /// Get the request ID from either response or error
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcMessage::Response(resp) => Some(&resp.id),
            JsonRpcMessage::Error(err) => err.id.as_ref(),
        }
    }

    /// The error object, if this is an error response
    pub fn error_object(&self) -> Option<&JsonRpcErrorObject> {
        match self {
            JsonRpcMessage::Response(_) => None,
            JsonRpcMessage::Error(err) => Some(&err.error),
        }
    }

    /// The result value, if this is a successful response
    pub fn result(&self) -> Option<&Value> {
        match self {
            JsonRpcMessage::Response(resp) => Some(&resp.result),
            JsonRpcMessage::Error(_) => None,
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

/// What the service hands back to the transport for one decoded body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JsonRpcReply {
    /// Reply to a single request object
    Single(JsonRpcMessage),
    /// Replies to a batch, in input order, with notifications omitted (may be empty)
    Batch(Vec<JsonRpcMessage>),
}

impl JsonRpcReply {
    /// All envelopes carried by this reply
    pub fn messages(&self) -> &[JsonRpcMessage] {
        match self {
            JsonRpcReply::Single(message) => std::slice::from_ref(message),
            JsonRpcReply::Batch(messages) => messages,
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, JsonRpcReply::Batch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_string};

    #[test]
    fn test_response_serialization() {
        let response = JsonRpcResponse::success(RequestId::Number(1), json!({"result": "success"}));

        let json_str = to_string(&response).unwrap();
        let parsed: JsonRpcResponse = from_str(&json_str).unwrap();

        assert_eq!(parsed.id, RequestId::Number(1));
        assert_eq!(parsed.result, json!({"result": "success"}));
    }

    #[test]
    fn test_message_accessors() {
        let ok = JsonRpcMessage::success(RequestId::Number(1), json!(5));
        assert!(!ok.is_error());
        assert_eq!(ok.result(), Some(&json!(5)));
        assert!(ok.error_object().is_none());

        let err = JsonRpcMessage::error(None, JsonRpcErrorObject::invalid_request(None));
        assert!(err.is_error());
        assert_eq!(err.id(), None);
        assert_eq!(err.error_object().map(|e| e.code), Some(-32600));
    }

    #[test]
    fn test_error_envelope_keeps_null_id() {
        let err = JsonRpcMessage::error(None, JsonRpcErrorObject::invalid_request(None));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["id"], Value::Null);
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_batch_reply_serializes_as_array() {
        let reply = JsonRpcReply::Batch(vec![]);
        assert_eq!(to_string(&reply).unwrap(), "[]");
        assert!(reply.messages().is_empty());

        let single = JsonRpcReply::Single(JsonRpcMessage::success(RequestId::Number(2), json!(5)));
        assert_eq!(single.messages().len(), 1);
        assert!(!single.is_batch());
    }
}
