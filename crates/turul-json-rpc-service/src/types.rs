use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A uniquely identifying ID for a JSON-RPC request.
/// Can be a string or an integer. A `null` id is never represented here: a request
/// carrying one is treated as a notification.
///
/// Integers that fit in `i64` are always `Number`; `Unsigned` only holds ids
/// above `i64::MAX`, so each integer id has exactly one representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
    Unsigned(u64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::Unsigned(n) => write!(f, "{}", n),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl RequestId {
    /// Recover an id from a raw `id` member.
    ///
    /// `Ok(None)` means the member is null, `Err(())` means it has a shape
    /// JSON-RPC does not allow (fractional or negative out-of-range number,
    /// bool, array, object).
    pub(crate) fn from_value(value: &Value) -> Result<Option<Self>, ()> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(RequestId::String(s.clone()))),
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(n), _) => Ok(Some(RequestId::Number(n))),
                (None, Some(n)) => Ok(Some(RequestId::Unsigned(n))),
                (None, None) => Err(()),
            },
            _ => Err(()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RequestId::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RequestId::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            RequestId::Number(n) => u64::try_from(*n).ok(),
            RequestId::Unsigned(n) => Some(*n),
            RequestId::String(_) => None,
        }
    }
}

/// JSON-RPC version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum JsonRpcVersion {
    #[default]
    V2_0,
}

impl JsonRpcVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonRpcVersion::V2_0 => "2.0",
        }
    }
}

impl fmt::Display for JsonRpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "2.0" => Ok(JsonRpcVersion::V2_0),
            _ => Err(serde::de::Error::custom(format!(
                "Invalid JSON-RPC version: {}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_serialization() {
        let id_str = RequestId::String("test".to_string());
        let id_num = RequestId::Number(42);

        assert_eq!(serde_json::to_string(&id_str).unwrap(), r#""test""#);
        assert_eq!(serde_json::to_string(&id_num).unwrap(), "42");
    }

    #[test]
    fn test_request_id_from_value() {
        assert_eq!(RequestId::from_value(&json!(7)), Ok(Some(RequestId::Number(7))));
        assert_eq!(
            RequestId::from_value(&json!("abc")),
            Ok(Some(RequestId::String("abc".to_string())))
        );
        assert_eq!(RequestId::from_value(&Value::Null), Ok(None));
        assert!(RequestId::from_value(&json!(1.5)).is_err());
        assert!(RequestId::from_value(&json!({"id": 1})).is_err());
    }

    #[test]
    fn test_request_id_above_i64_max() {
        let big = u64::MAX;
        let id = RequestId::from_value(&json!(big)).unwrap().unwrap();

        assert_eq!(id, RequestId::Unsigned(big));
        assert_eq!(id.as_u64(), Some(big));
        assert_eq!(id.as_i64(), None);
        assert_eq!(serde_json::to_value(&id).unwrap(), json!(big));
        assert_eq!(serde_json::from_value::<RequestId>(json!(big)).unwrap(), id);

        let small = RequestId::from_value(&json!(5u64)).unwrap().unwrap();
        assert_eq!(small, RequestId::Number(5));
    }

    #[test]
    fn test_json_rpc_version() {
        let version = JsonRpcVersion::V2_0;
        assert_eq!(version.as_str(), "2.0");
        assert_eq!(serde_json::to_string(&version).unwrap(), r#""2.0""#);
        assert!(serde_json::from_value::<JsonRpcVersion>(json!("1.0")).is_err());
    }
}
