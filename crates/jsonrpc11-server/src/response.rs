use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JsonRpcErrorObject;
use crate::types::{JsonRpcVersion, deserialize_present};

/// A successful JSON-RPC 1.1 response
///
/// `id` is whatever the request carried under its `id` key, echoed verbatim;
/// `None` means the request had no such key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub version: JsonRpcVersion,
    pub result: Value,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub id: Option<Value>,
}

impl JsonRpcResponse {
    pub fn new(result: Value, id: Option<Value>) -> Self {
        Self {
            version: JsonRpcVersion::V1_1,
            result,
            id,
        }
    }
}

/// A JSON-RPC 1.1 error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub version: JsonRpcVersion,
    pub error: JsonRpcErrorObject,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub id: Option<Value>,
}

impl JsonRpcError {
    pub fn new(error: JsonRpcErrorObject, id: Option<Value>) -> Self {
        Self {
            version: JsonRpcVersion::V1_1,
            error,
            id,
        }
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for JsonRpcError {}

/// Either a success or an error envelope, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcError),
}

impl JsonRpcMessage {
    pub fn success(result: Value, id: Option<Value>) -> Self {
        Self::Response(JsonRpcResponse::new(result, id))
    }

    pub fn error(error: JsonRpcErrorObject, id: Option<Value>) -> Self {
        Self::Error(JsonRpcError::new(error, id))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    pub fn id(&self) -> Option<&Value> {
        match self {
            JsonRpcMessage::Response(resp) => resp.id.as_ref(),
            JsonRpcMessage::Error(err) => err.id.as_ref(),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            JsonRpcMessage::Response(resp) => Some(&resp.result),
            JsonRpcMessage::Error(_) => None,
        }
    }

    pub fn error_object(&self) -> Option<&JsonRpcErrorObject> {
        match self {
            JsonRpcMessage::Response(_) => None,
            JsonRpcMessage::Error(err) => Some(&err.error),
        }
    }

    /// Successful notifications are not answered; everything else is.
    pub fn needs_response(&self) -> bool {
        match self {
            JsonRpcMessage::Response(resp) => resp.id.is_some(),
            JsonRpcMessage::Error(_) => true,
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
