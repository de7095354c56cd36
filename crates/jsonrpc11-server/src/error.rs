use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use thiserror::Error;

use crate::error_codes;
use crate::validation::SchemaViolation;

/// Name carried by every protocol-level error object.
pub const PROTOCOL_ERROR_NAME: &str = "JSONRPCError";
/// Name carried by application-defined error objects.
pub const APPLICATION_ERROR_NAME: &str = "APIError";

/// Upper bound on the number of entries kept in an unexpected fault's trace.
const MAX_TRACE_ENTRIES: usize = 32;

/// Whether `code` falls inside the band reserved for protocol errors.
pub fn is_reserved_code(code: i64) -> bool {
    (error_codes::RESERVED_START..=error_codes::RESERVED_END).contains(&code)
}

/// Protocol-level error kinds. This set is closed: no other code in the
/// reserved band is ever emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError,
    ReservedErrorCode,
    InvalidResult,
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::ServerError => error_codes::SERVER_ERROR,
            JsonRpcErrorCode::ReservedErrorCode => error_codes::RESERVED_ERROR_CODE,
            JsonRpcErrorCode::InvalidResult => error_codes::INVALID_RESULT,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError => "Server error",
            JsonRpcErrorCode::ReservedErrorCode => "Reserved Error Code",
            JsonRpcErrorCode::InvalidResult => "Invalid result",
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC 1.1 error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub name: String,
    pub code: i64,
    pub message: String,
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            name: PROTOCOL_ERROR_NAME.to_string(),
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    /// An application-defined error. The caller is responsible for keeping
    /// `code` out of the reserved band; the service enforces this at dispatch.
    pub fn application(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            name: APPLICATION_ERROR_NAME.to_string(),
            code,
            message: message.into(),
            data,
        }
    }

    pub fn parse_error(detail: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::ParseError,
            None,
            Some(json!({ "message": detail })),
        )
    }

    pub fn invalid_request(violation: &SchemaViolation) -> Self {
        Self::new(
            JsonRpcErrorCode::InvalidRequest,
            None,
            Some(violation.to_data()),
        )
    }

    pub fn method_not_found(method: &str, available_methods: Vec<String>) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            None,
            Some(json!({
                "method": method,
                "available_methods": available_methods,
            })),
        )
    }

    pub fn reserved_error_code(bad_code: i64) -> Self {
        Self::new(
            JsonRpcErrorCode::ReservedErrorCode,
            None,
            Some(json!({ "bad_code": bad_code })),
        )
    }

    /// The last-resort error for faults a method did not declare.
    pub fn unexpected_exception(exception_message: &str, traceback: Vec<String>) -> Self {
        Self::new(
            JsonRpcErrorCode::ServerError,
            Some("Unexpected exception calling method".to_string()),
            Some(json!({
                "message": "An unexpected exception was caught executing the method",
                "exception_message": exception_message,
                "traceback": traceback,
            })),
        )
    }

    /// Records the method name in the structured data, creating it if needed.
    pub fn with_method(mut self, method: &str) -> Self {
        let mut data = match self.data.take() {
            Some(Value::Object(map)) => map,
            Some(other) => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
            None => Map::new(),
        };
        data.insert("method".to_string(), Value::String(method.to_string()));
        self.data = Some(Value::Object(data));
        self
    }
}

impl fmt::Display for JsonRpcErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC Error {}: {}", self.code, self.message)
    }
}

/// A predefined protocol error, raised by the service itself or by a method
/// that wants to report e.g. invalid parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolError {
    pub kind: JsonRpcErrorCode,
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl ProtocolError {
    pub fn new(kind: JsonRpcErrorCode) -> Self {
        Self {
            kind,
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

    /// Invalid params with a human readable explanation as data.
    pub fn invalid_params(message: &str) -> Self {
        Self::new(JsonRpcErrorCode::InvalidParams).with_data(json!({ "message": message }))
    }

    pub fn invalid_params_violation(violation: SchemaViolation) -> Self {
        Self::new(JsonRpcErrorCode::InvalidParams).with_data(violation.to_data())
    }

    /// A result failed its declared schema; this is a server-side breach.
    pub fn result_violation(violation: SchemaViolation) -> Self {
        Self::new(JsonRpcErrorCode::InternalError).with_data(violation.to_data())
    }

    pub fn invalid_result(message: &str, bad_result: Value) -> Self {
        Self::new(JsonRpcErrorCode::InvalidResult).with_data(json!({
            "message": message,
            "bad_result": bad_result,
        }))
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new(JsonRpcErrorCode::InternalError).with_data(json!({ "message": message }))
    }

    pub fn into_error_object(self) -> JsonRpcErrorObject {
        JsonRpcErrorObject::new(self.kind, self.message, self.data)
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}", message),
            None => write!(f, "{}", self.kind.message()),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<ProtocolError> for JsonRpcErrorObject {
    fn from(error: ProtocolError) -> Self {
        error.into_error_object()
    }
}

/// Errors defined by method implementers.
///
/// Codes are expected to lie outside the reserved band; an error that does
/// not is replaced by a reserved-code error at dispatch.
pub trait ApplicationFault: std::error::Error + Send + Sync + 'static {
    fn code(&self) -> i64;

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn data(&self) -> Option<Value> {
        None
    }
}

/// Ready-made application error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl ApiError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl ApplicationFault for ApiError {
    fn code(&self) -> i64 {
        self.code
    }

    fn error_message(&self) -> String {
        self.message.clone()
    }

    fn data(&self) -> Option<Value> {
        self.data.clone()
    }
}

/// Everything a method handler may fail with.
#[derive(Debug, Error)]
pub enum MethodError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Application(Box<dyn ApplicationFault>),

    #[error("{0}")]
    Unexpected(Box<dyn std::error::Error + Send + Sync>),
}

impl MethodError {
    pub fn application(fault: impl ApplicationFault) -> Self {
        MethodError::Application(Box::new(fault))
    }

    pub fn unexpected(fault: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        MethodError::Unexpected(fault.into())
    }
}

impl From<ApiError> for MethodError {
    fn from(error: ApiError) -> Self {
        MethodError::application(error)
    }
}

impl From<serde_json::Error> for MethodError {
    fn from(error: serde_json::Error) -> Self {
        MethodError::unexpected(error)
    }
}

/// Result type for method handlers
pub type MethodResult<T> = Result<T, MethodError>;

/// Messages of `fault` and its sources, outermost first.
pub(crate) fn fault_trace(fault: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut trace = Vec::new();
    let mut current = Some(fault);
    while let Some(error) = current {
        if trace.len() == MAX_TRACE_ENTRIES {
            break;
        }
        trace.push(error.to_string());
        current = error.source();
    }
    trace
}

/// Setup-time errors from the method registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Method already registered under this name: '{0}'")]
    DuplicateMethodName(String),
    #[error("Method names starting with 'system.' are reserved: '{0}'")]
    ReservedMethodName(String),
}
