//! # JSON-RPC 1.1 Service
//!
//! A transport-agnostic JSON-RPC 1.1 service dispatcher. Raw requests go in,
//! well-formed JSON-RPC 1.1 envelopes come out, and nothing a method does can
//! make a call fail.
//!
//! ## Features
//! - Structural validation of the request envelope
//! - Named or positional params, notifications (no `id`), explicit `null` ids
//! - Optional per-method params and result schemas (JSON Schema)
//! - Reserved error code arbitration for application errors
//! - Built-in `system.describe` service description
//!
//! ```rust
//! use jsonrpc11_server::prelude::*;
//! use serde_json::{Value, json};
//!
//! let service = JsonRpcService::builder()
//!     .method_fn("add", |params: Option<RequestParams>, _options: &()| -> MethodResult<Value> {
//!         let (a, b): (i64, i64) = params
//!             .ok_or_else(|| ProtocolError::invalid_params("missing params"))?
//!             .parse()?;
//!         Ok(json!(a + b))
//!     })
//!     .unwrap()
//!     .build();
//!
//! let response = service.call_str(r#"{"version":"1.1","method":"add","params":[2,3],"id":1}"#, &());
//! assert_eq!(response.as_deref(), Some(r#"{"version":"1.1","result":5,"id":1}"#));
//! ```

pub mod describe;
pub mod error;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod response;
pub mod schema;
pub mod service;
pub mod types;
pub mod validation;

// Re-export main types
pub use describe::{ProcedureDescription, ServiceDescription};
pub use error::{
    ApiError, ApplicationFault, JsonRpcErrorCode, JsonRpcErrorObject, MethodError, MethodResult,
    ProtocolError, RegistryError, is_reserved_code,
};
pub use registry::{MethodHandler, MethodRegistry};
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcError, JsonRpcMessage, JsonRpcResponse};
pub use schema::{MethodSchemas, SchemaError, SchemaKind};
pub use service::{JsonRpcService, JsonRpcServiceBuilder};
pub use types::{JsonRpcVersion, RequestId};
pub use validation::{Role, SchemaViolation, Validation};

/// JSON-RPC 1.1 version constant
pub const JSONRPC_VERSION: &str = "1.1";

/// Namespace reserved for built-in methods
pub const SYSTEM_PREFIX: &str = "system.";

/// Built-in service description method
pub const SYSTEM_DESCRIBE: &str = "system.describe";

/// Error codes used by the service
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const SERVER_ERROR: i64 = -32000;
    pub const RESERVED_ERROR_CODE: i64 = -32001;
    pub const INVALID_RESULT: i64 = -32002;

    // Reserved for protocol errors: -32768 to -32000
    pub const RESERVED_START: i64 = -32768;
    pub const RESERVED_END: i64 = -32000;
}
