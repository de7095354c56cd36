//! # JSON-RPC 1.1 Service Prelude
//!
//! ```rust
//! use jsonrpc11_server::prelude::*;
//! ```

pub use crate::describe::ServiceDescription;
pub use crate::error::{
    ApiError, ApplicationFault, JsonRpcErrorCode, JsonRpcErrorObject, MethodError, MethodResult,
    ProtocolError, RegistryError,
};
pub use crate::registry::MethodHandler;
pub use crate::request::{JsonRpcRequest, RequestParams};
pub use crate::response::{JsonRpcMessage, JsonRpcResponse};
pub use crate::schema::MethodSchemas;
pub use crate::service::{JsonRpcService, JsonRpcServiceBuilder};
pub use crate::types::RequestId;
pub use crate::validation::{SchemaViolation, Validation};

// Error codes
pub use crate::error_codes::*;
