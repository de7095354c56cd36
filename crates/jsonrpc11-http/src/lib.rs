//! # JSON-RPC 1.1 over HTTP
//!
//! A small hyper server that feeds `POST` bodies into a
//! [`JsonRpcService`](jsonrpc11_server::JsonRpcService) and writes back
//! whatever it answers. Every call runs on the blocking pool, so method
//! handlers may do synchronous work freely.
//!
//! The `notes` module holds the demo service run by the `notes-server`
//! binary.

pub mod notes;
pub mod server;

pub use server::{HttpContext, HttpJsonRpcServer, HttpJsonRpcServerBuilder, ServerConfig};

use jsonrpc11_schema::SchemaLoadError;
use jsonrpc11_server::RegistryError;

/// Result type for HTTP server operations
pub type Result<T> = std::result::Result<T, HttpServerError>;

/// HTTP server errors
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaLoadError),

    #[error("Registration error: {0}")]
    Registry(#[from] RegistryError),
}
