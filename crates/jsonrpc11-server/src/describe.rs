//! Service description served by the built-in `system.describe` method.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MethodResult, ProtocolError};
use crate::registry::MethodHandler;
use crate::request::RequestParams;
use crate::validation::Role;

/// Version of the service description format
pub const SD_VERSION: &str = "1.0";

/// One procedure entry in the service description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureDescription {
    pub name: String,
    pub params: Role,
    pub result: Role,
}

/// JSON-RPC 1.1 service description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescription {
    pub sdversion: String,
    pub name: String,
    pub id: String,
    pub version: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub procs: Vec<ProcedureDescription>,
}

impl ServiceDescription {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            sdversion: SD_VERSION.to_string(),
            id: format!("urn:jsonrpc11:{}", name),
            name,
            version: "0.0.0".to_string(),
            summary: String::new(),
            help: None,
            address: None,
            procs: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Replace the procedure list, keeping it sorted by name.
    pub fn with_procs(mut self, mut procs: Vec<ProcedureDescription>) -> Self {
        procs.sort_by(|a, b| a.name.cmp(&b.name));
        self.procs = procs;
        self
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Default for ServiceDescription {
    fn default() -> Self {
        Self::new("jsonrpc11-service")
    }
}

/// Handler for `system.describe`.
///
/// The document is rendered once, when the service is built, so every call
/// returns the same bytes.
pub(crate) struct DescribeHandler {
    document: Arc<OnceCell<Value>>,
}

impl DescribeHandler {
    pub(crate) fn new() -> (Self, Arc<OnceCell<Value>>) {
        let document = Arc::new(OnceCell::new());
        (
            Self {
                document: Arc::clone(&document),
            },
            document,
        )
    }
}

impl<O> MethodHandler<O> for DescribeHandler {
    fn call(&self, _params: Option<RequestParams>, _options: &O) -> MethodResult<Value> {
        self.document
            .get()
            .cloned()
            .ok_or_else(|| ProtocolError::internal_error("Service description is not available").into())
    }
}
