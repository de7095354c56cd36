use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{MethodResult, RegistryError};
use crate::SYSTEM_PREFIX;
use crate::request::RequestParams;

/// A callable bound to a method name.
///
/// `options` is whatever the transport passed along with the request; the
/// service never looks at it.
pub trait MethodHandler<O>: Send + Sync {
    fn call(&self, params: Option<RequestParams>, options: &O) -> MethodResult<Value>;
}

impl<O, F> MethodHandler<O> for F
where
    F: Fn(Option<RequestParams>, &O) -> MethodResult<Value> + Send + Sync,
{
    fn call(&self, params: Option<RequestParams>, options: &O) -> MethodResult<Value> {
        self(params, options)
    }
}

/// Method name to handler mapping. Names are unique for the lifetime of the
/// registry.
pub struct MethodRegistry<O> {
    methods: BTreeMap<String, Arc<dyn MethodHandler<O>>>,
}

impl<O> MethodRegistry<O> {
    pub fn new() -> Self {
        Self {
            methods: BTreeMap::new(),
        }
    }

    /// A registry holding one built-in method from the `system.` namespace.
    pub(crate) fn with_builtin(name: &str, handler: Arc<dyn MethodHandler<O>>) -> Self {
        let mut methods = BTreeMap::new();
        methods.insert(name.to_string(), handler);
        Self { methods }
    }

    /// Bind `name` to `handler`, failing if the name is already taken or
    /// falls in the reserved `system.` namespace. The registry is left
    /// untouched on failure.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn MethodHandler<O>>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.methods.contains_key(&name) {
            return Err(RegistryError::DuplicateMethodName(name));
        }
        if name.starts_with(SYSTEM_PREFIX) {
            return Err(RegistryError::ReservedMethodName(name));
        }
        debug!("Registered method: {}", name);
        self.methods.insert(name, handler);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<&Arc<dyn MethodHandler<O>>> {
        self.methods.get(name)
    }

    /// All registered names, sorted.
    pub fn method_names(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<O> Default for MethodRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}
