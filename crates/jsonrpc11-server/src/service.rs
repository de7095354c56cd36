//! The JSON-RPC 1.1 service: setup through [`JsonRpcServiceBuilder`], then
//! a frozen [`JsonRpcService`] that runs the request lifecycle.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::describe::{DescribeHandler, ProcedureDescription, ServiceDescription};
use crate::error::{
    JsonRpcErrorCode, JsonRpcErrorObject, MethodError, MethodResult, ProtocolError,
    RegistryError, fault_trace, is_reserved_code,
};
use crate::registry::{MethodHandler, MethodRegistry};
use crate::request::{JsonRpcRequest, RequestParams};
use crate::response::JsonRpcMessage;
use crate::schema::{SYSTEM_SCHEMAS, validate_request};
use crate::validation::{Role, Validation};
use crate::{SYSTEM_DESCRIBE, SYSTEM_PREFIX};

/// Serialized when a response cannot be rendered at all.
const FALLBACK_RESPONSE: &str = r#"{"version":"1.1","error":{"name":"JSONRPCError","code":-32603,"message":"Internal error"}}"#;

/// Setup phase of a service. Every method is registered here; [`build`]
/// freezes the result.
///
/// [`build`]: JsonRpcServiceBuilder::build
pub struct JsonRpcServiceBuilder<O = ()> {
    description: ServiceDescription,
    registry: MethodRegistry<O>,
    describe_document: Arc<OnceCell<Value>>,
    validation: Option<Arc<dyn Validation>>,
    validate_result: bool,
}

impl<O: 'static> JsonRpcServiceBuilder<O> {
    pub fn new() -> Self {
        let (describe, describe_document) = DescribeHandler::new();
        let registry = MethodRegistry::with_builtin(SYSTEM_DESCRIBE, Arc::new(describe));

        Self {
            description: ServiceDescription::default(),
            registry,
            describe_document,
            validation: None,
            validate_result: false,
        }
    }

    /// Set the metadata served by `system.describe`
    pub fn description(mut self, description: ServiceDescription) -> Self {
        self.description = description;
        self
    }

    /// Enable params (and optionally result) validation for service methods.
    /// Without a validation set, params are passed through unchecked.
    pub fn validation(mut self, validation: Arc<dyn Validation>) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Check method results against their declared schemas
    pub fn validate_result(mut self, enable: bool) -> Self {
        self.validate_result = enable;
        self
    }

    /// Register a handler under `name`.
    pub fn method<H>(mut self, name: impl Into<String>, handler: H) -> Result<Self, RegistryError>
    where
        H: MethodHandler<O> + 'static,
    {
        self.add(name, handler)?;
        Ok(self)
    }

    /// Register a closure under `name`.
    pub fn method_fn<F>(self, name: impl Into<String>, func: F) -> Result<Self, RegistryError>
    where
        F: Fn(Option<RequestParams>, &O) -> MethodResult<Value> + Send + Sync + 'static,
    {
        self.method(name, func)
    }

    /// Register a handler under `name` in place.
    pub fn add<H>(&mut self, name: impl Into<String>, handler: H) -> Result<(), RegistryError>
    where
        H: MethodHandler<O> + 'static,
    {
        self.registry.register(name, Arc::new(handler))
    }

    /// Freeze the registry and render the service description.
    pub fn build(self) -> JsonRpcService<O> {
        let procs = self
            .registry
            .method_names()
            .into_iter()
            .map(|name| {
                let validator = select_validator(self.validation.as_deref(), &name);
                ProcedureDescription {
                    params: validator
                        .map(|v| v.params_role(&name))
                        .unwrap_or(Role::Undeclared),
                    result: validator
                        .map(|v| v.result_role(&name))
                        .unwrap_or(Role::Undeclared),
                    name,
                }
            })
            .collect();
        let description = self.description.with_procs(procs);
        let _ = self.describe_document.set(description.to_json());

        debug!(
            "JSON-RPC service '{}' built with {} methods (validation: {}, result validation: {})",
            description.name,
            self.registry.len(),
            self.validation.is_some(),
            self.validate_result
        );

        JsonRpcService {
            registry: self.registry,
            validation: self.validation,
            validate_result: self.validate_result,
            description,
        }
    }
}

impl<O: 'static> Default for JsonRpcServiceBuilder<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Schema set for `method`: the fixed system set for the reserved namespace,
/// the service set otherwise.
fn select_validator<'a>(
    service: Option<&'a dyn Validation>,
    method: &str,
) -> Option<&'a dyn Validation> {
    if method.starts_with(SYSTEM_PREFIX) {
        Some(&*SYSTEM_SCHEMAS)
    } else {
        service
    }
}

/// A frozen JSON-RPC 1.1 service.
///
/// Calls never fail: every outcome is an envelope, or nothing for a
/// successful notification. The service holds no per-call state and may be
/// shared between threads.
pub struct JsonRpcService<O = ()> {
    registry: MethodRegistry<O>,
    validation: Option<Arc<dyn Validation>>,
    validate_result: bool,
    description: ServiceDescription,
}

impl<O: 'static> JsonRpcService<O> {
    pub fn builder() -> JsonRpcServiceBuilder<O> {
        JsonRpcServiceBuilder::new()
    }

    pub fn description(&self) -> &ServiceDescription {
        &self.description
    }

    /// All registered method names, sorted.
    pub fn method_names(&self) -> Vec<String> {
        self.registry.method_names()
    }

    /// Bytes in, bytes out. `None` means there is nothing to send back.
    pub fn call(&self, body: &[u8], options: &O) -> Option<Vec<u8>> {
        let message = match serde_json::from_slice::<Value>(body) {
            Ok(request) => self.call_value(request, options),
            Err(err) => parse_failure(&err),
        };
        if !message.needs_response() {
            return None;
        }
        Some(serde_json::to_vec(&message).unwrap_or_else(|err| {
            error!("Failed to serialize response: {}", err);
            FALLBACK_RESPONSE.as_bytes().to_vec()
        }))
    }

    /// String in, string out. `None` means there is nothing to send back.
    pub fn call_str(&self, body: &str, options: &O) -> Option<String> {
        let message = match serde_json::from_str::<Value>(body) {
            Ok(request) => self.call_value(request, options),
            Err(err) => parse_failure(&err),
        };
        if !message.needs_response() {
            return None;
        }
        Some(serde_json::to_string(&message).unwrap_or_else(|err| {
            error!("Failed to serialize response: {}", err);
            FALLBACK_RESPONSE.to_string()
        }))
    }

    /// Run the lifecycle on an already decoded request.
    pub fn call_value(&self, request: Value, options: &O) -> JsonRpcMessage {
        let request = match parse_request(request) {
            Ok(request) => request,
            Err(message) => return message,
        };

        let id = request.id.clone().map(Value::from);
        let method = request.method.clone();
        debug!("Dispatching method: {}", method);

        match self.dispatch(request, options) {
            Ok(result) => JsonRpcMessage::success(result, id),
            Err(error) => {
                debug!("Method {} failed: {}", method, error);
                JsonRpcMessage::error(error.with_method(&method), id)
            }
        }
    }

    fn dispatch(&self, request: JsonRpcRequest, options: &O) -> Result<Value, JsonRpcErrorObject> {
        let JsonRpcRequest { method, params, .. } = request;

        let handler = self.registry.resolve(&method).ok_or_else(|| {
            JsonRpcErrorObject::method_not_found(&method, self.registry.method_names())
        })?;

        let validator = select_validator(self.validation.as_deref(), &method);
        check_params(validator, &method, params.as_ref())?;

        let result = invoke(handler.as_ref(), &method, params, options)?;

        if self.validate_result {
            Ok(check_result(validator, &method, result)?)
        } else {
            Ok(result)
        }
    }
}

fn parse_failure(err: &serde_json::Error) -> JsonRpcMessage {
    debug!("Request is not valid JSON: {}", err);
    JsonRpcMessage::error(JsonRpcErrorObject::parse_error(&err.to_string()), None)
}

/// Structural validation. On failure the id is echoed if the payload is an
/// object carrying one, whatever its value.
fn parse_request(request: Value) -> Result<JsonRpcRequest, JsonRpcMessage> {
    let echoed_id = || request.as_object().and_then(|obj| obj.get("id")).cloned();

    if let Err(violation) = validate_request(&request) {
        debug!("Invalid request: {}", violation);
        return Err(JsonRpcMessage::error(
            JsonRpcErrorObject::invalid_request(&violation),
            echoed_id(),
        ));
    }

    let id = echoed_id();
    serde_json::from_value(request).map_err(|err| {
        JsonRpcMessage::error(
            ProtocolError::new(JsonRpcErrorCode::InvalidRequest)
                .with_data(serde_json::json!({ "message": err.to_string() }))
                .into_error_object(),
            id,
        )
    })
}

fn check_params(
    validator: Option<&dyn Validation>,
    method: &str,
    params: Option<&RequestParams>,
) -> Result<(), ProtocolError> {
    let Some(validator) = validator else {
        return Ok(());
    };

    match (validator.params_role(method), params) {
        (Role::Expected, None) => Err(ProtocolError::invalid_params(
            "Method has parameters specified, but none were provided",
        )),
        (Role::Expected, Some(params)) => validator
            .validate_params(method, &params.to_value())
            .map_err(ProtocolError::invalid_params_violation),
        (Role::Absent, None) => Ok(()),
        (Role::Absent, Some(_)) => Err(ProtocolError::invalid_params(
            "Method has no parameters specified, but arguments were provided",
        )),
        (Role::Undeclared, _) => {
            warn!("Validation is enabled but method {} declares no params", method);
            Err(ProtocolError::invalid_params(
                "Validation is enabled, but no parameter validator was provided",
            ))
        }
    }
}

fn check_result(
    validator: Option<&dyn Validation>,
    method: &str,
    result: Value,
) -> Result<Value, ProtocolError> {
    let Some(validator) = validator else {
        return Ok(result);
    };

    match validator.result_role(method) {
        Role::Expected => {
            validator
                .validate_result(method, &result)
                .map_err(ProtocolError::result_violation)?;
            Ok(result)
        }
        Role::Absent if result.is_null() => Ok(Value::Null),
        Role::Absent => {
            error!("Method {} returned a value but declares no result", method);
            Err(ProtocolError::invalid_result(
                "The method is specified to not return a result, but a value was returned",
                result,
            ))
        }
        Role::Undeclared => {
            warn!("Validation is enabled but method {} declares no result", method);
            Err(ProtocolError::invalid_params(
                "Validation is enabled, but no result validator was provided",
            ))
        }
    }
}

/// Call the handler and classify whatever comes back. Panics are caught here.
fn invoke<O>(
    handler: &dyn MethodHandler<O>,
    method: &str,
    params: Option<RequestParams>,
    options: &O,
) -> Result<Value, JsonRpcErrorObject> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.call(params, options))) {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(classify(method, err)),
        Err(payload) => {
            let message = panic_message(&*payload);
            error!("Method {} panicked: {}", method, message);
            Err(JsonRpcErrorObject::unexpected_exception(
                &message,
                vec![format!("panic in method '{}': {}", method, message)],
            ))
        }
    }
}

fn classify(method: &str, err: MethodError) -> JsonRpcErrorObject {
    match err {
        MethodError::Protocol(protocol) => protocol.into_error_object(),
        MethodError::Application(fault) => {
            let code = fault.code();
            if is_reserved_code(code) {
                warn!(
                    "Method {} raised application error with reserved code {}",
                    method, code
                );
                JsonRpcErrorObject::reserved_error_code(code)
            } else {
                JsonRpcErrorObject::application(code, fault.error_message(), fault.data())
            }
        }
        MethodError::Unexpected(fault) => {
            error!("Unexpected error in method {}: {}", method, fault);
            let trace = fault_trace(&*fault);
            JsonRpcErrorObject::unexpected_exception(&fault.to_string(), trace)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
