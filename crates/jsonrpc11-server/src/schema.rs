//! JSON Schema backed validation
//!
//! [`MethodSchemas`] holds compiled validators keyed by method name and is the
//! stock [`Validation`] implementation. This module also owns the two fixed
//! schema sets the service always carries: the JSON-RPC 1.1 request envelope
//! and the schemas for the built-in `system.*` methods.

use std::collections::BTreeMap;
use std::fmt;

use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::SYSTEM_DESCRIBE;
use crate::validation::{SchemaViolation, Validation};

/// Which half of a method a schema applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Params,
    Result,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::Params => write!(f, "params"),
            SchemaKind::Result => write!(f, "result"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid {kind} schema for method '{method}': {message}")]
    Compile {
        method: String,
        kind: SchemaKind,
        message: String,
    },
}

enum Declared {
    Schema(Box<Validator>),
    Absent,
}

#[derive(Default)]
struct MethodSchema {
    params: Option<Declared>,
    result: Option<Declared>,
}

impl MethodSchema {
    fn slot(&mut self, kind: SchemaKind) -> &mut Option<Declared> {
        match kind {
            SchemaKind::Params => &mut self.params,
            SchemaKind::Result => &mut self.result,
        }
    }

    fn get(&self, kind: SchemaKind) -> Option<&Declared> {
        match kind {
            SchemaKind::Params => self.params.as_ref(),
            SchemaKind::Result => self.result.as_ref(),
        }
    }
}

/// Compiled params/result schemas for a set of methods.
#[derive(Default)]
pub struct MethodSchemas {
    methods: BTreeMap<String, MethodSchema>,
}

impl fmt::Debug for MethodSchemas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSchemas")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MethodSchemas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that `method` expects params matching `schema`.
    pub fn params(mut self, method: &str, schema: &Value) -> Result<Self, SchemaError> {
        self.insert(method, SchemaKind::Params, Some(schema))?;
        Ok(self)
    }

    /// Declares that `method` takes no params.
    pub fn no_params(mut self, method: &str) -> Self {
        self.insert_absent(method, SchemaKind::Params);
        self
    }

    /// Declares that `method` returns a value matching `schema`.
    pub fn result(mut self, method: &str, schema: &Value) -> Result<Self, SchemaError> {
        self.insert(method, SchemaKind::Result, Some(schema))?;
        Ok(self)
    }

    /// Declares that `method` returns nothing.
    pub fn no_result(mut self, method: &str) -> Self {
        self.insert_absent(method, SchemaKind::Result);
        self
    }

    /// Declares `kind` for `method`: a schema means a value is expected,
    /// `None` means the value must be absent.
    pub fn insert(
        &mut self,
        method: &str,
        kind: SchemaKind,
        schema: Option<&Value>,
    ) -> Result<(), SchemaError> {
        let declared = match schema {
            Some(schema) => {
                let validator =
                    jsonschema::validator_for(schema).map_err(|e| SchemaError::Compile {
                        method: method.to_string(),
                        kind,
                        message: e.to_string(),
                    })?;
                Declared::Schema(Box::new(validator))
            }
            None => Declared::Absent,
        };

        debug!("Registered {} schema for method: {}", kind, method);
        *self
            .methods
            .entry(method.to_string())
            .or_default()
            .slot(kind) = Some(declared);
        Ok(())
    }

    pub fn insert_absent(&mut self, method: &str, kind: SchemaKind) {
        *self
            .methods
            .entry(method.to_string())
            .or_default()
            .slot(kind) = Some(Declared::Absent);
    }

    /// Method names with at least one declaration, sorted.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    fn declared(&self, method: &str, kind: SchemaKind) -> Option<&Declared> {
        self.methods.get(method).and_then(|schema| schema.get(kind))
    }

    fn validate(&self, method: &str, kind: SchemaKind, value: &Value) -> Result<(), SchemaViolation> {
        match self.declared(method, kind) {
            Some(Declared::Schema(validator)) => check(validator, value),
            Some(Declared::Absent) => Err(SchemaViolation::new(
                format!("Method '{}' declares no {}", method, kind),
                "",
                value.clone(),
            )),
            None => Err(SchemaViolation::new(
                format!("No {} schema registered for method '{}'", kind, method),
                "",
                value.clone(),
            )),
        }
    }
}

impl Validation for MethodSchemas {
    fn has_params_schema(&self, method: &str) -> bool {
        matches!(
            self.declared(method, SchemaKind::Params),
            Some(Declared::Schema(_))
        )
    }

    fn has_absent_params_schema(&self, method: &str) -> bool {
        matches!(
            self.declared(method, SchemaKind::Params),
            Some(Declared::Absent)
        )
    }

    fn validate_params(&self, method: &str, params: &Value) -> Result<(), SchemaViolation> {
        self.validate(method, SchemaKind::Params, params)
    }

    fn has_result_schema(&self, method: &str) -> bool {
        matches!(
            self.declared(method, SchemaKind::Result),
            Some(Declared::Schema(_))
        )
    }

    fn has_absent_result_schema(&self, method: &str) -> bool {
        matches!(
            self.declared(method, SchemaKind::Result),
            Some(Declared::Absent)
        )
    }

    fn validate_result(&self, method: &str, result: &Value) -> Result<(), SchemaViolation> {
        self.validate(method, SchemaKind::Result, result)
    }
}

fn check(validator: &Validator, value: &Value) -> Result<(), SchemaViolation> {
    validator.validate(value).map_err(|error| {
        let message = error.to_string();
        let path = error.instance_path.to_string();
        SchemaViolation::new(message, path, error.instance.into_owned())
    })
}

/// Shape of a JSON-RPC 1.1 request envelope.
static REQUEST_SCHEMA: Lazy<Validator> = Lazy::new(|| {
    let schema = json!({
        "type": "object",
        "required": ["version", "method"],
        "additionalProperties": false,
        "properties": {
            "version": {"const": "1.1"},
            "method": {"type": "string", "minLength": 1},
            "params": {"type": ["array", "object"]},
            "id": {"type": ["string", "number", "null"]}
        }
    });
    jsonschema::validator_for(&schema).expect("request envelope schema is valid")
});

/// Structural check of a decoded request against the envelope schema.
pub fn validate_request(request: &Value) -> Result<(), SchemaViolation> {
    check(&REQUEST_SCHEMA, request)
}

/// Schemas for the built-in `system.*` methods.
pub(crate) static SYSTEM_SCHEMAS: Lazy<MethodSchemas> = Lazy::new(|| {
    let describe_result = json!({
        "type": "object",
        "required": ["sdversion", "name", "procs"],
        "properties": {
            "sdversion": {"type": "string"},
            "name": {"type": "string"},
            "procs": {"type": "array"}
        }
    });
    MethodSchemas::new()
        .no_params(SYSTEM_DESCRIBE)
        .result(SYSTEM_DESCRIBE, &describe_result)
        .expect("system schemas are valid")
});
