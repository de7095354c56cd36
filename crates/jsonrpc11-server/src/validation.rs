//! Validation capability consulted by the service for method params and results.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// A payload that does not conform to its schema.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message} (at '{path}')")]
pub struct SchemaViolation {
    pub message: String,
    /// JSON pointer to the offending part of the payload
    pub path: String,
    pub value: Value,
}

impl SchemaViolation {
    pub fn new(message: impl Into<String>, path: impl Into<String>, value: Value) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
            value,
        }
    }

    /// The structured data attached to error objects.
    pub fn to_data(&self) -> Value {
        json!({
            "message": self.message,
            "path": self.path,
            "value": self.value,
        })
    }
}

/// What a method declares for its params or its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A value is expected and validated against a schema
    Expected,
    /// No value may be supplied
    Absent,
    /// Nothing declared
    Undeclared,
}

/// Per-method schema lookup and validation.
///
/// Implementations are shared between concurrent calls and must not rely on
/// interior mutability for validation.
pub trait Validation: Send + Sync {
    fn has_params_schema(&self, method: &str) -> bool;

    fn has_absent_params_schema(&self, method: &str) -> bool;

    fn validate_params(&self, method: &str, params: &Value) -> Result<(), SchemaViolation>;

    fn has_result_schema(&self, method: &str) -> bool;

    fn has_absent_result_schema(&self, method: &str) -> bool;

    fn validate_result(&self, method: &str, result: &Value) -> Result<(), SchemaViolation>;

    fn params_role(&self, method: &str) -> Role {
        if self.has_params_schema(method) {
            Role::Expected
        } else if self.has_absent_params_schema(method) {
            Role::Absent
        } else {
            Role::Undeclared
        }
    }

    fn result_role(&self, method: &str) -> Role {
        if self.has_result_schema(method) {
            Role::Expected
        } else if self.has_absent_result_schema(method) {
            Role::Absent
        } else {
            Role::Undeclared
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ParamsOnly;

    impl Validation for ParamsOnly {
        fn has_params_schema(&self, method: &str) -> bool {
            method == "echo"
        }

        fn has_absent_params_schema(&self, method: &str) -> bool {
            method == "ping"
        }

        fn validate_params(&self, _method: &str, _params: &Value) -> Result<(), SchemaViolation> {
            Ok(())
        }

        fn has_result_schema(&self, _method: &str) -> bool {
            false
        }

        fn has_absent_result_schema(&self, _method: &str) -> bool {
            false
        }

        fn validate_result(&self, _method: &str, _result: &Value) -> Result<(), SchemaViolation> {
            Ok(())
        }
    }

    #[test]
    fn test_roles_follow_declarations() {
        let validation = ParamsOnly;
        assert_eq!(validation.params_role("echo"), Role::Expected);
        assert_eq!(validation.params_role("ping"), Role::Absent);
        assert_eq!(validation.params_role("other"), Role::Undeclared);
        assert_eq!(validation.result_role("echo"), Role::Undeclared);
    }

    #[test]
    fn test_violation_data() {
        let violation = SchemaViolation::new("1 is not of type \"string\"", "/0", json!(1));
        assert_eq!(
            violation.to_data(),
            json!({"message": "1 is not of type \"string\"", "path": "/0", "value": 1})
        );
        assert_eq!(violation.to_string(), "1 is not of type \"string\" (at '/0')");
    }
}
