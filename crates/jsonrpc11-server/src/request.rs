use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::types::{JsonRpcVersion, RequestId, deserialize_present};

/// Parameters for a JSON-RPC request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(Map<String, Value>),
}

impl RequestParams {
    /// Get a parameter by name (object params only)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            RequestParams::Object(map) => map.get(key),
            RequestParams::Array(_) => None,
        }
    }

    /// Get a parameter by index (array params only)
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            RequestParams::Array(vec) => vec.get(index),
            RequestParams::Object(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RequestParams::Object(map) => map.len(),
            RequestParams::Array(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_value(&self) -> Value {
        match self {
            RequestParams::Object(map) => Value::Object(map.clone()),
            RequestParams::Array(arr) => Value::Array(arr.clone()),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            RequestParams::Object(map) => Value::Object(map),
            RequestParams::Array(arr) => Value::Array(arr),
        }
    }

    /// Deserialize into a typed value. Positional params map onto tuples or
    /// tuple structs, named params onto structs.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(self.to_value())
            .map_err(|e| ProtocolError::invalid_params(&e.to_string()))
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(vec: Vec<Value>) -> Self {
        RequestParams::Array(vec)
    }
}

/// A JSON-RPC 1.1 request. A request without an id is a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub version: JsonRpcVersion,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<RequestParams>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub id: Option<RequestId>,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self {
            version: JsonRpcVersion::V1_1,
            method: method.into(),
            params,
            id: Some(id),
        }
    }

    pub fn notification(method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self {
            version: JsonRpcVersion::V1_1,
            method: method.into(),
            params,
            id: None,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Get a parameter by name (if params are an object)
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref()?.get(name)
    }

    /// Get a parameter by index (if params are an array)
    pub fn get_param_index(&self, index: usize) -> Option<&Value> {
        self.params.as_ref()?.get_index(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsonRpcErrorCode;
    use serde_json::{from_value, json, to_value};

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new(RequestId::from(1), "test_method", None);
        assert_eq!(
            to_value(&request).unwrap(),
            json!({"version": "1.1", "method": "test_method", "id": 1})
        );

        let notification = JsonRpcRequest::notification("ping", None);
        assert_eq!(
            to_value(&notification).unwrap(),
            json!({"version": "1.1", "method": "ping"})
        );
    }

    #[test]
    fn test_explicit_null_id_is_present() {
        let request: JsonRpcRequest =
            from_value(json!({"version": "1.1", "method": "m", "id": null})).unwrap();
        assert_eq!(request.id, Some(RequestId::Null));
        assert!(!request.is_notification());

        let request: JsonRpcRequest = from_value(json!({"version": "1.1", "method": "m"})).unwrap();
        assert_eq!(request.id, None);
        assert!(request.is_notification());
    }

    #[test]
    fn test_request_with_object_params() {
        let request: JsonRpcRequest = from_value(json!({
            "version": "1.1",
            "method": "set_value",
            "params": {"name": "test", "value": 42},
            "id": "req1"
        }))
        .unwrap();

        assert_eq!(request.get_param("name"), Some(&json!("test")));
        assert_eq!(request.get_param("value"), Some(&json!(42)));
        assert_eq!(request.get_param("missing"), None);
        assert_eq!(request.get_param_index(0), None);
    }

    #[test]
    fn test_request_with_array_params() {
        let params = RequestParams::from(vec![json!("test"), json!(42), json!(true)]);
        let request = JsonRpcRequest::new(RequestId::from(2), "process", Some(params));

        assert_eq!(request.get_param_index(0), Some(&json!("test")));
        assert_eq!(request.get_param_index(2), Some(&json!(true)));
        assert_eq!(request.get_param_index(3), None);
    }

    #[test]
    fn test_scalar_params_are_rejected() {
        let result: Result<JsonRpcRequest, _> =
            from_value(json!({"version": "1.1", "method": "m", "params": 5}));
        assert!(result.is_err());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pair(f64, f64);

    #[derive(Debug, Deserialize, PartialEq)]
    struct Query {
        query: String,
    }

    #[test]
    fn test_parse_typed_params() {
        let positional = RequestParams::from(vec![json!(2), json!(3)]);
        assert_eq!(positional.parse::<Pair>().unwrap(), Pair(2.0, 3.0));

        let named: RequestParams = from_value(json!({"query": "milk"})).unwrap();
        assert_eq!(
            named.parse::<Query>().unwrap(),
            Query {
                query: "milk".to_string()
            }
        );

        let error = named.parse::<Pair>().unwrap_err();
        assert_eq!(error.kind, JsonRpcErrorCode::InvalidParams);
    }
}
