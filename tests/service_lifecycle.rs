//! End-to-end request lifecycle: parsing, structural validation, method
//! resolution, ids and notifications.

use jsonrpc11_server::prelude::*;
use jsonrpc11_server::SYSTEM_DESCRIBE;
use serde_json::{Value, json};

fn add(params: Option<RequestParams>, _options: &()) -> MethodResult<Value> {
    let (a, b): (i64, i64) = params
        .ok_or_else(|| ProtocolError::invalid_params("add takes two numbers"))?
        .parse()?;
    Ok(json!(a + b))
}

fn calculator() -> JsonRpcService {
    JsonRpcService::builder()
        .method("add", add)
        .unwrap()
        .build()
}

fn call(service: &JsonRpcService, body: &str) -> Value {
    let reply = service
        .call_str(body, &())
        .expect("request should be answered");
    serde_json::from_str(&reply).unwrap()
}

#[test]
fn test_add_round_trip_is_exact() {
    let service = calculator();
    let reply = service.call_str(r#"{"version":"1.1","method":"add","params":[2,3],"id":1}"#, &());
    assert_eq!(reply.as_deref(), Some(r#"{"version":"1.1","result":5,"id":1}"#));
}

#[test]
fn test_bytes_interface_matches_string_interface() {
    let service = calculator();
    let body = r#"{"version":"1.1","method":"add","params":[20,22],"id":"abc"}"#;
    let bytes = service.call(body.as_bytes(), &()).unwrap();
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        service.call_str(body, &()).unwrap()
    );
}

#[test]
fn test_named_params_reach_the_handler() {
    let service = JsonRpcService::builder()
        .method_fn(
            "greet",
            |params: Option<RequestParams>, _options: &()| -> MethodResult<Value> {
                let name = params
                    .as_ref()
                    .and_then(|p| p.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or("nobody")
                    .to_string();
                Ok(json!(format!("hello {}", name)))
            },
        )
        .unwrap()
        .build();

    let reply = call(
        &service,
        r#"{"version":"1.1","method":"greet","params":{"name":"ada"},"id":1}"#,
    );
    assert_eq!(reply["result"], json!("hello ada"));
}

#[test]
fn test_notification_gets_no_response() {
    let service = calculator();
    assert_eq!(
        service.call_str(r#"{"version":"1.1","method":"add","params":[1,1]}"#, &()),
        None
    );
}

#[test]
fn test_failed_notification_is_still_reported() {
    let service = calculator();
    let reply = call(&service, r#"{"version":"1.1","method":"nope"}"#);
    assert_eq!(reply["error"]["code"], json!(-32601));
    assert!(reply.get("id").is_none());
}

#[test]
fn test_explicit_null_id_is_echoed() {
    let service = calculator();
    let reply = service.call_str(r#"{"version":"1.1","method":"add","params":[1,2],"id":null}"#, &());
    assert_eq!(reply.as_deref(), Some(r#"{"version":"1.1","result":3,"id":null}"#));
}

#[test]
fn test_parse_error_has_no_id() {
    let service = calculator();
    let reply = call(&service, r#"{"version":"1.1","method":"add","id":1"#);
    assert_eq!(reply["version"], json!("1.1"));
    assert_eq!(reply["error"]["name"], json!("JSONRPCError"));
    assert_eq!(reply["error"]["code"], json!(-32700));
    assert_eq!(reply["error"]["message"], json!("Parse error"));
    assert!(reply.get("id").is_none());
    assert!(reply.get("result").is_none());
}

#[test]
fn test_invalid_request_echoes_id() {
    let service = calculator();

    // Missing method
    let reply = call(&service, r#"{"version":"1.1","id":7}"#);
    assert_eq!(reply["error"]["code"], json!(-32600));
    assert_eq!(reply["id"], json!(7));

    // Wrong version, malformed id still echoed verbatim
    let reply = call(&service, r#"{"version":"2.0","method":"add","id":{"weird":true}}"#);
    assert_eq!(reply["error"]["code"], json!(-32600));
    assert_eq!(reply["id"], json!({"weird": true}));

    // Unknown member
    let reply = call(&service, r#"{"version":"1.1","method":"add","extra":1,"id":null}"#);
    assert_eq!(reply["error"]["code"], json!(-32600));
    assert_eq!(reply["id"], Value::Null);
    assert!(reply.as_object().unwrap().contains_key("id"));
}

#[test]
fn test_non_object_request_is_invalid_without_id() {
    let service = calculator();
    for body in [r#"[1,2,3]"#, r#""add""#, "42", "null"] {
        let reply = call(&service, body);
        assert_eq!(reply["error"]["code"], json!(-32600), "body: {}", body);
        assert!(reply.get("id").is_none(), "body: {}", body);
    }
}

#[test]
fn test_scalar_params_are_invalid_request() {
    let service = calculator();
    let reply = call(&service, r#"{"version":"1.1","method":"add","params":5,"id":3}"#);
    assert_eq!(reply["error"]["code"], json!(-32600));
    assert_eq!(reply["id"], json!(3));
}

#[test]
fn test_method_not_found_lists_methods() {
    let service = calculator();
    let reply = call(&service, r#"{"version":"1.1","method":"missing","id":2}"#);
    assert_eq!(reply["id"], json!(2));
    assert_eq!(
        reply["error"],
        json!({
            "name": "JSONRPCError",
            "code": -32601,
            "message": "Method not found",
            "error": {
                "method": "missing",
                "available_methods": ["add", "system.describe"]
            }
        })
    );
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let builder = JsonRpcService::<()>::builder().method("add", add).unwrap();
    match builder.method("add", add) {
        Err(RegistryError::DuplicateMethodName(name)) => assert_eq!(name, "add"),
        Err(other) => panic!("unexpected registration error: {other}"),
        Ok(_) => panic!("second registration of 'add' should fail"),
    }

    match JsonRpcService::<()>::builder().method(SYSTEM_DESCRIBE, add) {
        Err(RegistryError::DuplicateMethodName(name)) => assert_eq!(name, SYSTEM_DESCRIBE),
        Err(other) => panic!("unexpected registration error: {other}"),
        Ok(_) => panic!("system.describe is pre-registered"),
    }
}

#[test]
fn test_system_namespace_registration_is_rejected() {
    let ping = |_params: Option<RequestParams>, _options: &()| -> MethodResult<Value> {
        Ok(json!("pong"))
    };
    match JsonRpcService::<()>::builder().method_fn("system.ping", ping) {
        Err(RegistryError::ReservedMethodName(name)) => assert_eq!(name, "system.ping"),
        Err(other) => panic!("unexpected registration error: {other}"),
        Ok(_) => panic!("the system. namespace is reserved"),
    }

    let mut builder = JsonRpcService::<()>::builder();
    assert_eq!(
        builder.add("system.ping", ping).unwrap_err(),
        RegistryError::ReservedMethodName("system.ping".to_string())
    );
    let service = builder.build();
    assert_eq!(service.method_names(), vec!["system.describe"]);

    let reply: Value = serde_json::from_str(
        &service
            .call_str(r#"{"version":"1.1","method":"system.ping","id":1}"#, &())
            .unwrap(),
    )
    .unwrap();
    assert_eq!(reply["error"]["code"], json!(-32601));
}

#[test]
fn test_in_place_registration() {
    let mut builder = JsonRpcService::<()>::builder();
    builder.add("add", add).unwrap();
    assert!(builder.add("add", add).is_err());
    let service = builder.build();
    assert_eq!(service.method_names(), vec!["add", "system.describe"]);
}

#[test]
fn test_describe_is_stable() {
    let service = JsonRpcService::builder()
        .description(
            ServiceDescription::new("calculator")
                .version("2.0.1")
                .summary("Adds numbers"),
        )
        .method("add", add)
        .unwrap()
        .build();

    let body = r#"{"version":"1.1","method":"system.describe","id":1}"#;
    let first = service.call_str(body, &()).unwrap();
    let second = service.call_str(body, &()).unwrap();
    assert_eq!(first, second);

    let reply: Value = serde_json::from_str(&first).unwrap();
    assert_eq!(
        reply["result"],
        json!({
            "sdversion": "1.0",
            "name": "calculator",
            "id": "urn:jsonrpc11:calculator",
            "version": "2.0.1",
            "summary": "Adds numbers",
            "procs": [
                {"name": "add", "params": "undeclared", "result": "undeclared"},
                {"name": "system.describe", "params": "absent", "result": "expected"}
            ]
        })
    );
}

#[test]
fn test_describe_rejects_params() {
    let service = calculator();
    for body in [
        r#"{"version":"1.1","method":"system.describe","params":[],"id":1}"#,
        r#"{"version":"1.1","method":"system.describe","params":{"x":1},"id":1}"#,
    ] {
        let reply = call(&service, body);
        assert_eq!(reply["error"]["code"], json!(-32602), "body: {}", body);
        assert_eq!(reply["error"]["error"]["method"], json!("system.describe"));
    }
}

#[test]
fn test_service_is_shared_between_threads() {
    let service = std::sync::Arc::new(calculator());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = std::sync::Arc::clone(&service);
            std::thread::spawn(move || {
                let body = format!(
                    r#"{{"version":"1.1","method":"add","params":[{},1],"id":{}}}"#,
                    i, i
                );
                service.call_str(&body, &()).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(
            handle.join().unwrap(),
            format!(r#"{{"version":"1.1","result":{},"id":{}}}"#, i + 1, i)
        );
    }
}
