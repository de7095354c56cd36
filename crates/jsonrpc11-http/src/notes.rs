//! Demo service: a shared, in-memory notebook.
//!
//! | method   | params                      | result                        |
//! |----------|-----------------------------|-------------------------------|
//! | `new`    | `[text]` or `{"notification"}` | id of the stored note      |
//! | `get`    | `[id]` or `{"id"}`          | the note text                 |
//! | `search` | `[query]` or `{"query"}`    | `[{"id", "notification"}]`    |
//!
//! Unknown ids raise application error 100.

use std::collections::BTreeMap;
use std::sync::Arc;

use jsonrpc11_server::prelude::*;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::Result;
use crate::server::HttpContext;

/// Application error raised by `get` for an unknown id
pub const NOTE_NOT_FOUND: i64 = 100;

#[derive(Debug, Default)]
struct Notebook {
    next_id: i64,
    notes: BTreeMap<i64, String>,
}

/// Notes shared by every call of one service.
#[derive(Debug, Default)]
pub struct NoteStore {
    inner: Mutex<Notebook>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, text: impl Into<String>) -> i64 {
        let mut book = self.inner.lock();
        book.next_id += 1;
        let id = book.next_id;
        book.notes.insert(id, text.into());
        id
    }

    pub fn get(&self, id: i64) -> Option<String> {
        self.inner.lock().notes.get(&id).cloned()
    }

    /// Notes containing `query`, in id order.
    pub fn search(&self, query: &str) -> Vec<(i64, String)> {
        self.inner
            .lock()
            .notes
            .iter()
            .filter(|(_, text)| text.contains(query))
            .map(|(id, text)| (*id, text.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fetch one argument, by position or by name.
fn argument<T: DeserializeOwned>(
    params: Option<&RequestParams>,
    index: usize,
    name: &str,
) -> std::result::Result<T, ProtocolError> {
    let value = match params {
        Some(RequestParams::Array(values)) => values.get(index),
        Some(RequestParams::Object(map)) => map.get(name),
        None => None,
    }
    .ok_or_else(|| ProtocolError::invalid_params(&format!("Missing parameter '{}'", name)))?;

    serde_json::from_value(value.clone()).map_err(|err| {
        ProtocolError::invalid_params(&format!("Invalid parameter '{}': {}", name, err))
    })
}

/// Build the notes service over `store`.
///
/// `schemas`, when given, turns on params validation; `validate_result`
/// additionally checks every result against it.
pub fn notes_service(
    store: Arc<NoteStore>,
    schemas: Option<MethodSchemas>,
    validate_result: bool,
) -> Result<JsonRpcService<HttpContext>> {
    let mut builder = JsonRpcService::builder()
        .description(
            ServiceDescription::new("notes")
                .version(env!("CARGO_PKG_VERSION"))
                .summary("Stores and searches short notes"),
        )
        .validate_result(validate_result);
    if let Some(schemas) = schemas {
        builder = builder.validation(Arc::new(schemas));
    }

    let notes = Arc::clone(&store);
    builder.add(
        "new",
        move |params: Option<RequestParams>, ctx: &HttpContext| -> MethodResult<Value> {
            let text: String = argument(params.as_ref(), 0, "notification")?;
            let id = notes.add(text);
            debug!("Stored note {} for {}", id, ctx.peer_addr);
            Ok(json!(id))
        },
    )?;

    let notes = Arc::clone(&store);
    builder.add(
        "get",
        move |params: Option<RequestParams>, _ctx: &HttpContext| -> MethodResult<Value> {
            let id: i64 = argument(params.as_ref(), 0, "id")?;
            notes.get(id).map(Value::String).ok_or_else(|| {
                ApiError::new(NOTE_NOT_FOUND, format!("Notification not found with id {}", id))
                    .into()
            })
        },
    )?;

    let notes = store;
    builder.add(
        "search",
        move |params: Option<RequestParams>, _ctx: &HttpContext| -> MethodResult<Value> {
            let query: String = argument(params.as_ref(), 0, "query")?;
            let found: Vec<Value> = notes
                .search(&query)
                .into_iter()
                .map(|(id, text)| json!({"id": id, "notification": text}))
                .collect();
            Ok(Value::Array(found))
        },
    )?;

    Ok(builder.build())
}
