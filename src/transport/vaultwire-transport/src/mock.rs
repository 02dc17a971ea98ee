//! Scripted in-memory transport for tests.
//!
//! Records every call and answers with responses registered per operation
//! and path. Unscripted calls return `Ok(None)`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use vaultwire_mapper::Mapping;

use crate::{Envelope, Transport, TransportError};

/// Request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Read, with or without query parameters.
    Read,
    /// Write with a body.
    Write,
    /// List keys.
    List,
    /// Delete.
    Delete,
}

/// A recorded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Request kind.
    pub operation: Operation,
    /// Remote path.
    pub path: String,
    /// Query parameters (reads only).
    pub query: Vec<(String, String)>,
    /// Body (writes only).
    pub body: Option<Mapping>,
}

type Response = Result<Option<Envelope>, TransportError>;

/// Transport double that records calls and replays scripted responses.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<(Operation, String), Response>>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    /// Creates a mock with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the response for `operation` on `path`.
    pub fn respond(&self, operation: Operation, path: &str, response: Response) -> &Self {
        lock(&self.responses).insert((operation, path.to_string()), response);
        self
    }

    /// Scripts a successful response carrying `data`.
    ///
    /// # Panics
    ///
    /// Panics when `data` is not a JSON object.
    pub fn respond_data(&self, operation: Operation, path: &str, data: Value) -> &Self {
        let data = match data {
            Value::Object(map) => map,
            other => panic!("scripted data for {path} must be a JSON object, got {other}"),
        };
        self.respond(operation, path, Ok(Some(Envelope::new(data))))
    }

    /// Scripts a successful response with a full envelope.
    pub fn respond_envelope(&self, operation: Operation, path: &str, envelope: Envelope) -> &Self {
        self.respond(operation, path, Ok(Some(envelope)))
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// The most recent call.
    pub fn last_call(&self) -> Option<Call> {
        lock(&self.calls).last().cloned()
    }

    fn answer(
        &self,
        operation: Operation,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Mapping>,
    ) -> Response {
        lock(&self.calls).push(Call {
            operation,
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body,
        });
        lock(&self.responses)
            .get(&(operation, path.to_string()))
            .cloned()
            .unwrap_or(Ok(None))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Transport for MockTransport {
    async fn read(&self, path: &str) -> Response {
        self.answer(Operation::Read, path, &[], None)
    }

    async fn read_with_query(&self, path: &str, query: &[(&str, &str)]) -> Response {
        self.answer(Operation::Read, path, query, None)
    }

    async fn write(&self, path: &str, data: Mapping) -> Response {
        self.answer(Operation::Write, path, &[], Some(data))
    }

    async fn list(&self, path: &str) -> Response {
        self.answer(Operation::List, path, &[], None)
    }

    async fn delete(&self, path: &str) -> Response {
        self.answer(Operation::Delete, path, &[], None)
    }
}
