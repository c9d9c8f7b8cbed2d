//! JSON-RPC 1.0 wire frames and the inbound frame classifier
//!
//! OVSDB carries JSON-RPC 1.0: every request has `id`, `method`, and
//! `params`; every response has `id`, `result`, and `error`; all keys are
//! always present, with `null` standing in for absent values. The duplex
//! connection delivers both kinds on one stream, and the classifier here is
//! the single place that decides which engine sees a frame.
//!
//! Classification is by shape only, never by consulting the pending-call
//! table: the id spaces of our outbound calls and the server's inbound
//! requests are independent, so "do we have a call with this id" is not a
//! valid routing signal.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An outbound JSON-RPC 1.0 request.
///
/// `id` is never null on outbound requests; notifications are not emitted
/// by this client (OVSDB clients only ever answer, never notify).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Call id, a decimal-rendered counter value.
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Positional parameters.
    pub params: Vec<Value>,
}

/// An outbound JSON-RPC 1.0 response.
///
/// All three keys are serialized even when null, as JSON-RPC 1.0 requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// The id of the request being answered.
    pub id: Value,
    /// Result value, null on failure.
    pub result: Value,
    /// Error value, null on success.
    pub error: Value,
}

impl Response {
    /// Build a success response.
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            id,
            result,
            error: Value::Null,
        }
    }

    /// Build an error response carrying a string error.
    pub fn error(id: Value, error: impl Into<String>) -> Self {
        Self {
            id,
            result: Value::Null,
            error: Value::String(error.into()),
        }
    }
}

/// The shape of an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// `id`, `method`, and `params` keys all present: a request (non-null
    /// id) or notification (null id) from the server.
    Request,
    /// `id`, `result`, and `error` keys all present: a response to one of
    /// our calls.
    Response,
    /// Neither shape; the frame is logged and dropped.
    Invalid,
}

/// Classify a parsed inbound JSON value by key presence.
///
/// Values may be null; only the presence of keys matters. A frame carrying
/// all five keys classifies as a request, which OVSDB never sends in
/// practice.
pub fn classify(value: &Value) -> Frame {
    let Some(object) = value.as_object() else {
        return Frame::Invalid;
    };

    if object.contains_key("id") && object.contains_key("method") && object.contains_key("params")
    {
        Frame::Request
    } else if object.contains_key("id")
        && object.contains_key("result")
        && object.contains_key("error")
    {
        Frame::Response
    } else {
        Frame::Invalid
    }
}
