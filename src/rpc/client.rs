//! JSON-RPC 1.0 client engine
//!
//! [`RpcClient`] emits requests and correlates late-arriving responses with
//! their callers. In-flight calls are tracked in a pending table keyed by
//! the string call id; each entry holds a [`oneshot::Sender`] that receives
//! the `result` or `error` value when the matching response arrives.
//!
//! # Design
//!
//! - Call ids come from a monotonic `u64` counter rendered in decimal, so an
//!   id is never reused while its call is live (or ever, within a process).
//! - The pending entry is registered before the request is sent, so a
//!   response can never arrive before the engine is ready to receive it.
//! - Exactly one of {response, timeout, shutdown} resolves a call: response
//!   and timeout both remove the entry before completing the caller, and
//!   shutdown closes the table so no new entry can be added while it drains
//!   the existing ones.
//! - A response for an unknown id (late after timeout, duplicate, or simply
//!   bogus) is dropped with a log entry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::error::{OvsdbError, Result};
use crate::rpc::frame::Request;

/// Raw outcome of one call: the `result` value, or the `error` payload.
type CallOutcome = std::result::Result<Value, Value>;

/// The pending-call table. `open` is flipped once, by `shutdown`, under the
/// same lock that guards insertion, which closes the add-while-draining race.
struct PendingTable {
    open: bool,
    waiters: HashMap<String, oneshot::Sender<CallOutcome>>,
}

/// JSON-RPC 1.0 client engine.
///
/// Create one with [`RpcClient::new`], passing the outbound channel sender
/// and the configured RPC timeout. The dispatch loop feeds inbound response
/// frames to [`RpcClient::handle_response`].
pub struct RpcClient {
    /// Monotonically increasing call id counter.
    next_id: AtomicU64,
    /// In-flight calls waiting for a response.
    pending: Arc<Mutex<PendingTable>>,
    /// Channel used to hand serialized frames to the transport writer.
    outbound_tx: mpsc::UnboundedSender<String>,
    /// How long a call may wait for its response.
    rpc_timeout: Duration,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("rpc_timeout", &self.rpc_timeout)
            .finish_non_exhaustive()
    }
}

impl RpcClient {
    /// Create a new engine.
    ///
    /// # Arguments
    ///
    /// * `outbound_tx` - Sender half of the outbound frame channel; the
    ///   transport writer drains the other half.
    /// * `rpc_timeout` - Timeout applied to every call.
    pub fn new(outbound_tx: mpsc::UnboundedSender<String>, rpc_timeout: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(0),
            pending: Arc::new(Mutex::new(PendingTable {
                open: true,
                waiters: HashMap::new(),
            })),
            outbound_tx,
            rpc_timeout,
        }
    }

    /// Issue a call and await its typed result.
    ///
    /// Allocates the next call id, registers the pending entry, sends the
    /// request, and waits for the correlated response.
    ///
    /// # Errors
    ///
    /// - [`OvsdbError::Shutdown`] if the engine was shut down before or
    ///   while the call was pending.
    /// - [`OvsdbError::Transport`] if the outbound channel is closed; the
    ///   pending entry is removed before the error propagates.
    /// - [`OvsdbError::Timeout`] if no response arrives in time; a response
    ///   arriving afterwards is dropped.
    /// - [`OvsdbError::Rpc`] if the server answered with a non-null `error`.
    /// - [`OvsdbError::Serialization`] if the `result` does not decode into
    ///   `R`.
    pub async fn call<R>(&self, method: &str, params: Vec<Value>) -> Result<R>
    where
        R: serde::de::DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if !pending.open {
                return Err(OvsdbError::Shutdown.into());
            }
            pending.waiters.insert(id.clone(), tx);
        }

        let message = serde_json::to_string(&Request {
            id: Value::String(id.clone()),
            method: method.to_string(),
            params,
        })
        .map_err(OvsdbError::Serialization)?;

        tracing::trace!(method, id = %id, "sending rpc request");
        if self.outbound_tx.send(message).is_err() {
            self.pending.lock().await.waiters.remove(&id);
            return Err(OvsdbError::Transport("outbound channel closed".to_string()).into());
        }

        let outcome = match tokio::time::timeout(self.rpc_timeout, rx).await {
            Err(_elapsed) => {
                // Remove the entry so a late response is dropped, not
                // delivered to a caller that already gave up.
                self.pending.lock().await.waiters.remove(&id);
                return Err(OvsdbError::Timeout {
                    method: method.to_string(),
                }
                .into());
            }
            // The sender was dropped without a value: the table was drained
            // by shutdown.
            Ok(Err(_closed)) => return Err(OvsdbError::Shutdown.into()),
            Ok(Ok(outcome)) => outcome,
        };

        let value = outcome.map_err(OvsdbError::Rpc)?;
        serde_json::from_value(value).map_err(|e| OvsdbError::Serialization(e).into())
    }

    /// Resolve the pending call named by an inbound response frame.
    ///
    /// A response whose id is unknown is dropped with a log entry. JSON-RPC
    /// 1.0 forbids `result` and `error` both non-null; if a server sends
    /// such a frame anyway, the error wins.
    pub async fn handle_response(&self, value: &Value) {
        let Some(id) = response_id(value) else {
            tracing::warn!("response frame with unusable id: {value}");
            return;
        };

        let waiter = {
            let mut pending = self.pending.lock().await;
            pending.waiters.remove(&id)
        };
        let Some(waiter) = waiter else {
            tracing::debug!(id = %id, "response for unknown call id; dropping");
            return;
        };

        let error = value.get("error").cloned().unwrap_or(Value::Null);
        let outcome = if error.is_null() {
            Ok(value.get("result").cloned().unwrap_or(Value::Null))
        } else {
            Err(error)
        };

        // The caller may have vanished between removal and delivery; that is
        // its problem, not ours.
        let _ = waiter.send(outcome);
    }

    /// Fail every in-flight call with a shutdown error and refuse new ones.
    ///
    /// Idempotent: a second call finds the table already closed and empty.
    pub async fn shutdown(&self) {
        let mut pending = self.pending.lock().await;
        pending.open = false;
        // Dropping the senders completes every waiter with a closed-channel
        // error, which `call` surfaces as `OvsdbError::Shutdown`.
        pending.waiters.clear();
    }

    /// Whether a call id currently has a pending entry.
    #[cfg(test)]
    pub(crate) async fn has_pending(&self, id: &str) -> bool {
        self.pending.lock().await.waiters.contains_key(id)
    }
}

/// Extract a response id as the canonical string form.
///
/// OVSDB echoes our string ids back verbatim; integer ids are accepted for
/// tolerance and normalised to their decimal rendering.
fn response_id(value: &Value) -> Option<String> {
    match value.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
