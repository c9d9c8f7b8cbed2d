//! JSON-RPC 1.0 server engine for inbound requests and notifications
//!
//! OVSDB servers send the client requests (`echo`) and notifications
//! (`update`, `locked`, `stolen`) over the same connection the client calls
//! out on. [`RpcServer`] holds the registry of named handlers and answers
//! request frames; notification frames (null `id`) never produce a reply,
//! whatever the handler outcome.
//!
//! Handlers receive the positional `params` array and return an optional
//! result value: `Some` emits a success response (when the frame had a
//! non-null id), `None` is the void shape and emits nothing. A handler
//! failure is a plain string, which becomes the `error` member of the reply
//! per JSON-RPC 1.0.

use std::collections::HashMap;
use std::pin::Pin;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

use crate::rpc::frame::Response;

/// Convenience alias for a boxed, `Send`-safe async future.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// What a handler produced: a result value, the void shape, or an error
/// string destined for the `error` member of the reply.
pub type HandlerOutcome = std::result::Result<Option<Value>, String>;

/// An inbound handler: called with the positional `params` array.
type InboundHandler = Box<dyn Fn(Vec<Value>) -> BoxFuture<'static, HandlerOutcome> + Send + Sync>;

/// JSON-RPC 1.0 server engine.
pub struct RpcServer {
    /// Registered handlers, keyed by method name.
    handlers: Mutex<HashMap<String, InboundHandler>>,
    /// Channel used to hand reply frames to the transport writer.
    outbound_tx: mpsc::UnboundedSender<String>,
}

impl std::fmt::Debug for RpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer").finish_non_exhaustive()
    }
}

impl RpcServer {
    /// Create a new engine that emits replies on `outbound_tx`.
    pub fn new(outbound_tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            outbound_tx,
        }
    }

    /// Register a handler for a method name.
    ///
    /// Registering a second handler for the same method replaces the first.
    pub async fn register(
        &self,
        method: impl Into<String>,
        handler: impl Fn(Vec<Value>) -> BoxFuture<'static, HandlerOutcome> + Send + Sync + 'static,
    ) {
        self.handlers
            .lock()
            .await
            .insert(method.into(), Box::new(handler));
    }

    /// Dispatch one inbound request or notification frame.
    ///
    /// A frame with a non-null `id` is a request: the handler outcome is
    /// reported back as `{id, result, error: null}` or `{id, result: null,
    /// error: <string>}`, with an unknown method answered the same way a
    /// failed handler is. A frame with a null `id` is a notification and no
    /// reply is emitted regardless of outcome; failures are only logged.
    pub async fn handle_request(&self, value: &Value) {
        let Some(method) = value.get("method").and_then(|m| m.as_str()).map(String::from) else {
            tracing::warn!("request frame with non-string method; dropping: {value}");
            return;
        };
        let id = value.get("id").cloned().unwrap_or(Value::Null);

        let Some(params) = value.get("params").and_then(|p| p.as_array()).cloned() else {
            tracing::warn!(method = %method, "request frame params is not an array; dropping");
            if !id.is_null() {
                self.respond(Response::error(id, "params must be an array"));
            }
            return;
        };

        // Create the future while the lock is held, then release it before
        // awaiting so a handler can call back into the engine.
        let future = {
            let handlers = self.handlers.lock().await;
            handlers.get(&method).map(|h| h(params))
        };

        let outcome = match future {
            Some(future) => future.await,
            None => Err(format!("unknown method: {method}")),
        };

        if id.is_null() {
            if let Err(message) = outcome {
                tracing::warn!(method = %method, "notification handler failed: {message}");
            }
            return;
        }

        match outcome {
            Ok(Some(result)) => self.respond(Response::result(id, result)),
            // Void result shape: nothing to report.
            Ok(None) => {}
            Err(message) => self.respond(Response::error(id, message)),
        }
    }

    /// Drop the handler registry. Idempotent.
    pub async fn shutdown(&self) {
        self.handlers.lock().await.clear();
    }

    fn respond(&self, response: Response) {
        match serde_json::to_string(&response) {
            Ok(serialized) => {
                if self.outbound_tx.send(serialized).is_err() {
                    tracing::error!("failed to send reply: outbound channel closed");
                }
            }
            Err(e) => tracing::error!("failed to serialize reply: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn wired() -> (RpcServer, mpsc::UnboundedReceiver<String>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        (RpcServer::new(out_tx), out_rx)
    }

    async fn recv_reply(rx: &mut mpsc::UnboundedReceiver<String>) -> Value {
        let raw = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for reply")
            .expect("outbound channel closed");
        serde_json::from_str(&raw).expect("invalid JSON in reply")
    }

    async fn register_echo(server: &RpcServer) {
        server
            .register("echo", |params| {
                Box::pin(async move { Ok(Some(Value::Array(params))) })
            })
            .await;
    }

    #[tokio::test]
    async fn test_request_gets_result_reply() {
        let (server, mut out_rx) = wired();
        register_echo(&server).await;

        server
            .handle_request(&json!({ "id": "x", "method": "echo", "params": [1, "two"] }))
            .await;

        let reply = recv_reply(&mut out_rx).await;
        assert_eq!(reply, json!({ "id": "x", "result": [1, "two"], "error": null }));
    }

    #[tokio::test]
    async fn test_notification_gets_no_reply() {
        let (server, mut out_rx) = wired();
        register_echo(&server).await;

        server
            .handle_request(&json!({ "id": null, "method": "echo", "params": [] }))
            .await;

        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_method_request_gets_error_reply() {
        let (server, mut out_rx) = wired();

        server
            .handle_request(&json!({ "id": "7", "method": "bogus", "params": [] }))
            .await;

        let reply = recv_reply(&mut out_rx).await;
        assert_eq!(reply["id"], "7");
        assert_eq!(reply["result"], Value::Null);
        assert!(reply["error"].as_str().unwrap().contains("bogus"));
    }

    #[tokio::test]
    async fn test_unknown_notification_is_silent() {
        let (server, mut out_rx) = wired();

        server
            .handle_request(&json!({ "id": null, "method": "bogus", "params": [] }))
            .await;

        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_handler_failure_becomes_error_member() {
        let (server, mut out_rx) = wired();
        server
            .register("fail", |_params| {
                Box::pin(async move { Err("handler exploded".to_string()) })
            })
            .await;

        server
            .handle_request(&json!({ "id": "9", "method": "fail", "params": [] }))
            .await;

        let reply = recv_reply(&mut out_rx).await;
        assert_eq!(reply["error"], "handler exploded");
        assert_eq!(reply["result"], Value::Null);
    }

    #[tokio::test]
    async fn test_void_result_emits_nothing_even_for_request() {
        let (server, mut out_rx) = wired();
        server
            .register("void", |_params| Box::pin(async move { Ok(None) }))
            .await;

        server
            .handle_request(&json!({ "id": "3", "method": "void", "params": [] }))
            .await;

        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_non_array_params_request_gets_error_reply() {
        let (server, mut out_rx) = wired();
        register_echo(&server).await;

        server
            .handle_request(&json!({ "id": "4", "method": "echo", "params": {"a": 1} }))
            .await;

        let reply = recv_reply(&mut out_rx).await;
        assert!(reply["error"].as_str().unwrap().contains("array"));
    }

    #[tokio::test]
    async fn test_replacing_handler_uses_latest() {
        let (server, mut out_rx) = wired();
        server
            .register("m", |_| Box::pin(async move { Ok(Some(json!("first"))) }))
            .await;
        server
            .register("m", |_| Box::pin(async move { Ok(Some(json!("second"))) }))
            .await;

        server
            .handle_request(&json!({ "id": "1", "method": "m", "params": [] }))
            .await;

        let reply = recv_reply(&mut out_rx).await;
        assert_eq!(reply["result"], "second");
    }

    #[tokio::test]
    async fn test_shutdown_drops_registry() {
        let (server, mut out_rx) = wired();
        register_echo(&server).await;
        server.shutdown().await;
        server.shutdown().await;

        server
            .handle_request(&json!({ "id": "1", "method": "echo", "params": [] }))
            .await;

        let reply = recv_reply(&mut out_rx).await;
        assert!(reply["error"].as_str().unwrap().contains("unknown method"));
    }
}
