//! Inbound frame dispatch loop
//!
//! Both engines share one connection and one inbound frame stream. The loop
//! here is the only consumer of that stream: it parses each frame,
//! classifies it by shape (see [`crate::rpc::frame`]), and routes it to the
//! client engine (responses) or the server engine (requests and
//! notifications). Unclassifiable frames are logged and dropped, never
//! surfaced to callers.
//!
//! The loop runs as its own task, so handler and callback execution never
//! blocks the socket reader feeding `inbound_rx`. Because it is a single
//! task consuming a single queue, deliveries for a given monitor keep their
//! wire arrival order.
//!
//! On cancellation, or when the inbound channel closes (transport
//! disconnect), every pending call is failed with a shutdown error; a
//! disconnect additionally cancels the shared token so the connection
//! lifecycle observes it.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::rpc::client::RpcClient;
use crate::rpc::frame::{self, Frame};
use crate::rpc::server::RpcServer;

/// Start the dispatch loop as a background Tokio task.
///
/// # Arguments
///
/// * `inbound_rx` - Receiver of serialized inbound frames from the transport.
/// * `cancel` - Lifecycle token; cancelled externally on shutdown, and by
///   the loop itself when the inbound channel closes.
/// * `client` - Client engine receiving response frames.
/// * `server` - Server engine receiving request/notification frames.
pub fn start_dispatch_loop(
    mut inbound_rx: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
    client: Arc<RpcClient>,
    server: Arc<RpcServer>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    client.shutdown().await;
                    break;
                }

                maybe_frame = inbound_rx.recv() => {
                    let Some(raw) = maybe_frame else {
                        // The transport reader hung up: disconnect.
                        client.shutdown().await;
                        cancel.cancel();
                        break;
                    };
                    dispatch_frame(&raw, &client, &server).await;
                }
            }
        }
    })
}

/// Parse, classify, and route one inbound frame.
async fn dispatch_frame(raw: &str, client: &RpcClient, server: &RpcServer) {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("failed to parse inbound frame: {e}");
            return;
        }
    };

    match frame::classify(&value) {
        Frame::Response => client.handle_response(&value).await,
        Frame::Request => server.handle_request(&value).await,
        Frame::Invalid => tracing::warn!("unclassifiable inbound frame; dropping: {value}"),
    }
}
