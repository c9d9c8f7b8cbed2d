//! In-process fake transport for unit tests
//!
//! [`FakeTransport`] and [`FakeTransportHandle`] form an in-process pair
//! that replaces real network I/O in tests. Wire the [`FakeTransport`] into
//! the code under test; from the test side, use the handle to:
//!
//! - Read what the client sent: `handle.outbound_rx.recv().await`
//! - Inject server frames: `handle.inbound_tx.send(json_string)`
//!
//! Dropping `handle.inbound_tx` simulates a peer disconnect: the client's
//! receive stream ends, exactly as it does when a socket reaches EOF.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{OvsdbError, Result};
use crate::transport::Transport;

/// In-process fake transport for use in tests.
#[derive(Debug)]
pub struct FakeTransport {
    /// What the client writes goes here; the handle drains it.
    outbound_tx: mpsc::UnboundedSender<String>,
    /// Populated by the handle's `inbound_tx`; exposed via `receive()`.
    ///
    /// The transport deliberately holds no sender for this channel:
    /// dropping the handle is how a test simulates a peer disconnect.
    inbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    /// Flipped by `close()`; subsequent sends fail.
    closed: CancellationToken,
}

/// The test-side handle for a [`FakeTransport`].
#[derive(Debug)]
pub struct FakeTransportHandle {
    /// Receives frames the client sent via [`Transport::send`].
    pub outbound_rx: mpsc::UnboundedReceiver<String>,
    /// Sends server frames into the client's [`Transport::receive`] stream.
    pub inbound_tx: mpsc::UnboundedSender<String>,
}

impl FakeTransport {
    /// Create a new `(FakeTransport, FakeTransportHandle)` pair.
    pub fn new() -> (Self, FakeTransportHandle) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        let transport = Self {
            outbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            closed: CancellationToken::new(),
        };
        let handle = FakeTransportHandle {
            outbound_rx,
            inbound_tx,
        };
        (transport, handle)
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, message: String) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(OvsdbError::Transport("fake transport closed".to_string()).into());
        }
        self.outbound_tx.send(message).map_err(|_| {
            OvsdbError::Transport("fake transport outbound channel closed".to_string()).into()
        })
    }

    async fn close(&self) -> Result<()> {
        self.closed.cancel();
        Ok(())
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        let rx = Arc::clone(&self.inbound_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let item = {
                let mut guard = rx.lock().await;
                guard.recv().await
            };
            item.map(|frame| (frame, rx))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_delivers_to_handle() {
        let (transport, mut handle) = FakeTransport::new();

        transport
            .send(r#"{"id":"0","method":"echo","params":[]}"#.to_string())
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), handle.outbound_rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        assert_eq!(received, r#"{"id":"0","method":"echo","params":[]}"#);
    }

    #[tokio::test]
    async fn test_receive_yields_injected_frames_in_order() {
        let (transport, handle) = FakeTransport::new();

        for i in 0u32..3 {
            handle.inbound_tx.send(format!("frame-{}", i)).unwrap();
        }

        let mut stream = transport.receive();
        for i in 0u32..3 {
            let frame = tokio::time::timeout(Duration::from_secs(2), stream.next())
                .await
                .expect("timed out")
                .expect("stream ended");
            assert_eq!(frame, format!("frame-{}", i));
        }
    }

    #[tokio::test]
    async fn test_dropped_handle_ends_receive_stream() {
        let (transport, handle) = FakeTransport::new();
        drop(handle);

        let mut stream = transport.receive();
        let item = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("timed out");
        assert!(item.is_none());
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (transport, _handle) = FakeTransport::new();
        transport.close().await.unwrap();
        assert!(transport.is_closed());
        assert!(transport.send("{}".to_string()).await.is_err());
    }

    #[test]
    fn test_fake_transport_is_object_safe() {
        let (transport, _handle) = FakeTransport::new();
        let _boxed: Box<dyn Transport> = Box::new(transport);
    }
}
