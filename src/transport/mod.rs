//! Byte-stream transports for the OVSDB connection
//!
//! This module defines the [`Transport`] trait that all transport
//! implementations satisfy. Concrete implementations live in submodules:
//!
//! - [`tcp::TcpTransport`] -- plain TCP connection.
//! - [`tls::TlsTransport`] -- TLS over TCP; captures the peer certificate
//!   at handshake completion.
//! - [`fake::FakeTransport`] -- in-process fake used in tests (cfg(test)
//!   only).
//!
//! # Design
//!
//! The [`Transport`] trait is intentionally minimal: callers `send` a
//! serialized JSON frame, `close` the connection, and `receive` a stream of
//! serialized frames (one complete JSON object per item). Frame boundary
//! detection over the raw bytes is handled by [`codec::JsonFrameCodec`];
//! the engines above never see partial frames.
//!
//! Concurrent `send`s are serialised by a single writer task draining an
//! in-process queue, so each frame reaches the socket as one contiguous
//! write.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use rustls::pki_types::CertificateDer;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

use crate::error::{OvsdbError, Result};
use codec::JsonFrameCodec;

pub mod codec;
pub mod tcp;
pub mod tls;

#[cfg(test)]
pub mod fake;

/// Immutable description of an established connection.
///
/// Populated once, when the connection becomes active; for TLS this is the
/// moment the handshake completes, which is when the peer certificate (if
/// the peer presented a chain) is captured.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Local address of the socket.
    pub local_address: IpAddr,
    /// Local port of the socket.
    pub local_port: u16,
    /// Remote address of the socket.
    pub remote_address: IpAddr,
    /// Remote port of the socket.
    pub remote_port: u16,
    /// The peer's leaf certificate in DER form; present iff the connection
    /// is TLS and the peer presented a chain.
    pub remote_peer_certificate: Option<CertificateDer<'static>>,
}

impl ConnectionInfo {
    pub(crate) fn new(
        local: SocketAddr,
        remote: SocketAddr,
        remote_peer_certificate: Option<CertificateDer<'static>>,
    ) -> Self {
        Self {
            local_address: local.ip(),
            local_port: local.port(),
            remote_address: remote.ip(),
            remote_port: remote.port(),
            remote_peer_certificate,
        }
    }
}

/// Abstraction over the byte-stream carrying the OVSDB conversation.
///
/// All methods are `async` or return pinned [`Stream`]s so that transport
/// implementations can drive I/O without blocking the Tokio executor.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Send one complete serialized JSON frame to the peer.
    ///
    /// # Errors
    ///
    /// Returns [`OvsdbError::Transport`] if the connection is closed or the
    /// underlying write fails.
    async fn send(&self, message: String) -> Result<()>;

    /// Close the connection. Idempotent.
    async fn close(&self) -> Result<()>;

    /// Returns the stream of inbound frames.
    ///
    /// Each item is one complete JSON object text. The stream ends when the
    /// peer disconnects or the transport is closed.
    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>>;
}

/// The channel ends and lifecycle token shared by the socket transports.
///
/// Two background tasks are spawned per connection: a writer that drains
/// the outbound queue into the socket (serialising concurrent sends), and a
/// reader that runs the frame codec and feeds the inbound queue. Dropping
/// the inbound sender on reader exit is what surfaces a disconnect to the
/// dispatch loop.
#[derive(Debug)]
pub(crate) struct StreamIo {
    outbound_tx: mpsc::UnboundedSender<String>,
    inbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    shutdown: CancellationToken,
}

impl StreamIo {
    pub(crate) fn spawn<R, W>(read_half: R, write_half: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
        let shutdown = CancellationToken::new();

        let writer_cancel = shutdown.clone();
        tokio::spawn(async move {
            let mut writer = write_half;
            loop {
                tokio::select! {
                    _ = writer_cancel.cancelled() => break,
                    maybe_frame = outbound_rx.recv() => {
                        let Some(frame) = maybe_frame else { break };
                        if let Err(e) = writer.write_all(frame.as_bytes()).await {
                            tracing::warn!("transport write failed: {e}");
                            break;
                        }
                        if let Err(e) = writer.flush().await {
                            tracing::warn!("transport flush failed: {e}");
                            break;
                        }
                    }
                }
            }
            let _ = writer.shutdown().await;
        });

        let reader_cancel = shutdown.clone();
        tokio::spawn(async move {
            let mut frames = FramedRead::new(read_half, JsonFrameCodec::default());
            loop {
                tokio::select! {
                    _ = reader_cancel.cancelled() => break,
                    item = frames.next() => match item {
                        Some(Ok(frame)) => {
                            if inbound_tx.send(frame).is_err() {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!("transport read failed: {e}");
                            break;
                        }
                        None => break,
                    }
                }
            }
            // inbound_tx drops here, which ends the receive stream.
        });

        Self {
            outbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            shutdown,
        }
    }

    pub(crate) fn send(&self, message: String) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(OvsdbError::Transport("connection closed".to_string()).into());
        }
        self.outbound_tx
            .send(message)
            .map_err(|_| OvsdbError::Transport("connection closed".to_string()).into())
    }

    pub(crate) fn close(&self) {
        self.shutdown.cancel();
    }

    pub(crate) fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
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
