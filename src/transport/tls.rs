//! TLS transport
//!
//! [`TlsTransport`] runs the OVSDB conversation over TLS. The caller
//! supplies a ready [`rustls::ClientConfig`] (root store, client
//! certificate, protocol versions); this module only drives the handshake
//! and captures the peer's leaf certificate into [`ConnectionInfo`] at the
//! moment the handshake completes.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use rustls::pki_types::ServerName;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_rustls::TlsConnector;

use crate::error::{OvsdbError, Result};
use crate::transport::{ConnectionInfo, StreamIo, Transport};

/// TLS-over-TCP transport for an OVSDB connection.
#[derive(Debug)]
pub struct TlsTransport {
    io: StreamIo,
    info: ConnectionInfo,
}

impl TlsTransport {
    /// Connect to the given address and complete a TLS handshake.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address of the server.
    /// * `server_name` - Name the server's certificate must be valid for.
    /// * `tls_config` - Caller-built rustls client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OvsdbError::Tls`] if `server_name` is not a valid server
    /// name or the handshake fails, and [`OvsdbError::Io`] if the TCP
    /// connection cannot be established.
    pub async fn connect<A: ToSocketAddrs>(
        addr: A,
        server_name: &str,
        tls_config: Arc<rustls::ClientConfig>,
    ) -> Result<Self> {
        let name = ServerName::try_from(server_name.to_string())
            .map_err(|e| OvsdbError::Tls(format!("invalid server name '{server_name}': {e}")))?;

        let stream = TcpStream::connect(addr).await.map_err(OvsdbError::Io)?;
        stream.set_nodelay(true).map_err(OvsdbError::Io)?;
        let local = stream.local_addr().map_err(OvsdbError::Io)?;
        let remote = stream.peer_addr().map_err(OvsdbError::Io)?;

        let connector = TlsConnector::from(tls_config);
        let stream = connector
            .connect(name, stream)
            .await
            .map_err(|e| OvsdbError::Tls(format!("handshake failed: {e}")))?;

        // The handshake is done; whatever chain the peer presented is final.
        let peer_certificate = stream
            .get_ref()
            .1
            .peer_certificates()
            .and_then(|chain| chain.first().cloned());
        let info = ConnectionInfo::new(local, remote, peer_certificate);

        let (read_half, write_half) = tokio::io::split(stream);
        Ok(Self {
            io: StreamIo::spawn(read_half, write_half),
            info,
        })
    }

    /// Addresses and peer certificate of the established connection.
    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.info
    }
}

#[async_trait::async_trait]
impl Transport for TlsTransport {
    async fn send(&self, message: String) -> Result<()> {
        self.io.send(message)
    }

    async fn close(&self) -> Result<()> {
        self.io.close();
        Ok(())
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        self.io.receive()
    }
}
