//! Plain-TCP transport
//!
//! [`TcpTransport`] connects to an OVSDB server over unencrypted TCP. The
//! socket is split at connect time and handed to the shared reader/writer
//! tasks; see [`crate::transport::StreamIo`].

use std::pin::Pin;

use futures::Stream;
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::{OvsdbError, Result};
use crate::transport::{ConnectionInfo, StreamIo, Transport};

/// TCP transport for an OVSDB connection.
#[derive(Debug)]
pub struct TcpTransport {
    io: StreamIo,
    info: ConnectionInfo,
}

impl TcpTransport {
    /// Connect to the given address.
    ///
    /// # Errors
    ///
    /// Returns [`OvsdbError::Io`] if the connection cannot be established.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr).await.map_err(OvsdbError::Io)?;
        stream.set_nodelay(true).map_err(OvsdbError::Io)?;

        let info = ConnectionInfo::new(
            stream.local_addr().map_err(OvsdbError::Io)?,
            stream.peer_addr().map_err(OvsdbError::Io)?,
            None,
        );

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            io: StreamIo::spawn(read_half, write_half),
            info,
        })
    }

    /// Addresses of the established connection.
    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.info
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
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
