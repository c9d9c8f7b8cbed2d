//! Async client for the Open vSwitch Database Management Protocol
//!
//! OVSDB (RFC 7047) is a bidirectional JSON-RPC 1.0 conversation over one
//! byte-stream connection: the client issues calls (`list_dbs`,
//! `get_schema`, `transact`, monitors, locks) while the server sends
//! keepalive requests and subscription notifications back on the same
//! stream. This crate implements the client side: a duplex JSON-RPC engine
//! with request/response correlation, timeouts, and callback dispatch, over
//! plain TCP or TLS.
//!
//! # Architecture
//!
//! - `rpc`: the duplex JSON-RPC 1.0 engine (frame classification, call
//!   correlation, inbound handler dispatch)
//! - `transport`: byte-stream transports (TCP, TLS) and the concatenated
//!   JSON frame codec
//! - `client`: the OVSDB method surface, callback registries, and
//!   connection lifecycle
//! - `types`: RFC 7047 wire records
//! - `config`: configuration management
//! - `error`: error types and result alias
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ovsdb_client::{ClientConfig, NullObserver, OvsdbClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::from_env();
//!     let client =
//!         OvsdbClient::connect_tcp("127.0.0.1:6640", &config, Arc::new(NullObserver)).await?;
//!
//!     let databases = client.list_databases().await?;
//!     println!("databases: {databases:?}");
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod rpc;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use client::{
    ConnectionObserver, LockCallback, MonitorCallback, NullObserver, OvsdbClient,
};
pub use config::ClientConfig;
pub use error::{OvsdbError, Result};
pub use transport::{ConnectionInfo, Transport};
pub use types::{
    DatabaseSchema, LockResult, MonitorRequest, MonitorRequests, MonitorSelect, OperationResult,
    Row, RowUpdate, TableSchema, TableUpdate, TableUpdates,
};
