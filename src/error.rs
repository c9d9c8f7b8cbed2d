//! Error types for the OVSDB client
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for OVSDB client operations
///
/// This enum encompasses all possible errors that can occur while
/// connecting to an OVSDB server, issuing RPC calls, and managing
/// the connection lifecycle.
#[derive(Error, Debug)]
pub enum OvsdbError {
    /// Operation issued after shutdown or before the client was bound
    #[error("client is not active")]
    InactiveClient,

    /// Send or close failed on the underlying byte stream
    #[error("transport error: {0}")]
    Transport(String),

    /// The server returned a non-null `error` value in a response.
    ///
    /// Carries the raw error payload exactly as it appeared on the wire
    /// (commonly a string, per JSON-RPC 1.0).
    #[error("rpc error: {0}")]
    Rpc(serde_json::Value),

    /// No response arrived within the configured RPC timeout
    #[error("rpc call '{method}' timed out")]
    Timeout {
        /// The method name of the call that timed out
        method: String,
    },

    /// The client was shut down while the call was still pending
    #[error("client shut down while call was pending")]
    Shutdown,

    /// TLS handshake or certificate failure
    #[error("tls error: {0}")]
    Tls(String),

    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for OVSDB client operations
pub type Result<T> = anyhow::Result<T>;
