//! Duplex JSON-RPC 1.0 engine
//!
//! OVSDB is a bidirectional JSON-RPC 1.0 conversation over one byte-stream
//! connection: the client calls the server, and the server calls the client
//! back (keepalives and subscription notifications) on the same stream.
//! This module implements both directions and the plumbing between them.
//!
//! # Module Layout
//!
//! - `frame`    -- wire structs and the shape-only inbound frame classifier
//! - `client`   -- request emission, response correlation, timeout, shutdown
//! - `server`   -- named handlers for inbound requests and notifications
//! - `dispatch` -- the loop that routes each inbound frame to an engine

pub mod client;
pub mod dispatch;
pub mod frame;
pub mod server;

pub use client::RpcClient;
pub use dispatch::start_dispatch_loop;
pub use frame::{classify, Frame};
pub use server::{BoxFuture, HandlerOutcome, RpcServer};
