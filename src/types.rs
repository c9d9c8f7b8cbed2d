//! OVSDB (RFC 7047) wire types and JSON-RPC method constants
//!
//! This module defines the typed records exchanged with an OVSDB server.
//! All types derive `Debug`, `Clone`, `Serialize`, and `Deserialize`.
//! Struct fields are `camelCase` on the wire where RFC 7047 requires it
//! (`maxRows`, `isRoot`); `Option<>` fields omit their key from JSON when
//! `None` via `#[serde(skip_serializing_if = "Option::is_none")]`.
//!
//! Transact operations are deliberately untyped: the `transact` surface
//! accepts caller-built [`serde_json::Value`] records so that the full
//! RFC 7047 §5.2 operation vocabulary is expressible without this crate
//! chasing it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// JSON-RPC method constants
// ---------------------------------------------------------------------------

/// Enumerate the databases the server hosts.
pub const METHOD_LIST_DBS: &str = "list_dbs";
/// Fetch the schema of a named database.
pub const METHOD_GET_SCHEMA: &str = "get_schema";
/// Execute a transaction of operations against a database.
pub const METHOD_TRANSACT: &str = "transact";
/// Install a monitor and receive the initial table contents.
pub const METHOD_MONITOR: &str = "monitor";
/// Cancel a previously installed monitor.
pub const METHOD_MONITOR_CANCEL: &str = "monitor_cancel";
/// Acquire (or queue for) a named server-side lock.
pub const METHOD_LOCK: &str = "lock";
/// Forcibly acquire a named lock, revoking the current owner.
pub const METHOD_STEAL: &str = "steal";
/// Release a named lock.
pub const METHOD_UNLOCK: &str = "unlock";

/// Server keepalive; the client must echo the params back.
pub const METHOD_ECHO: &str = "echo";
/// Server notification carrying table updates for a monitor.
pub const METHOD_UPDATE: &str = "update";
/// Server notification: a queued lock was acquired.
pub const METHOD_LOCKED: &str = "locked";
/// Server notification: a held lock was revoked by another client.
pub const METHOD_STOLEN: &str = "stolen";

// ---------------------------------------------------------------------------
// Schema records
// ---------------------------------------------------------------------------

/// A database schema as returned by `get_schema` (RFC 7047 §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// The database name.
    pub name: String,
    /// Schema version in `x.y.z` form.
    pub version: String,
    /// Optional implementation-defined checksum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cksum: Option<String>,
    /// Table name to table schema.
    pub tables: HashMap<String, TableSchema>,
}

/// Schema of a single table (RFC 7047 §3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Column name to column schema. Column schemas are kept as raw JSON;
    /// the client never interprets them.
    pub columns: HashMap<String, serde_json::Value>,
    /// Maximum number of rows the table may hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<u64>,
    /// Whether the table is part of the root set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_root: Option<bool>,
    /// Column groups whose values must be unique within the table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Vec<Vec<String>>>,
}

// ---------------------------------------------------------------------------
// Transact records
// ---------------------------------------------------------------------------

/// The per-operation result element of a `transact` reply (RFC 7047 §4.1.3).
///
/// Exactly which members are present depends on the operation that produced
/// it, so every member is optional. A non-`None` `error` marks the operation
/// as failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationResult {
    /// Rows selected by a `select` operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,
    /// UUID of the row created by an `insert` operation, as a `["uuid", s]`
    /// pair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<serde_json::Value>,
    /// Number of rows affected by an `update`, `mutate`, or `delete`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Error class when the operation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable detail accompanying `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl OperationResult {
    /// Whether this operation completed without error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

// ---------------------------------------------------------------------------
// Monitor records
// ---------------------------------------------------------------------------

/// A row: column name to column value, values kept as raw JSON.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// What a monitor should report for one table (RFC 7047 §4.1.5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorRequest {
    /// Columns to report. When `None`, all columns are monitored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    /// Which kinds of changes to report. When `None`, all kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<MonitorSelect>,
}

/// The change kinds a monitor reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSelect {
    /// Report the table's contents when the monitor is installed.
    #[serde(default = "default_true")]
    pub initial: bool,
    /// Report row insertions.
    #[serde(default = "default_true")]
    pub insert: bool,
    /// Report row deletions.
    #[serde(default = "default_true")]
    pub delete: bool,
    /// Report row modifications.
    #[serde(default = "default_true")]
    pub modify: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MonitorSelect {
    fn default() -> Self {
        Self {
            initial: true,
            insert: true,
            delete: true,
            modify: true,
        }
    }
}

/// Monitor requests for a whole database: table name to request list.
pub type MonitorRequests = HashMap<String, Vec<MonitorRequest>>;

/// Table updates delivered by `monitor` replies and `update` notifications:
/// table name to per-row updates (RFC 7047 §4.1.6).
pub type TableUpdates = HashMap<String, TableUpdate>;

/// Updates for one table: row UUID to row update.
pub type TableUpdate = HashMap<String, RowUpdate>;

/// Old and new contents of a changed row.
///
/// `old` alone: the row was deleted. `new` alone: the row was inserted (or
/// is initial contents). Both: the row was modified, with `old` holding the
/// prior values of the changed columns only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowUpdate {
    /// Prior contents, present for deletions and modifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Row>,
    /// Current contents, present for insertions and modifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<Row>,
}

// ---------------------------------------------------------------------------
// Lock records
// ---------------------------------------------------------------------------

/// Reply to `lock` and `steal` (RFC 7047 §4.1.8, §4.1.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockResult {
    /// Whether the lock was acquired immediately. When `false` the server
    /// has queued the request and will send `locked` once it is granted.
    pub locked: bool,
}
