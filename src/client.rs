//! OVSDB client surface and connection lifecycle
//!
//! [`OvsdbClient`] ties the duplex JSON-RPC engine to one live connection
//! and exposes the typed OVSDB method surface: `list_dbs`, `get_schema`,
//! `transact`, `monitor`/`monitor_cancel`, and `lock`/`steal`/`unlock`.
//!
//! # Lifecycle
//!
//! A connection is **pending** until the byte stream is ready (for TLS,
//! until the handshake completes inside the transport constructor),
//! **active** from [`OvsdbClient::bind`] until shutdown or disconnect, and
//! **closed** afterwards. One atomic flag gates every public operation and
//! makes teardown run exactly once, whether it is triggered by
//! [`OvsdbClient::shutdown`] or by the transport hanging up.
//!
//! # Callback registries
//!
//! Monitor and lock callbacks are installed strictly after the
//! corresponding RPC succeeds, so a callback can never fire for a monitor
//! or lock the server refused. Inbound `update`, `locked`, and `stolen`
//! notifications for ids without a registry entry are dropped with a log
//! line. All callbacks run on the dispatch task, never on the socket
//! reader, and updates for one monitor keep their wire arrival order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use futures::StreamExt;
use serde_json::{json, Value};
use tokio::net::ToSocketAddrs;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::{OvsdbError, Result};
use crate::rpc::{start_dispatch_loop, RpcClient, RpcServer};
use crate::transport::tcp::TcpTransport;
use crate::transport::tls::TlsTransport;
use crate::transport::{ConnectionInfo, Transport};
use crate::types::{
    DatabaseSchema, LockResult, MonitorRequests, OperationResult, TableUpdates, METHOD_ECHO,
    METHOD_GET_SCHEMA, METHOD_LIST_DBS, METHOD_LOCK, METHOD_LOCKED, METHOD_MONITOR,
    METHOD_MONITOR_CANCEL, METHOD_STEAL, METHOD_STOLEN, METHOD_TRANSACT, METHOD_UNLOCK,
    METHOD_UPDATE,
};

/// Receives table updates for one monitor.
pub trait MonitorCallback: Send + Sync {
    /// Called with the updates carried by one `update` notification.
    fn update(&self, updates: TableUpdates);
}

/// Receives ownership events for one lock.
pub trait LockCallback: Send + Sync {
    /// The queued lock was granted.
    fn locked(&self);
    /// The held lock was revoked by another client's `steal`.
    fn stolen(&self);
}

/// Observes the connection lifecycle.
///
/// `connected` is invoked exactly once per client, before any other
/// callback; `disconnected` at most once, after every other callback.
#[allow(unused_variables)]
pub trait ConnectionObserver: Send + Sync {
    /// The connection became active.
    fn connected(&self, client: &Arc<OvsdbClient>) {}
    /// The connection was shut down or the peer disconnected.
    fn disconnected(&self, client: &Arc<OvsdbClient>) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default)]
pub struct NullObserver;

impl ConnectionObserver for NullObserver {}

type MonitorRegistry = Arc<Mutex<HashMap<String, Arc<dyn MonitorCallback>>>>;
type LockRegistry = Arc<Mutex<HashMap<String, Arc<dyn LockCallback>>>>;

/// An active OVSDB client connection.
///
/// Create one with [`OvsdbClient::connect_tcp`], [`OvsdbClient::connect_tls`],
/// or (mainly for tests) [`OvsdbClient::bind`] over any [`Transport`].
pub struct OvsdbClient {
    rpc: Arc<RpcClient>,
    server: Arc<RpcServer>,
    transport: Arc<dyn Transport>,
    info: ConnectionInfo,
    /// The single lifecycle gate: true from bind until teardown wins its
    /// compare-and-swap.
    active: AtomicBool,
    cancel: CancellationToken,
    monitors: MonitorRegistry,
    locks: LockRegistry,
    observer: Arc<dyn ConnectionObserver>,
    /// Back-reference handed to observer callbacks.
    weak: Weak<OvsdbClient>,
}

impl std::fmt::Debug for OvsdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OvsdbClient")
            .field("info", &self.info)
            .field("active", &self.active.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl OvsdbClient {
    /// Connect over plain TCP.
    pub async fn connect_tcp<A: ToSocketAddrs>(
        addr: A,
        config: &ClientConfig,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Result<Arc<Self>> {
        let transport = TcpTransport::connect(addr).await?;
        let info = transport.connection_info().clone();
        Self::bind(transport, info, config, observer).await
    }

    /// Connect over TLS.
    ///
    /// The connection becomes active only once the handshake has completed;
    /// the peer certificate captured at that moment is available through
    /// [`OvsdbClient::connection_info`].
    pub async fn connect_tls<A: ToSocketAddrs>(
        addr: A,
        server_name: &str,
        tls_config: Arc<rustls::ClientConfig>,
        config: &ClientConfig,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Result<Arc<Self>> {
        let transport = TlsTransport::connect(addr, server_name, tls_config).await?;
        let info = transport.connection_info().clone();
        Self::bind(transport, info, config, observer).await
    }

    /// Bind the engines to a ready transport and activate the connection.
    ///
    /// Spawns the writer pump, the reader pump, the dispatch loop, and the
    /// teardown watcher, then invokes the observer's `connected` callback
    /// exactly once before returning.
    pub async fn bind<T: Transport + 'static>(
        transport: T,
        info: ConnectionInfo,
        config: &ClientConfig,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        let transport: Arc<dyn Transport> = Arc::new(transport);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();
        let cancel = CancellationToken::new();

        let rpc = Arc::new(RpcClient::new(out_tx.clone(), config.rpc_timeout()));
        let server = Arc::new(RpcServer::new(out_tx));

        let monitors: MonitorRegistry = Arc::new(Mutex::new(HashMap::new()));
        let locks: LockRegistry = Arc::new(Mutex::new(HashMap::new()));
        bind_inbound_handlers(&server, &monitors, &locks).await;

        // Writer pump: both engines feed one queue, so frames reach the
        // transport one at a time. A failed send means the connection is
        // gone; cancelling the token starts teardown.
        {
            let transport = Arc::clone(&transport);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        maybe_frame = out_rx.recv() => {
                            let Some(frame) = maybe_frame else { break };
                            if let Err(e) = transport.send(frame).await {
                                tracing::warn!("outbound send failed: {e}");
                                cancel.cancel();
                                break;
                            }
                        }
                    }
                }
            });
        }

        // Reader pump: moves frames from the transport to the dispatch
        // loop. No user code runs here. When the stream ends (peer
        // disconnect), dropping `in_tx` lets the dispatch loop observe EOF.
        {
            let transport = Arc::clone(&transport);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut frames = transport.receive();
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        maybe_frame = frames.next() => {
                            let Some(frame) = maybe_frame else { break };
                            if in_tx.send(frame).is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }

        let client = Arc::new_cyclic(|weak| Self {
            rpc: Arc::clone(&rpc),
            server: Arc::clone(&server),
            transport,
            info,
            active: AtomicBool::new(true),
            cancel: cancel.clone(),
            monitors,
            locks,
            observer,
            weak: weak.clone(),
        });

        // Teardown watcher: whichever of explicit shutdown, transport
        // disconnect, or dispatch exit cancels the token, teardown runs
        // once.
        {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                client.cancel.cancelled().await;
                client.teardown().await;
            });
        }

        // Connected fires before the dispatch loop starts draining inbound
        // frames, so it strictly precedes every other callback; early
        // arrivals queue in the channel meanwhile.
        client.observer.connected(&client);

        start_dispatch_loop(in_rx, cancel, rpc, server);
        Ok(client)
    }

    /// Enumerate the databases the server hosts.
    pub async fn list_databases(&self) -> Result<Vec<String>> {
        self.ensure_active()?;
        self.rpc.call(METHOD_LIST_DBS, vec![]).await
    }

    /// Fetch the schema of a database.
    pub async fn get_schema(&self, database: &str) -> Result<DatabaseSchema> {
        self.ensure_active()?;
        self.rpc.call(METHOD_GET_SCHEMA, vec![json!(database)]).await
    }

    /// Execute a transaction.
    ///
    /// `operations` are raw RFC 7047 §5.2 operation records; they are
    /// passed through positionally after the database name.
    pub async fn transact(
        &self,
        database: &str,
        operations: Vec<Value>,
    ) -> Result<Vec<OperationResult>> {
        self.ensure_active()?;
        let mut params = Vec::with_capacity(operations.len() + 1);
        params.push(json!(database));
        params.extend(operations);
        self.rpc.call(METHOD_TRANSACT, params).await
    }

    /// Install a monitor and return the initial table contents.
    ///
    /// `callback` starts receiving `update` notifications only after the
    /// server has accepted the monitor; a failed call installs nothing.
    pub async fn monitor(
        &self,
        database: &str,
        monitor_id: &str,
        requests: &MonitorRequests,
        callback: Arc<dyn MonitorCallback>,
    ) -> Result<TableUpdates> {
        self.ensure_active()?;
        let requests = serde_json::to_value(requests).map_err(OvsdbError::Serialization)?;
        let initial: TableUpdates = self
            .rpc
            .call(
                METHOD_MONITOR,
                vec![json!(database), json!(monitor_id), requests],
            )
            .await?;

        let mut monitors = self.monitors.lock().await;
        if !self.active.load(Ordering::SeqCst) {
            return Err(OvsdbError::Shutdown.into());
        }
        monitors.insert(monitor_id.to_string(), callback);
        Ok(initial)
    }

    /// Cancel a monitor. Its callback is removed once the server confirms.
    pub async fn cancel_monitor(&self, monitor_id: &str) -> Result<()> {
        self.ensure_active()?;
        let _: Value = self
            .rpc
            .call(METHOD_MONITOR_CANCEL, vec![json!(monitor_id)])
            .await?;
        self.monitors.lock().await.remove(monitor_id);
        Ok(())
    }

    /// Acquire, or queue for, a named lock.
    ///
    /// When the result says `locked: false`, the server has queued the
    /// request; `callback.locked()` fires when the lock is granted, and
    /// `callback.stolen()` if it is later revoked.
    pub async fn lock(
        &self,
        lock_id: &str,
        callback: Arc<dyn LockCallback>,
    ) -> Result<LockResult> {
        self.ensure_active()?;
        let result: LockResult = self.rpc.call(METHOD_LOCK, vec![json!(lock_id)]).await?;

        let mut locks = self.locks.lock().await;
        if !self.active.load(Ordering::SeqCst) {
            return Err(OvsdbError::Shutdown.into());
        }
        locks.insert(lock_id.to_string(), callback);
        Ok(result)
    }

    /// Forcibly acquire a lock, revoking its current owner.
    ///
    /// Installs no callback: stealing assumes a prior `lock` on this client
    /// already armed one.
    pub async fn steal(&self, lock_id: &str) -> Result<LockResult> {
        self.ensure_active()?;
        self.rpc.call(METHOD_STEAL, vec![json!(lock_id)]).await
    }

    /// Release a lock and remove its callback.
    pub async fn unlock(&self, lock_id: &str) -> Result<()> {
        self.ensure_active()?;
        let _: Value = self.rpc.call(METHOD_UNLOCK, vec![json!(lock_id)]).await?;
        self.locks.lock().await.remove(lock_id);
        Ok(())
    }

    /// Addresses and peer certificate of this connection.
    pub fn connection_info(&self) -> Result<&ConnectionInfo> {
        self.ensure_active()?;
        Ok(&self.info)
    }

    /// Whether the connection is still active.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Shut the connection down.
    ///
    /// Every pending call completes with a shutdown error, both callback
    /// registries are cleared, and the transport is closed. Idempotent: a
    /// second call is a no-op.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.teardown().await;
    }

    async fn teardown(&self) {
        if self
            .active
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        self.cancel.cancel();
        self.rpc.shutdown().await;
        self.server.shutdown().await;
        self.monitors.lock().await.clear();
        self.locks.lock().await.clear();
        if let Err(e) = self.transport.close().await {
            tracing::debug!("transport close failed during teardown: {e}");
        }
        if let Some(client) = self.weak.upgrade() {
            self.observer.disconnected(&client);
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.active.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(OvsdbError::InactiveClient.into())
        }
    }
}

/// Bind the four inbound method handlers OVSDB servers expect of a client.
async fn bind_inbound_handlers(
    server: &RpcServer,
    monitors: &MonitorRegistry,
    locks: &LockRegistry,
) {
    // echo keeps the connection alive: the argument vector goes straight
    // back as the result.
    server
        .register(METHOD_ECHO, |params| {
            Box::pin(async move { Ok(Some(Value::Array(params))) })
        })
        .await;

    let registry = Arc::clone(monitors);
    server
        .register(METHOD_UPDATE, move |params| {
            let registry = Arc::clone(&registry);
            Box::pin(async move {
                let mut params = params.into_iter();
                let monitor_id = params
                    .next()
                    .and_then(|v| v.as_str().map(String::from))
                    .ok_or_else(|| "update: missing monitor id".to_string())?;
                let updates: TableUpdates = params
                    .next()
                    .ok_or_else(|| "update: missing table updates".to_string())
                    .and_then(|v| {
                        serde_json::from_value(v)
                            .map_err(|e| format!("update: malformed table updates: {e}"))
                    })?;

                let callback = registry.lock().await.get(&monitor_id).cloned();
                match callback {
                    Some(callback) => callback.update(updates),
                    None => {
                        tracing::debug!(monitor_id = %monitor_id, "update for unknown monitor; dropping")
                    }
                }
                Ok(None)
            })
        })
        .await;

    let registry = Arc::clone(locks);
    server
        .register(METHOD_LOCKED, move |params| {
            let registry = Arc::clone(&registry);
            Box::pin(async move {
                let lock_id = lock_id_param(params)?;
                let callback = registry.lock().await.get(&lock_id).cloned();
                match callback {
                    Some(callback) => callback.locked(),
                    None => tracing::debug!(lock_id = %lock_id, "locked for unknown lock; dropping"),
                }
                Ok(None)
            })
        })
        .await;

    let registry = Arc::clone(locks);
    server
        .register(METHOD_STOLEN, move |params| {
            let registry = Arc::clone(&registry);
            Box::pin(async move {
                let lock_id = lock_id_param(params)?;
                let callback = registry.lock().await.get(&lock_id).cloned();
                match callback {
                    Some(callback) => callback.stolen(),
                    None => tracing::debug!(lock_id = %lock_id, "stolen for unknown lock; dropping"),
                }
                Ok(None)
            })
        })
        .await;
}

fn lock_id_param(params: Vec<Value>) -> std::result::Result<String, String> {
    params
        .into_iter()
        .next()
        .and_then(|v| v.as_str().map(String::from))
        .ok_or_else(|| "missing lock id".to_string())
}
