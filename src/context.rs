//! Role-specific server state.
//!
//! A process runs as either master or replica, and the two roles carry
//! different state: only a master tracks attached replicas, a propagation
//! offset, and a WAIT barrier; only a replica tracks how many bytes it has
//! consumed from its master. Handlers dispatch on the [`ServerContext`]
//! variant rather than null-checking master-only fields.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::replication::{AckBarrier, ReplicaRegistry};
use crate::store::Store;

#[derive(Debug)]
pub struct MasterContext {
    pub config: ServerConfig,
    pub repl_id: String,
    pub store: Mutex<Store>,
    pub replicas: ReplicaRegistry,
    /// Total bytes of mutation frames propagated to replicas.
    pub prop_offset: AtomicU64,
    /// Serialises concurrent WAIT callers. Held across the whole quorum
    /// wait; ordinary dispatch is unaffected.
    pub wait_gate: Mutex<()>,
    /// The barrier armed by an in-flight WAIT, decremented by inbound
    /// acknowledgements.
    pub barrier: Mutex<Option<Arc<AckBarrier>>>,
}

impl MasterContext {
    pub fn new(config: ServerConfig, repl_id: String, store: Store) -> Self {
        Self {
            config,
            repl_id,
            store: Mutex::new(store),
            replicas: ReplicaRegistry::new(),
            prop_offset: AtomicU64::new(0),
            wait_gate: Mutex::new(()),
            barrier: Mutex::new(None),
        }
    }

    /// Passes an inbound acknowledgement to the armed WAIT barrier, if any.
    pub async fn notify_ack(&self) {
        if let Some(barrier) = self.barrier.lock().await.as_ref() {
            barrier.ack();
        }
    }
}

#[derive(Debug)]
pub struct ReplicaContext {
    pub config: ServerConfig,
    pub repl_id: String,
    pub store: Mutex<Store>,
    /// Bytes consumed from the master's command stream, reported back in
    /// `REPLCONF ACK`.
    pub upstream_offset: AtomicU64,
}

impl ReplicaContext {
    pub fn new(config: ServerConfig, repl_id: String, store: Store) -> Self {
        Self {
            config,
            repl_id,
            store: Mutex::new(store),
            upstream_offset: AtomicU64::new(0),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ServerContext {
    Master(Arc<MasterContext>),
    Replica(Arc<ReplicaContext>),
}

impl ServerContext {
    pub fn is_master(&self) -> bool {
        matches!(self, ServerContext::Master(_))
    }

    pub fn role_name(&self) -> &'static str {
        match self {
            ServerContext::Master(_) => "master",
            ServerContext::Replica(_) => "slave",
        }
    }

    pub fn config(&self) -> &ServerConfig {
        match self {
            ServerContext::Master(master) => &master.config,
            ServerContext::Replica(replica) => &replica.config,
        }
    }

    pub fn repl_id(&self) -> &str {
        match self {
            ServerContext::Master(master) => &master.repl_id,
            ServerContext::Replica(replica) => &replica.repl_id,
        }
    }

    /// The offset reported by INFO: bytes propagated for a master, bytes
    /// consumed from the master for a replica.
    pub fn repl_offset(&self) -> u64 {
        match self {
            ServerContext::Master(master) => master.prop_offset.load(Ordering::SeqCst),
            ServerContext::Replica(replica) => replica.upstream_offset.load(Ordering::SeqCst),
        }
    }

    pub fn store(&self) -> &Mutex<Store> {
        match self {
            ServerContext::Master(master) => &master.store,
            ServerContext::Replica(replica) => &replica.store,
        }
    }
}
