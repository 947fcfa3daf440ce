//! Registry of attached replicas.
//!
//! Each record owns the write half of its replica's connection together
//! with the highest propagation offset that replica has acknowledged.
//! Records keep insertion order so every replica sees mutations in the
//! order the master committed them.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug)]
struct Replica {
    endpoint: String,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    acked_offset: u64,
}

#[derive(Debug, Default)]
pub struct ReplicaRegistry {
    replicas: Mutex<Vec<Replica>>,
}

impl ReplicaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a replica under its remote endpoint. Re-registering an
    /// endpoint is a no-op.
    pub async fn add(&self, endpoint: &str, writer: Arc<Mutex<OwnedWriteHalf>>) {
        let mut replicas = self.replicas.lock().await;

        if replicas.iter().any(|replica| replica.endpoint == endpoint) {
            return;
        }

        replicas.push(Replica {
            endpoint: endpoint.to_string(),
            writer,
            acked_offset: 0,
        });
    }

    pub async fn remove(&self, endpoint: &str) {
        let mut replicas = self.replicas.lock().await;
        replicas.retain(|replica| replica.endpoint != endpoint);
    }

    /// Writes `frame` to every replica, in insertion order.
    ///
    /// The registry lock is not held across socket writes: the write
    /// handles are snapshotted first, then written to one by one. A replica
    /// whose write fails is dropped from the registry; the rest still
    /// receive the frame.
    pub async fn propagate(&self, frame: &[u8]) {
        let targets: Vec<(String, Arc<Mutex<OwnedWriteHalf>>)> = {
            let replicas = self.replicas.lock().await;
            replicas
                .iter()
                .map(|replica| (replica.endpoint.clone(), Arc::clone(&replica.writer)))
                .collect()
        };

        let mut failed = Vec::new();

        for (endpoint, writer) in targets {
            let mut writer = writer.lock().await;

            let result = async {
                writer.write_all(frame).await?;
                writer.flush().await
            }
            .await;

            if let Err(e) = result {
                warn!(%endpoint, error = %e, "dropping replica after failed propagation");
                failed.push(endpoint);
            }
        }

        if !failed.is_empty() {
            let mut replicas = self.replicas.lock().await;
            replicas.retain(|replica| !failed.contains(&replica.endpoint));
        }
    }

    /// Records an acknowledged offset for a replica. Offsets only move
    /// forward; a smaller value is ignored.
    pub async fn ack(&self, endpoint: &str, offset: u64) {
        let mut replicas = self.replicas.lock().await;

        if let Some(replica) = replicas
            .iter_mut()
            .find(|replica| replica.endpoint == endpoint)
        {
            if offset > replica.acked_offset {
                replica.acked_offset = offset;
            }
        }
    }

    /// Counts replicas whose acknowledged offset has reached
    /// `target_offset`.
    pub async fn synced_count(&self, target_offset: u64) -> usize {
        let replicas = self.replicas.lock().await;
        replicas
            .iter()
            .filter(|replica| replica.acked_offset >= target_offset)
            .count()
    }

    pub async fn count(&self) -> usize {
        self.replicas.lock().await.len()
    }
}
