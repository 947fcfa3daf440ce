//! Master-side replication state: the registry of attached replicas and
//! the quorum barrier used by WAIT.

mod barrier;
mod registry;

pub use barrier::AckBarrier;
pub use registry::ReplicaRegistry;
