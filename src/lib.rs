//! Cinder is an in-memory key-value server speaking the Redis Serialization
//! Protocol (RESP) over TCP, with asynchronous master-replica replication.
//!
//! The server supports:
//!
//! - Expiring string values (GET, SET with PX)
//! - Append-only streams with validated entry IDs (XADD, TYPE)
//! - Key-space inspection (KEYS, TYPE, CONFIG GET)
//! - Loading a binary snapshot (RDB) file at startup
//! - Master-replica replication: full resync over PSYNC, mutation
//!   propagation, offset acknowledgement, and quorum waits (WAIT)
//!
//! Each connection is served by its own Tokio task; the store is shared
//! behind a single async mutex.

pub mod commands;
pub mod config;
pub mod connection;
pub mod context;
pub mod handshake;
pub mod rdb;
pub mod replication;
pub mod resp;
pub mod store;
pub mod stream;
