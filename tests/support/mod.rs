//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use cinder::commands::{dispatch_client, Command, CommandError, CommandOutcome};
use cinder::config::{ServerConfig, ServerRole};
use cinder::context::{MasterContext, ReplicaContext, ServerContext};
use cinder::resp::RespValue;
use cinder::store::Store;

pub const TEST_REPL_ID: &str = "0123456789abcdef0123456789abcdef01234567";

pub fn master_config() -> ServerConfig {
    ServerConfig {
        port: 6379,
        role: ServerRole::Master,
        dir: "/tmp/cinder-test".to_string(),
        dbfilename: "dump.rdb".to_string(),
    }
}

pub fn replica_config() -> ServerConfig {
    ServerConfig {
        port: 6380,
        role: ServerRole::Replica {
            host: "127.0.0.1".to_string(),
            port: 6379,
        },
        dir: "/tmp/cinder-test".to_string(),
        dbfilename: "dump.rdb".to_string(),
    }
}

pub fn master_arc() -> Arc<MasterContext> {
    Arc::new(MasterContext::new(
        master_config(),
        TEST_REPL_ID.to_string(),
        Store::new(),
    ))
}

pub fn master_context() -> ServerContext {
    ServerContext::Master(master_arc())
}

pub fn replica_arc() -> Arc<ReplicaContext> {
    Arc::new(ReplicaContext::new(
        replica_config(),
        TEST_REPL_ID.to_string(),
        Store::new(),
    ))
}

pub fn replica_context() -> ServerContext {
    ServerContext::Replica(replica_arc())
}

pub fn command(parts: &[&str]) -> Command {
    let elements = parts
        .iter()
        .map(|part| RespValue::BulkString(Bytes::copy_from_slice(part.as_bytes())))
        .collect();

    Command::from_resp(RespValue::Array(elements)).expect("well-formed test command")
}

pub async fn dispatch(
    ctx: &ServerContext,
    parts: &[&str],
) -> Result<CommandOutcome, CommandError> {
    dispatch_client(ctx, "127.0.0.1:50000", &command(parts)).await
}

/// Dispatches and unwraps the response frame.
pub async fn dispatch_response(ctx: &ServerContext, parts: &[&str]) -> Vec<u8> {
    match dispatch(ctx, parts).await {
        Ok(CommandOutcome::Response(frame)) => frame,
        other => panic!("expected a response for {:?}, got {:?}", parts, other),
    }
}

pub fn simple_frame(s: &str) -> Vec<u8> {
    format!("+{}\r\n", s).into_bytes()
}

pub fn bulk_frame(s: &str) -> Vec<u8> {
    format!("${}\r\n{}\r\n", s.len(), s).into_bytes()
}

pub fn null_frame() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

pub fn integer_frame(value: i64) -> Vec<u8> {
    format!(":{}\r\n", value).into_bytes()
}

pub fn error_frame(message: &str) -> Vec<u8> {
    format!("-{}\r\n", message).into_bytes()
}
