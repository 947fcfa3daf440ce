mod support;

use bytes::Bytes;
use cinder::rdb::{load_snapshot, LoaderError};
use cinder::store::Store;
use tempfile::TempDir;

const OP_EXPIRE_MS: u8 = 0xFC;
const OP_SELECT_DB: u8 = 0xFE;
const OP_EOF: u8 = 0xFF;

fn string_record(s: &str) -> Vec<u8> {
    let mut out = vec![s.len() as u8];
    out.extend_from_slice(s.as_bytes());
    out
}

fn snapshot(records: &[&[u8]]) -> Vec<u8> {
    let mut out = b"REDIS0011".to_vec();
    out.extend_from_slice(&[OP_SELECT_DB, 0x00]);
    for record in records {
        out.extend_from_slice(record);
    }
    out.push(OP_EOF);
    out.extend_from_slice(&[0; 8]);
    out
}

fn write_snapshot(dir: &TempDir, name: &str, body: &[u8]) {
    std::fs::write(dir.path().join(name), body).unwrap();
}

#[tokio::test]
async fn test_load_snapshot_with_one_pair() {
    let dir = TempDir::new().unwrap();

    let mut pair = string_record("foo");
    pair.extend_from_slice(&string_record("bar"));
    write_snapshot(&dir, "data.rdb", &snapshot(&[&pair]));

    let entries = load_snapshot(dir.path().to_str().unwrap(), "data.rdb")
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    let entry = entries.get("foo").unwrap();
    assert_eq!(entry.payload, Bytes::from_static(b"bar"));
    assert_eq!(entry.expires_at, None);

    // Loaded entries serve reads once absorbed into a store.
    let mut store = Store::new();
    store.absorb_snapshot(entries);
    assert_eq!(store.get("foo").unwrap().payload, Bytes::from_static(b"bar"));
}

#[tokio::test]
async fn test_missing_snapshot_starts_empty() {
    let dir = TempDir::new().unwrap();

    let entries = load_snapshot(dir.path().to_str().unwrap(), "absent.rdb")
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_malformed_snapshot_is_an_error_not_a_panic() {
    let dir = TempDir::new().unwrap();
    write_snapshot(&dir, "broken.rdb", b"REDIS0011 this is not a snapshot");

    let result = load_snapshot(dir.path().to_str().unwrap(), "broken.rdb").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_truncated_snapshot_reports_eof() {
    let dir = TempDir::new().unwrap();

    let mut pair = string_record("foo");
    pair.extend_from_slice(&string_record("bar"));
    let mut body = snapshot(&[&pair]);
    body.truncate(body.len() - 12);
    write_snapshot(&dir, "cut.rdb", &body);

    let result = load_snapshot(dir.path().to_str().unwrap(), "cut.rdb").await;
    assert_eq!(result, Err(LoaderError::UnexpectedEof));
}

#[tokio::test]
async fn test_expired_snapshot_entry_is_hidden_by_lazy_expiry() {
    let dir = TempDir::new().unwrap();

    // An expiry far in the past, encoded little-endian.
    let expiry_ms: u64 = 1_000_000_000_000;
    let mut record = vec![OP_EXPIRE_MS];
    record.extend_from_slice(&expiry_ms.to_le_bytes());
    record.extend_from_slice(&string_record("old"));
    record.extend_from_slice(&string_record("value"));

    let mut live = string_record("live");
    live.extend_from_slice(&string_record("yes"));

    write_snapshot(&dir, "mixed.rdb", &snapshot(&[&record, &live]));

    let entries = load_snapshot(dir.path().to_str().unwrap(), "mixed.rdb")
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);

    let mut store = Store::new();
    store.absorb_snapshot(entries);

    // The stale entry is deleted lazily on first read.
    assert!(store.get("old").is_none());
    assert!(store.get("live").is_some());
    assert_eq!(store.keys().count(), 1);
}

#[tokio::test]
async fn test_snapshot_served_through_the_command_layer() {
    use support::*;

    let dir = TempDir::new().unwrap();

    let mut pair = string_record("foo");
    pair.extend_from_slice(&string_record("bar"));
    write_snapshot(&dir, "boot.rdb", &snapshot(&[&pair]));

    let entries = load_snapshot(dir.path().to_str().unwrap(), "boot.rdb")
        .await
        .unwrap();

    let mut store = Store::new();
    store.absorb_snapshot(entries);

    let ctx = cinder::context::ServerContext::Master(std::sync::Arc::new(
        cinder::context::MasterContext::new(master_config(), TEST_REPL_ID.to_string(), store),
    ));

    assert_eq!(dispatch_response(&ctx, &["GET", "foo"]).await, bulk_frame("bar"));
    assert_eq!(dispatch_response(&ctx, &["KEYS", "*"]).await, b"*1\r\n$3\r\nfoo\r\n".to_vec());
}
