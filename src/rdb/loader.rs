//! Snapshot op-code loop.
//!
//! A snapshot is a stream of op-coded records. The loader skips the file
//! header until the SELECTDB op, then reads records until EOF. Expiry ops
//! attach an absolute timestamp to the next key/value pair. Bytes after the
//! EOF op (the checksum) are ignored.

use std::collections::HashMap;
use std::path::Path;

use jiff::Timestamp;
use tracing::debug;

use super::length::{decode_integer_length, decode_string};
use super::LoaderError;
use crate::store::Entry;

const OP_AUX: u8 = 0xFA;
const OP_RESIZE_DB: u8 = 0xFB;
const OP_EXPIRE_MS: u8 = 0xFC;
const OP_EXPIRE_S: u8 = 0xFD;
const OP_SELECT_DB: u8 = 0xFE;
const OP_EOF: u8 = 0xFF;

/// Reads the snapshot at `<dir>/<dbfilename>` into string entries.
///
/// A missing file is not an error; the server simply starts empty. A
/// malformed file surfaces as a [`LoaderError`] for the caller to log.
pub async fn load_snapshot(
    dir: &str,
    dbfilename: &str,
) -> Result<HashMap<String, Entry>, LoaderError> {
    let path = Path::new(dir).join(dbfilename);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no snapshot file, starting empty");
            return Ok(HashMap::new());
        }
        Err(e) => return Err(LoaderError::Io(e.to_string())),
    };

    parse_snapshot(&bytes)
}

/// Parses a complete snapshot byte buffer.
pub fn parse_snapshot(buf: &[u8]) -> Result<HashMap<String, Entry>, LoaderError> {
    let mut cursor = skip_header(buf)?;
    let mut entries = HashMap::new();
    let mut pending_expiry: Option<Timestamp> = None;

    loop {
        let op = *buf.get(cursor).ok_or(LoaderError::UnexpectedEof)?;

        match op {
            OP_EOF => break,
            OP_AUX => {
                cursor += 1;
                let (aux_key, read) = decode_string(buf, cursor)?;
                cursor += read;
                let (aux_value, read) = decode_string(buf, cursor)?;
                cursor += read;
                debug!(
                    key = %String::from_utf8_lossy(&aux_key),
                    value = %String::from_utf8_lossy(&aux_value),
                    "skipping aux metadata"
                );
            }
            OP_RESIZE_DB => {
                cursor += 1;
                let (_hash_table_size, read) = decode_integer_length(buf, cursor)?;
                cursor += read;
                let (_expiry_table_size, read) = decode_integer_length(buf, cursor)?;
                cursor += read;
            }
            OP_SELECT_DB => {
                cursor += 1;
                let (_db_index, read) = decode_integer_length(buf, cursor)?;
                cursor += read;
            }
            OP_EXPIRE_MS => {
                cursor += 1;
                let raw = take(buf, cursor, 8)?;
                cursor += 8;
                let epoch_ms = u64::from_le_bytes([
                    raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
                ]);
                pending_expiry = Some(
                    Timestamp::from_millisecond(epoch_ms as i64)
                        .map_err(|_| LoaderError::InvalidExpiry)?,
                );
            }
            OP_EXPIRE_S => {
                cursor += 1;
                let raw = take(buf, cursor, 4)?;
                cursor += 4;
                let epoch_s = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
                pending_expiry = Some(
                    Timestamp::from_second(epoch_s as i64)
                        .map_err(|_| LoaderError::InvalidExpiry)?,
                );
            }
            _ => {
                // Any other byte starts a length-prefixed key string.
                let (key, read) = decode_string(buf, cursor)?;
                cursor += read;

                // A value-type marker byte decodes as an empty key; skip it
                // without consuming the expiry recorded for the real pair.
                if key.is_empty() {
                    continue;
                }

                let key = String::from_utf8(key.to_vec()).map_err(|_| LoaderError::InvalidKey)?;

                let (value, read) = decode_string(buf, cursor)?;
                cursor += read;

                entries.insert(
                    key,
                    Entry {
                        payload: value,
                        expires_at: pending_expiry.take(),
                    },
                );
            }
        }
    }

    Ok(entries)
}

/// Advances past the file header, stopping after the SELECTDB op and its
/// db-index length.
fn skip_header(buf: &[u8]) -> Result<usize, LoaderError> {
    let mut cursor = 0;

    loop {
        let byte = *buf.get(cursor).ok_or(LoaderError::UnexpectedEof)?;
        cursor += 1;

        if byte == OP_SELECT_DB {
            let (_db_index, read) = decode_integer_length(buf, cursor)?;
            return Ok(cursor + read);
        }
    }
}

fn take(buf: &[u8], cursor: usize, len: usize) -> Result<&[u8], LoaderError> {
    if cursor + len > buf.len() {
        return Err(LoaderError::UnexpectedEof);
    }
    Ok(&buf[cursor..cursor + len])
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

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
        out.extend_from_slice(&[OP_EOF]);
        out.extend_from_slice(&[0; 8]); // checksum, ignored
        out
    }

    #[test]
    fn test_parse_single_pair() {
        let mut record = string_record("foo");
        record.extend_from_slice(&string_record("bar"));

        let entries = parse_snapshot(&snapshot(&[&record])).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries.get("foo"),
            Some(&Entry {
                payload: Bytes::from_static(b"bar"),
                expires_at: None,
            })
        );
    }

    #[test]
    fn test_expiry_attaches_to_next_pair_only() {
        let expiry_ms: u64 = 33_177_600_000_000; // year 3021, well in the future

        let mut first = vec![OP_EXPIRE_MS];
        first.extend_from_slice(&expiry_ms.to_le_bytes());
        first.extend_from_slice(&string_record("temp"));
        first.extend_from_slice(&string_record("1"));

        let mut second = string_record("keep");
        second.extend_from_slice(&string_record("2"));

        let entries = parse_snapshot(&snapshot(&[&first, &second])).unwrap();

        assert_eq!(
            entries.get("temp").unwrap().expires_at,
            Some(Timestamp::from_millisecond(expiry_ms as i64).unwrap())
        );
        assert_eq!(entries.get("keep").unwrap().expires_at, None);
    }

    #[test]
    fn test_expiry_seconds_is_little_endian() {
        let epoch_s: u32 = 1_956_528_000;

        let mut record = vec![OP_EXPIRE_S];
        record.extend_from_slice(&epoch_s.to_le_bytes());
        record.extend_from_slice(&string_record("k"));
        record.extend_from_slice(&string_record("v"));

        let entries = parse_snapshot(&snapshot(&[&record])).unwrap();
        assert_eq!(
            entries.get("k").unwrap().expires_at,
            Some(Timestamp::from_second(epoch_s as i64).unwrap())
        );
    }

    #[test]
    fn test_value_type_marker_is_skipped() {
        // A 0x00 marker byte decodes as an empty key and is skipped; the
        // following bytes carry the real pair.
        let mut record = vec![0x00];
        record.extend_from_slice(&string_record("foo"));
        record.extend_from_slice(&string_record("bar"));

        let entries = parse_snapshot(&snapshot(&[&record])).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries.get("foo").unwrap().payload,
            Bytes::from_static(b"bar")
        );
    }

    #[test]
    fn test_aux_and_resizedb_records_are_consumed() {
        let mut aux = vec![OP_AUX];
        aux.extend_from_slice(&string_record("redis-ver"));
        aux.extend_from_slice(&string_record("7.2.0"));

        let resize = vec![OP_RESIZE_DB, 0x01, 0x00];

        let mut pair = string_record("a");
        pair.extend_from_slice(&string_record("1"));

        let entries = parse_snapshot(&snapshot(&[&aux, &resize, &pair])).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("a"));
    }

    #[test]
    fn test_integer_encoded_value() {
        let mut record = string_record("count");
        record.extend_from_slice(&[0xc0, 0x2a]); // int8 encoding of 42

        let entries = parse_snapshot(&snapshot(&[&record])).unwrap();
        assert_eq!(
            entries.get("count").unwrap().payload,
            Bytes::from_static(b"42")
        );
    }

    #[test]
    fn test_bytes_after_eof_are_ignored() {
        let mut buf = snapshot(&[]);
        buf.extend_from_slice(b"trailing garbage");
        assert_eq!(parse_snapshot(&buf), Ok(HashMap::new()));
    }

    #[test]
    fn test_truncated_snapshot_fails() {
        let mut pair = string_record("foo");
        pair.extend_from_slice(&string_record("bar"));
        let mut buf = snapshot(&[&pair]);
        buf.truncate(buf.len() - 12); // cut into the pair

        assert_eq!(parse_snapshot(&buf), Err(LoaderError::UnexpectedEof));
    }

    #[test]
    fn test_empty_snapshot_constant_has_no_select_db() {
        // The embedded full-resync payload carries no SELECTDB record, so
        // loading it yields a loader error rather than entries. The caller
        // treats that as an empty store.
        assert!(parse_snapshot(super::super::EMPTY_SNAPSHOT).is_err());
    }
}
