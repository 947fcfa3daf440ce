//! RESP wire codec.
//!
//! Frames are byte-strings and are not required to be valid UTF-8. The
//! decoder is incremental: it consumes at most one top-level frame from the
//! front of a buffer and reports how many bytes that frame occupied, so the
//! caller can account replication offsets from the exact wire length.

use bytes::Bytes;
use thiserror::Error;

/// Errors raised while decoding a frame. Any of these is fatal for the
/// connection that produced the bytes.
#[derive(Error, Debug, PartialEq)]
pub enum ProtocolError {
    #[error("unknown frame type byte 0x{0:02x}")]
    UnknownFrameType(u8),
    #[error("invalid frame length")]
    InvalidLength,
    #[error("invalid integer payload")]
    InvalidInteger,
    #[error("frame header is not valid UTF-8")]
    InvalidHeader,
    #[error("bulk string not terminated by CRLF")]
    UnterminatedBulkString,
    #[error("stream ended in the middle of a frame")]
    Truncated,
}

/// A single RESP value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    NullBulkString,
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Decodes one top-level frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` when the buffer does not yet hold a complete
    /// frame, and `Ok(Some((bytes_consumed, value)))` once it does. A
    /// malformed frame fails with a [`ProtocolError`].
    pub fn decode(buf: &[u8]) -> Result<Option<(usize, RespValue)>, ProtocolError> {
        Self::decode_at(buf, 0)
    }

    fn decode_at(buf: &[u8], pos: usize) -> Result<Option<(usize, RespValue)>, ProtocolError> {
        let Some(&kind) = buf.get(pos) else {
            return Ok(None);
        };
        let Some((line, after_line)) = find_line(buf, pos + 1) else {
            return Ok(None);
        };

        match kind {
            b'+' => Ok(Some((after_line, RespValue::SimpleString(header_text(line)?)))),
            b'-' => Ok(Some((after_line, RespValue::Error(header_text(line)?)))),
            b':' => Ok(Some((after_line, RespValue::Integer(parse_integer(line)?)))),
            b'$' => {
                let declared = parse_length(line)?;
                let Some(length) = declared else {
                    return Ok(Some((after_line, RespValue::NullBulkString)));
                };

                if buf.len() < after_line + length + 2 {
                    return Ok(None);
                }
                if &buf[after_line + length..after_line + length + 2] != b"\r\n" {
                    return Err(ProtocolError::UnterminatedBulkString);
                }

                let payload = Bytes::copy_from_slice(&buf[after_line..after_line + length]);
                Ok(Some((after_line + length + 2, RespValue::BulkString(payload))))
            }
            b'*' => {
                let Some(count) = parse_length(line)? else {
                    return Err(ProtocolError::InvalidLength);
                };

                let mut elements = Vec::with_capacity(count);
                let mut cursor = after_line;

                for _ in 0..count {
                    match Self::decode_at(buf, cursor)? {
                        Some((next, element)) => {
                            cursor = next;
                            elements.push(element);
                        }
                        None => return Ok(None),
                    }
                }

                Ok(Some((cursor, RespValue::Array(elements))))
            }
            other => Err(ProtocolError::UnknownFrameType(other)),
        }
    }

    /// Encodes the value as a complete RESP frame.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            RespValue::SimpleString(s) => format!("+{}\r\n", s).into_bytes(),
            RespValue::Error(s) => format!("-{}\r\n", s).into_bytes(),
            RespValue::Integer(i) => format!(":{}\r\n", i).into_bytes(),
            RespValue::BulkString(payload) => {
                let mut out = format!("${}\r\n", payload.len()).into_bytes();
                out.extend_from_slice(payload);
                out.extend_from_slice(b"\r\n");
                out
            }
            RespValue::NullBulkString => b"$-1\r\n".to_vec(),
            RespValue::Array(elements) => {
                let mut out = format!("*{}\r\n", elements.len()).into_bytes();
                for element in elements {
                    out.extend_from_slice(&element.encode());
                }
                out
            }
        }
    }
}

/// Encodes an array of bulk strings, the shape every request takes.
pub fn encode_bulk_array<I, B>(items: I) -> Vec<u8>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let items: Vec<B> = items.into_iter().collect();
    let mut out = format!("*{}\r\n", items.len()).into_bytes();

    for item in items {
        let bytes = item.as_ref();
        out.extend_from_slice(format!("${}\r\n", bytes.len()).as_bytes());
        out.extend_from_slice(bytes);
        out.extend_from_slice(b"\r\n");
    }

    out
}

/// Encodes the snapshot payload sent after a full resync.
///
/// This is the single deviation from bulk-string framing on the wire: the
/// payload is raw bytes after the length header, with no trailing CRLF.
pub fn encode_snapshot(payload: &[u8]) -> Vec<u8> {
    let mut out = format!("${}\r\n", payload.len()).into_bytes();
    out.extend_from_slice(payload);
    out
}

fn find_line(buf: &[u8], start: usize) -> Option<(&[u8], usize)> {
    if start > buf.len() {
        return None;
    }

    let offset = buf[start..].windows(2).position(|pair| pair == b"\r\n")?;
    Some((&buf[start..start + offset], start + offset + 2))
}

fn header_text(line: &[u8]) -> Result<String, ProtocolError> {
    std::str::from_utf8(line)
        .map(|s| s.to_string())
        .map_err(|_| ProtocolError::InvalidHeader)
}

fn parse_integer(line: &[u8]) -> Result<i64, ProtocolError> {
    std::str::from_utf8(line)
        .map_err(|_| ProtocolError::InvalidInteger)?
        .parse::<i64>()
        .map_err(|_| ProtocolError::InvalidInteger)
}

/// Parses a length header. `-1` is the null marker and maps to `None`;
/// any other negative value is malformed.
fn parse_length(line: &[u8]) -> Result<Option<usize>, ProtocolError> {
    let value = std::str::from_utf8(line)
        .map_err(|_| ProtocolError::InvalidLength)?
        .parse::<i64>()
        .map_err(|_| ProtocolError::InvalidLength)?;

    match value {
        -1 => Ok(None),
        v if v < 0 => Err(ProtocolError::InvalidLength),
        v => Ok(Some(v as usize)),
    }
}
