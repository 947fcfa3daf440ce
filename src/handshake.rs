//! The outbound handshake a replica performs against its master before
//! entering the replication read loop: PING, both REPLCONF announcements,
//! then PSYNC, followed by consuming the full-resync snapshot.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::config;
use crate::connection::{ConnectionError, FrameReader};
use crate::resp;
use crate::resp::RespValue;

#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("I/O error during handshake: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("master closed the connection during the handshake")]
    ConnectionClosed,
    #[error("unexpected reply from master: {0}")]
    UnexpectedReply(String),
    #[error("master sent an invalid FULLRESYNC header")]
    InvalidFullResync,
}

/// Runs the handshake over an already-connected socket. On success the
/// master's snapshot has been consumed and the next frame on `reader` is
/// the first propagated command.
pub async fn perform_handshake<R, W>(
    reader: &mut FrameReader<R>,
    writer: &mut W,
    listening_port: u16,
) -> Result<(), HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let reply = exchange(reader, writer, &[b"PING"]).await?;
    if reply != "PONG" {
        return Err(HandshakeError::UnexpectedReply(reply));
    }

    let port = listening_port.to_string();
    let reply = exchange(
        reader,
        writer,
        &[b"REPLCONF", b"listening-port", port.as_bytes()],
    )
    .await?;
    if reply != "OK" {
        return Err(HandshakeError::UnexpectedReply(reply));
    }

    let reply = exchange(reader, writer, &[b"REPLCONF", b"capa", b"psync2"]).await?;
    if reply != "OK" {
        return Err(HandshakeError::UnexpectedReply(reply));
    }

    let reply = exchange(reader, writer, &[b"PSYNC", b"?", b"-1"]).await?;
    validate_full_resync(&reply)?;

    // The snapshot that follows is the master's empty database; consuming
    // it leaves the reader positioned at the first propagated command.
    reader.read_snapshot().await?;

    Ok(())
}

async fn exchange<R, W>(
    reader: &mut FrameReader<R>,
    writer: &mut W,
    parts: &[&[u8]],
) -> Result<String, HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(&resp::encode_bulk_array(parts)).await?;
    writer.flush().await?;

    match reader.read_frame().await? {
        Some((_, RespValue::SimpleString(reply))) => Ok(reply),
        Some((_, other)) => Err(HandshakeError::UnexpectedReply(format!("{:?}", other))),
        None => Err(HandshakeError::ConnectionClosed),
    }
}

fn validate_full_resync(reply: &str) -> Result<(), HandshakeError> {
    let parts: Vec<&str> = reply.split_whitespace().collect();

    if parts.len() != 3 || parts[0] != "FULLRESYNC" {
        return Err(HandshakeError::InvalidFullResync);
    }

    if !config::is_repl_id(parts[1]) || parts[2].parse::<u64>().is_err() {
        return Err(HandshakeError::InvalidFullResync);
    }

    Ok(())
}
