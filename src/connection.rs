//! Connection handling.
//!
//! Every accepted socket gets its own task running the read/dispatch/write
//! loop. A connection that issues PSYNC is promoted: its write half moves
//! into the replica registry and from then on the master only reads
//! acknowledgements from it. A replica process runs one extra loop against
//! its master's connection, applying propagated commands silently and
//! accounting consumed bytes.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::commands::{dispatch_client, Command, CommandOutcome};
use crate::context::{ReplicaContext, ServerContext};
use crate::resp::{ProtocolError, RespValue};

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A buffered RESP frame source over any byte stream.
///
/// Bytes are accumulated until a complete top-level frame parses; the
/// buffer persists across reads, so pipelined frames and frames split
/// across packets both decode correctly.
pub struct FrameReader<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Reads one frame, returning it with the number of wire bytes it
    /// occupied. `None` means the peer closed cleanly between frames.
    pub async fn read_frame(&mut self) -> Result<Option<(usize, RespValue)>, ConnectionError> {
        loop {
            if let Some((consumed, value)) = RespValue::decode(&self.buffer)? {
                self.buffer.advance(consumed);
                return Ok(Some((consumed, value)));
            }

            let n = self.reader.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(ProtocolError::Truncated.into());
            }
        }
    }

    /// Reads a full-resync snapshot payload: a bulk-string length header
    /// followed by that many raw bytes with no trailing CRLF.
    pub async fn read_snapshot(&mut self) -> Result<Vec<u8>, ConnectionError> {
        let header_end = loop {
            if let Some(pos) = self.buffer.windows(2).position(|pair| pair == b"\r\n") {
                break pos;
            }

            let n = self.reader.read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(ProtocolError::Truncated.into());
            }
        };

        if self.buffer.first() != Some(&b'$') {
            let found = self.buffer.first().copied().unwrap_or_default();
            return Err(ProtocolError::UnknownFrameType(found).into());
        }

        let length = std::str::from_utf8(&self.buffer[1..header_end])
            .map_err(|_| ProtocolError::InvalidLength)?
            .parse::<usize>()
            .map_err(|_| ProtocolError::InvalidLength)?;

        self.buffer.advance(header_end + 2);

        while self.buffer.len() < length {
            let n = self.reader.read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(ProtocolError::Truncated.into());
            }
        }

        Ok(self.buffer.split_to(length).to_vec())
    }
}

/// Accepts connections forever, one task per client.
pub async fn serve(listener: TcpListener, ctx: ServerContext) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    handle_client_connection(stream, peer.to_string(), ctx).await;
                });
            }
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
            }
        }
    }
}

/// The per-connection loop on the serving side.
pub async fn handle_client_connection(stream: TcpStream, peer: String, ctx: ServerContext) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let writer = Arc::new(Mutex::new(write_half));

    let mut peer_is_replica = false;

    loop {
        let frame = match reader.read_frame().await {
            Ok(Some((_consumed, frame))) => frame,
            Ok(None) => break,
            Err(e) => {
                warn!(%peer, error = %e, "closing connection");
                break;
            }
        };

        let command = match Command::from_resp(frame) {
            Ok(command) => command,
            Err(e) => {
                warn!(%peer, error = %e, "discarding malformed command");
                continue;
            }
        };

        match dispatch_client(&ctx, &peer, &command).await {
            Ok(CommandOutcome::Response(frame)) => {
                if let Err(e) = write_frame(&writer, &frame).await {
                    warn!(%peer, error = %e, "failed to write response");
                    break;
                }
            }
            Ok(CommandOutcome::Silent) => {}
            Ok(CommandOutcome::FullResync { header, snapshot }) => {
                let written = async {
                    write_frame(&writer, &header).await?;
                    write_frame(&writer, &snapshot).await
                }
                .await;

                if let Err(e) = written {
                    warn!(%peer, error = %e, "failed to complete full resync");
                    break;
                }

                if let ServerContext::Master(master) = &ctx {
                    master.replicas.add(&peer, Arc::clone(&writer)).await;
                    peer_is_replica = true;
                    info!(%peer, "replica attached after full resync");
                }
            }
            Err(e) => match e.response_frame() {
                Some(frame) => {
                    if let Err(e) = write_frame(&writer, &frame).await {
                        warn!(%peer, error = %e, "failed to write error response");
                        break;
                    }
                }
                None => {
                    warn!(%peer, command = %command.name, error = %e, "rejected command");
                }
            },
        }
    }

    if peer_is_replica {
        if let ServerContext::Master(master) = &ctx {
            master.replicas.remove(&peer).await;
            info!(%peer, "replica detached");
        }
    }

    debug!(%peer, "connection closed");
}

/// The replica-side loop reading propagated commands from the master.
///
/// Commands apply locally without replies. The exception is
/// `REPLCONF GETACK *`, answered with the offset as it stood before that
/// frame arrived; the frame's own length is accounted afterwards, like
/// every other frame's.
pub async fn handle_master_connection<R, W>(
    mut reader: FrameReader<R>,
    writer: Arc<Mutex<W>>,
    replica: Arc<ReplicaContext>,
    master_endpoint: String,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let ctx = ServerContext::Replica(Arc::clone(&replica));

    loop {
        let (consumed, frame) = match reader.read_frame().await {
            Ok(Some(result)) => result,
            Ok(None) => {
                info!(%master_endpoint, "master closed the replication stream");
                break;
            }
            Err(e) => {
                warn!(%master_endpoint, error = %e, "replication stream failed");
                break;
            }
        };

        let command = match Command::from_resp(frame) {
            Ok(command) => command,
            Err(e) => {
                debug!(%master_endpoint, error = %e, "ignoring non-command frame from master");
                replica
                    .upstream_offset
                    .fetch_add(consumed as u64, Ordering::SeqCst);
                continue;
            }
        };

        let is_getack = command.name == "REPLCONF" && command.has_subcommand("GETACK");

        match dispatch_client(&ctx, &master_endpoint, &command).await {
            Ok(CommandOutcome::Response(frame)) if is_getack => {
                if let Err(e) = write_frame(&writer, &frame).await {
                    warn!(%master_endpoint, error = %e, "failed to send acknowledgement");
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                debug!(%master_endpoint, command = %command.name, error = %e, "dropped command from master");
            }
        }

        replica
            .upstream_offset
            .fetch_add(consumed as u64, Ordering::SeqCst);
    }
}

async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &Arc<Mutex<W>>,
    frame: &[u8],
) -> std::io::Result<()> {
    let mut writer = writer.lock().await;
    writer.write_all(frame).await?;
    writer.flush().await
}
