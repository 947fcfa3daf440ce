use std::sync::atomic::Ordering;

use crate::commands::{Command, CommandError, CommandOutcome};
use crate::context::ServerContext;
use crate::resp;
use crate::resp::RespValue;

/// Handles REPLCONF in its three shapes.
///
/// `ACK <offset>` arrives on a master from a promoted replica connection:
/// it advances that replica's acknowledged offset and feeds any armed WAIT
/// barrier, with no reply. `GETACK *` arrives on a replica from its
/// master: the reply carries the bytes consumed from the master stream
/// before this frame. Anything else is handshake configuration and is
/// acknowledged with OK.
pub async fn replconf(
    ctx: &ServerContext,
    peer: &str,
    command: &Command,
) -> Result<CommandOutcome, CommandError> {
    if command.args.is_empty() {
        return Err(CommandError::WrongArity("replconf"));
    }

    if command.has_subcommand("ACK") {
        let ServerContext::Master(master) = ctx else {
            return Ok(CommandOutcome::Silent);
        };

        let offset = command
            .arg_str(1)?
            .parse::<u64>()
            .map_err(|_| CommandError::SyntaxError)?;

        master.replicas.ack(peer, offset).await;
        master.notify_ack().await;

        return Ok(CommandOutcome::Silent);
    }

    if command.has_subcommand("GETACK") {
        if let ServerContext::Replica(replica) = ctx {
            let offset = replica.upstream_offset.load(Ordering::SeqCst);
            let ack = resp::encode_bulk_array([
                b"REPLCONF".as_slice(),
                b"ACK",
                offset.to_string().as_bytes(),
            ]);
            return Ok(CommandOutcome::Response(ack));
        }
    }

    Ok(CommandOutcome::Response(
        RespValue::SimpleString("OK".to_string()).encode(),
    ))
}
