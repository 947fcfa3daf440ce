use std::sync::atomic::Ordering;

use crate::commands::{
    command::Command, config_get, echo, error::CommandError, get, info, keys, ping, psync,
    replconf, set, type_command, wait, xadd,
};
use crate::context::ServerContext;

/// What the connection handler should do with a handled command.
#[derive(Debug, PartialEq)]
pub enum CommandOutcome {
    /// Write this frame back to the peer.
    Response(Vec<u8>),
    /// Write nothing.
    Silent,
    /// Write the full-resync header and snapshot, then promote the peer
    /// to a replica.
    FullResync {
        header: Vec<u8>,
        snapshot: Vec<u8>,
    },
}

/// Routes one command to its handler.
///
/// On a master, a successful mutation is then re-encoded and propagated
/// to every attached replica, and the frame's byte length is added to the
/// cumulative propagation offset, in that order.
pub async fn dispatch_client(
    ctx: &ServerContext,
    peer: &str,
    command: &Command,
) -> Result<CommandOutcome, CommandError> {
    let outcome = match command.name.as_str() {
        "PING" => ping::ping(ctx, command)?,
        "ECHO" => echo::echo(command)?,
        "GET" => get::get(ctx, command).await?,
        "SET" => set::set(ctx, command).await?,
        "INFO" => info::info(ctx, command)?,
        "REPLCONF" => replconf::replconf(ctx, peer, command).await?,
        "PSYNC" => psync::psync(ctx, command)?,
        "WAIT" => wait::wait(ctx, command).await?,
        "CONFIG" => config_get::config_get(ctx, command)?,
        "KEYS" => keys::keys(ctx, command).await?,
        "TYPE" => type_command::type_command(ctx, command).await?,
        "XADD" => xadd::xadd(ctx, command).await?,
        other => return Err(CommandError::UnknownCommand(other.to_string())),
    };

    if let ServerContext::Master(master) = ctx {
        if command.is_write() {
            let frame = command.encode();
            master.replicas.propagate(&frame).await;
            master
                .prop_offset
                .fetch_add(frame.len() as u64, Ordering::SeqCst);
        }
    }

    Ok(outcome)
}
