use crate::commands::{Command, CommandError, CommandOutcome};
use crate::context::ServerContext;
use crate::rdb;
use crate::resp;
use crate::resp::RespValue;

/// Handles PSYNC from a connecting replica.
///
/// Every accepted PSYNC is answered with a full resync: the FULLRESYNC
/// header, then the built-in empty snapshot framed without a trailing
/// CRLF. The connection handler registers the peer as a replica once both
/// writes succeed.
pub fn psync(ctx: &ServerContext, command: &Command) -> Result<CommandOutcome, CommandError> {
    let ServerContext::Master(master) = ctx else {
        return Err(CommandError::MasterOnly("PSYNC"));
    };

    if command.args.len() != 2 {
        return Err(CommandError::WrongArity("psync"));
    }

    let requested_id = command.arg_str(0)?;
    if requested_id != "?" && requested_id != master.repl_id {
        return Err(CommandError::InvalidReplicationId);
    }

    command
        .arg_str(1)?
        .parse::<i64>()
        .map_err(|_| CommandError::SyntaxError)?;

    let header =
        RespValue::SimpleString(format!("FULLRESYNC {} 0", master.repl_id)).encode();
    let snapshot = resp::encode_snapshot(rdb::EMPTY_SNAPSHOT);

    Ok(CommandOutcome::FullResync { header, snapshot })
}
