use crate::commands::{Command, CommandError, CommandOutcome};
use crate::context::ServerContext;
use crate::resp::RespValue;

/// Handles PING. A master answers PONG; a replica stays silent so that
/// liveness pings forwarded over the replication link produce no traffic.
pub fn ping(ctx: &ServerContext, command: &Command) -> Result<CommandOutcome, CommandError> {
    if !command.args.is_empty() {
        return Err(CommandError::WrongArity("ping"));
    }

    if ctx.is_master() {
        Ok(CommandOutcome::Response(
            RespValue::SimpleString("PONG".to_string()).encode(),
        ))
    } else {
        Ok(CommandOutcome::Silent)
    }
}
