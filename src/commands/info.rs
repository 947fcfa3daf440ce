use crate::commands::{Command, CommandError, CommandOutcome};
use crate::context::ServerContext;
use crate::resp::RespValue;

/// Handles `INFO replication`, the only section this server exposes.
pub fn info(ctx: &ServerContext, command: &Command) -> Result<CommandOutcome, CommandError> {
    if command.args.len() != 1 {
        return Err(CommandError::WrongArity("info"));
    }

    if !command.arg_str(0)?.eq_ignore_ascii_case("replication") {
        return Err(CommandError::UnknownInfoSection);
    }

    let body = format!(
        "# Replication\r\nrole:{}\r\nmaster_replid:{}\r\nmaster_repl_offset:{}\r\n",
        ctx.role_name(),
        ctx.repl_id(),
        ctx.repl_offset(),
    );

    Ok(CommandOutcome::Response(
        RespValue::BulkString(body.into()).encode(),
    ))
}
