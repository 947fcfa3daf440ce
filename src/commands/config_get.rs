use crate::commands::{Command, CommandError, CommandOutcome};
use crate::context::ServerContext;
use crate::resp::RespValue;

/// Handles `CONFIG GET <parameter>` for the two snapshot-location
/// parameters. The reply is a two-element array of name and value.
pub fn config_get(ctx: &ServerContext, command: &Command) -> Result<CommandOutcome, CommandError> {
    if command.args.len() != 2 {
        return Err(CommandError::WrongArity("config"));
    }

    if !command.has_subcommand("GET") {
        return Err(CommandError::SyntaxError);
    }

    let parameter = command.arg_str(1)?;
    let config = ctx.config();

    let value = match parameter {
        "dir" => config.dir.clone(),
        "dbfilename" => config.dbfilename.clone(),
        other => return Err(CommandError::UnknownConfigParameter(other.to_string())),
    };

    Ok(CommandOutcome::Response(
        RespValue::Array(vec![
            RespValue::BulkString(parameter.to_string().into()),
            RespValue::BulkString(value.into()),
        ])
        .encode(),
    ))
}
