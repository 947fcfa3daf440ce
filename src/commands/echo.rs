use crate::commands::{Command, CommandError, CommandOutcome};
use crate::resp::RespValue;

pub fn echo(command: &Command) -> Result<CommandOutcome, CommandError> {
    if command.args.len() != 1 {
        return Err(CommandError::WrongArity("echo"));
    }

    Ok(CommandOutcome::Response(
        RespValue::BulkString(command.args[0].clone()).encode(),
    ))
}
