use crate::commands::{Command, CommandError, CommandOutcome};
use crate::context::ServerContext;
use crate::resp::RespValue;

pub async fn type_command(
    ctx: &ServerContext,
    command: &Command,
) -> Result<CommandOutcome, CommandError> {
    if command.args.len() != 1 {
        return Err(CommandError::WrongArity("type"));
    }
    let key = command.arg_str(0)?;

    let store = ctx.store().lock().await;
    let kind = store.type_of(key);

    Ok(CommandOutcome::Response(
        RespValue::SimpleString(kind.as_str().to_string()).encode(),
    ))
}
