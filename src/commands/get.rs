use crate::commands::{Command, CommandError, CommandOutcome};
use crate::context::ServerContext;
use crate::resp::RespValue;

pub async fn get(ctx: &ServerContext, command: &Command) -> Result<CommandOutcome, CommandError> {
    if command.args.len() != 1 {
        return Err(CommandError::WrongArity("get"));
    }
    let key = command.arg_str(0)?;

    let mut store = ctx.store().lock().await;

    let frame = match store.get(key) {
        Some(entry) => RespValue::BulkString(entry.payload.clone()).encode(),
        None => RespValue::NullBulkString.encode(),
    };

    Ok(CommandOutcome::Response(frame))
}
