use globset::Glob;

use crate::commands::{Command, CommandError, CommandOutcome};
use crate::context::ServerContext;
use crate::resp::RespValue;

/// Handles KEYS. The pattern is compiled as a glob and matched against the
/// string key-space only; `KEYS *` enumerates every string key.
pub async fn keys(ctx: &ServerContext, command: &Command) -> Result<CommandOutcome, CommandError> {
    if command.args.len() != 1 {
        return Err(CommandError::WrongArity("keys"));
    }

    let matcher = Glob::new(command.arg_str(0)?)
        .map_err(|e| CommandError::InvalidKeysPattern(e.to_string()))?
        .compile_matcher();

    let store = ctx.store().lock().await;

    let matched: Vec<RespValue> = store
        .keys()
        .filter(|key| matcher.is_match(key))
        .map(|key| RespValue::BulkString(key.clone().into()))
        .collect();

    Ok(CommandOutcome::Response(RespValue::Array(matched).encode()))
}
