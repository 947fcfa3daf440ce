use bytes::Bytes;
use jiff::{SignedDuration, Timestamp};

use crate::commands::{Command, CommandError, CommandOutcome};
use crate::context::ServerContext;
use crate::resp::RespValue;

pub struct SetArguments {
    key: String,
    value: Bytes,
    expires_at: Option<Timestamp>,
}

impl SetArguments {
    /// Accepts `SET key value` and `SET key value PX <ms>`.
    pub fn parse(command: &Command) -> Result<Self, CommandError> {
        if command.args.len() != 2 && command.args.len() != 4 {
            return Err(CommandError::WrongArity("set"));
        }

        let key = command.arg_str(0)?.to_string();
        let value = command.args[1].clone();

        let mut expires_at = None;

        if command.args.len() == 4 {
            if !command.arg_str(2)?.eq_ignore_ascii_case("px") {
                return Err(CommandError::SyntaxError);
            }

            let ms = command
                .arg_str(3)?
                .parse::<i64>()
                .map_err(|_| CommandError::InvalidExpiry)?;

            let deadline = Timestamp::now()
                .checked_add(SignedDuration::from_millis(ms))
                .map_err(|_| CommandError::InvalidExpiry)?;

            expires_at = Some(deadline);
        }

        Ok(Self {
            key,
            value,
            expires_at,
        })
    }
}

/// Stores a string value. A master acknowledges with OK; a replica applies
/// the write silently, whether it arrived from its master or from a
/// client.
pub async fn set(ctx: &ServerContext, command: &Command) -> Result<CommandOutcome, CommandError> {
    let args = SetArguments::parse(command)?;

    let mut store = ctx.store().lock().await;
    store.set(args.key, args.value, args.expires_at);
    drop(store);

    if ctx.is_master() {
        Ok(CommandOutcome::Response(
            RespValue::SimpleString("OK".to_string()).encode(),
        ))
    } else {
        Ok(CommandOutcome::Silent)
    }
}
