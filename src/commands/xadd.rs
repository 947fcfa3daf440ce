use bytes::Bytes;
use jiff::Timestamp;

use crate::commands::{Command, CommandError, CommandOutcome};
use crate::context::ServerContext;
use crate::resp::RespValue;
use crate::stream::EntryIdSpec;

pub struct XaddArguments {
    key: String,
    id: EntryIdSpec,
    fields: Vec<(Bytes, Bytes)>,
}

impl XaddArguments {
    /// Accepts `XADD key id field value [field value ...]` with at least
    /// one pair and an even field/value tail.
    pub fn parse(command: &Command) -> Result<Self, CommandError> {
        if command.args.len() < 4 || command.args[2..].len() % 2 != 0 {
            return Err(CommandError::WrongArity("xadd"));
        }

        let key = command.arg_str(0)?.to_string();
        let id = EntryIdSpec::parse(command.arg_str(1)?)?;

        let fields = command.args[2..]
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();

        Ok(Self { key, id, fields })
    }
}

/// Appends an entry to a stream, creating the stream on first use. The
/// reply is the resolved entry ID; ordering violations come back as
/// semantic errors framed for the client.
pub async fn xadd(ctx: &ServerContext, command: &Command) -> Result<CommandOutcome, CommandError> {
    let args = XaddArguments::parse(command)?;

    let now_ms = Timestamp::now().as_millisecond().max(0) as u64;

    let mut store = ctx.store().lock().await;
    let id = store.stream_append(&args.key, args.id, args.fields, now_ms)?;

    Ok(CommandOutcome::Response(
        RespValue::BulkString(id.to_string().into()).encode(),
    ))
}
