use bytes::Bytes;

use crate::commands::CommandError;
use crate::resp;
use crate::resp::RespValue;

/// A parsed request: the uppercased verb plus its raw byte-string
/// arguments. The original bulk strings are kept so the frame can be
/// re-encoded byte-for-byte when a mutation is propagated to replicas.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub args: Vec<Bytes>,
    raw: Vec<Bytes>,
}

impl Command {
    /// Parses a decoded RESP value into a command. Requests are always
    /// arrays of bulk strings with at least the verb element.
    pub fn from_resp(value: RespValue) -> Result<Self, CommandError> {
        let RespValue::Array(elements) = value else {
            return Err(CommandError::MalformedFrame);
        };

        let mut raw = Vec::with_capacity(elements.len());

        for element in elements {
            let RespValue::BulkString(payload) = element else {
                return Err(CommandError::MalformedFrame);
            };
            raw.push(payload);
        }

        let Some(verb) = raw.first() else {
            return Err(CommandError::MalformedFrame);
        };

        let name = std::str::from_utf8(verb)
            .map_err(|_| CommandError::MalformedFrame)?
            .to_uppercase();

        Ok(Self {
            name,
            args: raw[1..].to_vec(),
            raw,
        })
    }

    /// A text view of one argument, for arguments that must be UTF-8
    /// (keys, numbers, subcommands). Byte-string values should be read
    /// from `args` directly.
    pub fn arg_str(&self, index: usize) -> Result<&str, CommandError> {
        let arg = self
            .args
            .get(index)
            .ok_or(CommandError::MalformedFrame)?;

        std::str::from_utf8(arg).map_err(|_| CommandError::InvalidArgument)
    }

    /// True when the first argument equals `subcommand`, ignoring case.
    pub fn has_subcommand(&self, subcommand: &str) -> bool {
        self.arg_str(0)
            .map(|arg| arg.eq_ignore_ascii_case(subcommand))
            .unwrap_or(false)
    }

    /// Whether this verb mutates the store and must be propagated.
    pub fn is_write(&self) -> bool {
        matches!(self.name.as_str(), "SET" | "XADD")
    }

    /// Re-encodes the request exactly as an array of the original bulk
    /// strings.
    pub fn encode(&self) -> Vec<u8> {
        resp::encode_bulk_array(self.raw.iter())
    }
}
