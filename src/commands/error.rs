use thiserror::Error;

use crate::resp::RespValue;
use crate::stream::StreamIdError;

/// Rejections raised while parsing or executing a command.
///
/// Usage errors (wrong arity, unknown verbs) are logged and produce no
/// reply; semantic errors are reported to the client as a simple-error
/// frame. Either way the connection survives.
#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("command frame must be an array of bulk strings")]
    MalformedFrame,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),
    #[error("argument must be valid UTF-8")]
    InvalidArgument,
    #[error("unknown INFO section")]
    UnknownInfoSection,
    #[error("syntax error")]
    SyntaxError,
    #[error("{0} is only available on a master")]
    MasterOnly(&'static str),
    #[error("invalid expire time in 'set' command")]
    InvalidExpiry,
    #[error("{0}")]
    StreamId(#[from] StreamIdError),
    #[error("unknown CONFIG GET parameter '{0}'")]
    UnknownConfigParameter(String),
    #[error("invalid KEYS pattern: {0}")]
    InvalidKeysPattern(String),
    #[error("invalid PSYNC replication ID")]
    InvalidReplicationId,
}

impl CommandError {
    /// The simple-error frame to send for semantic rejections, or `None`
    /// for usage errors that are only logged.
    pub fn response_frame(&self) -> Option<Vec<u8>> {
        match self {
            CommandError::StreamId(_)
            | CommandError::UnknownConfigParameter(_)
            | CommandError::InvalidKeysPattern(_)
            | CommandError::InvalidExpiry
            | CommandError::InvalidReplicationId => {
                Some(RespValue::Error(format!("ERR {}", self)).encode())
            }
            _ => None,
        }
    }
}
