use std::fmt;
use std::io;

use wampser_codec::CodecError;
use wampser_message::ProtocolError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Encoding failures on a message we built ourselves are internal errors;
/// decoding failures mean the input was bad.
pub fn codec_error(context: &str, err: CodecError) -> CliError {
    let code = if err.is_decode() {
        DATA_INVALID
    } else {
        INTERNAL
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn protocol_error(context: &str, err: ProtocolError) -> CliError {
    match err {
        ProtocolError::Codec(err) => codec_error(context, err),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn unknown_serializer(name: &str) -> CliError {
    CliError::new(
        USAGE,
        format!("unknown serializer '{name}' (see `wampser formats`)"),
    )
}
