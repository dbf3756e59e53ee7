use crate::format::Format;

/// Errors that can occur while encoding or decoding wire payloads.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The value contains something the target format cannot represent.
    #[error("{format} encode failed: {message}")]
    Encode { format: Format, message: String },

    /// The payload is not valid for the format.
    #[error("{format} decode failed: {message}")]
    Decode { format: Format, message: String },

    /// A length-prefixed batch record announces more bytes than are present.
    #[error("truncated batch record (need {needed} bytes, have {available})")]
    TruncatedBatch { needed: usize, available: usize },

    /// A separator-delimited batch ends with a record that has no terminator.
    #[error("unterminated batch record ({trailing} trailing bytes)")]
    UnterminatedRecord { trailing: usize },

    /// A single batch record exceeds the configured maximum size.
    #[error("batch record too large ({size} bytes, max {max})")]
    RecordTooLarge { size: usize, max: usize },
}

impl CodecError {
    pub(crate) fn encode(format: Format, err: impl std::fmt::Display) -> Self {
        Self::Encode {
            format,
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(format: Format, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            format,
            message: err.to_string(),
        }
    }

    /// True for failures caused by the payload rather than the local value.
    pub fn is_decode(&self) -> bool {
        !matches!(self, Self::Encode { .. })
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
