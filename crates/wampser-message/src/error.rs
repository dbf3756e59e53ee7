use wampser_codec::CodecError;

/// A message could not be built from the given field values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionError {
    /// An ID is outside `1..=2^53`.
    #[error("invalid {field} ID {value} (must be in 1..=2^53)")]
    InvalidId { field: &'static str, value: u64 },

    /// A URI is empty or malformed.
    #[error("invalid {field} URI '{value}'")]
    InvalidUri { field: &'static str, value: String },

    /// Any other field-level violation.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// A session message was built without any roles.
    #[error("at least one role is required")]
    MissingRoles,
}

/// A payload or value does not conform to the message model.
///
/// Every failure on the untrusted decode path surfaces as this type.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The payload could not be decoded by the wire format.
    #[error("malformed payload: {0}")]
    Codec(#[from] CodecError),

    /// The decoded value is not a non-empty list starting with a type tag.
    #[error("invalid message structure: {0}")]
    NotAMessage(String),

    /// The type tag does not name a known message kind.
    #[error("unknown message type {0}")]
    UnknownMessageType(u64),

    /// A required field is absent.
    #[error("{message}: missing required field {field}")]
    MissingField {
        message: &'static str,
        field: &'static str,
    },

    /// A field is present but has the wrong type or value.
    #[error("{message}: invalid {field}: {reason}")]
    InvalidField {
        message: &'static str,
        field: &'static str,
        reason: String,
    },

    /// The transport frame type does not match the serializer's format.
    #[error("frame type mismatch (binary {got_binary}, expected {expected_binary})")]
    FrameTypeMismatch {
        expected_binary: bool,
        got_binary: bool,
    },

    /// An unbatched payload carried no message.
    #[error("empty payload")]
    EmptyPayload,
}

impl ProtocolError {
    pub(crate) fn invalid(
        message: &'static str,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            message,
            field,
            reason: reason.into(),
        }
    }

    /// Re-tag a construction failure raised while rebuilding a decoded message.
    pub(crate) fn from_construction(message: &'static str, err: ConstructionError) -> Self {
        let field = match &err {
            ConstructionError::InvalidId { field, .. }
            | ConstructionError::InvalidUri { field, .. }
            | ConstructionError::InvalidField { field, .. } => *field,
            ConstructionError::MissingRoles => "roles",
        };
        Self::InvalidField {
            message,
            field,
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConstructionError>;
