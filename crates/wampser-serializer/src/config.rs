use wampser_codec::DEFAULT_MAX_RECORD;

/// Default payload size counted as one rated message.
pub const DEFAULT_RATED_MESSAGE_SIZE: usize = 512;

/// Serializer construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerConfig {
    /// Wrap every payload in the batched framing of the format.
    pub batched: bool,
    /// Payload bytes that count as one rated message.
    pub rated_message_size: usize,
    /// Largest single record accepted inside a batched payload.
    pub max_batch_record: usize,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            batched: false,
            rated_message_size: DEFAULT_RATED_MESSAGE_SIZE,
            max_batch_record: DEFAULT_MAX_RECORD,
        }
    }
}

impl SerializerConfig {
    /// Default options with batching switched on.
    pub fn batched() -> Self {
        Self {
            batched: true,
            ..Self::default()
        }
    }
}
