use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, trace};
use wampser_codec::{CodecError, Format, WireCodec};
use wampser_message::{Message, ProtocolError, SerializerId};

use crate::config::SerializerConfig;
use crate::stats::{RatedStats, RatingPolicy, SizeRating, StatsReport, StatsSnapshot};

type StatsCallback = Box<dyn FnMut(StatsSnapshot) + Send>;

struct AutoReset {
    message_limit: u64,
    duration: Duration,
    callback: StatsCallback,
}

/// Converts messages to payloads for one wire format and batching mode.
///
/// Each instance has its own [`SerializerId`], so payloads it caches on a
/// message are only reused by the same instance. Cache hits are not counted
/// in the statistics.
pub struct Serializer {
    codec: WireCodec,
    id: SerializerId,
    rating: Box<dyn RatingPolicy>,
    serialized: RatedStats,
    unserialized: RatedStats,
    autoreset: Option<AutoReset>,
    last_reset: Instant,
}

impl Serializer {
    /// Unbatched serializer with default config.
    pub fn new(format: Format) -> Self {
        Self::with_config(format, SerializerConfig::default())
    }

    /// Batched serializer with default config.
    pub fn batched(format: Format) -> Self {
        Self::with_config(format, SerializerConfig::batched())
    }

    pub fn with_config(format: Format, config: SerializerConfig) -> Self {
        let codec =
            WireCodec::new(format, config.batched).with_max_record(config.max_batch_record);
        Self {
            codec,
            id: SerializerId::allocate(format, config.batched),
            rating: Box::new(SizeRating::new(config.rated_message_size)),
            serialized: RatedStats::default(),
            unserialized: RatedStats::default(),
            autoreset: None,
            last_reset: Instant::now(),
        }
    }

    /// Look up a serializer by name, e.g. `"cbor"` or `"json.batched"`.
    pub fn from_name(name: &str) -> Option<Self> {
        let (format, batched) = Format::parse_serializer(name)?;
        Some(Self::from_parts(format, batched))
    }

    /// Look up a serializer by WebSocket subprotocol, e.g. `"wamp.2.msgpack"`.
    pub fn from_subprotocol(subprotocol: &str) -> Option<Self> {
        let (format, batched) = Format::from_subprotocol(subprotocol)?;
        Some(Self::from_parts(format, batched))
    }

    fn from_parts(format: Format, batched: bool) -> Self {
        if batched {
            Self::batched(format)
        } else {
            Self::new(format)
        }
    }

    /// Replace the rating rule.
    pub fn with_rating(mut self, rating: impl RatingPolicy + 'static) -> Self {
        self.rating = Box::new(rating);
        self
    }

    pub fn id(&self) -> SerializerId {
        self.id
    }

    pub fn format(&self) -> Format {
        self.codec.format()
    }

    pub fn is_batched(&self) -> bool {
        self.codec.is_batched()
    }

    /// Whether payloads travel in binary transport frames.
    pub fn is_binary(&self) -> bool {
        self.codec.is_binary()
    }

    /// Serializer name, e.g. `"json.batched"`.
    pub fn name(&self) -> String {
        if self.is_batched() {
            format!("{}.batched", self.format().id())
        } else {
            self.format().id().to_string()
        }
    }

    pub fn subprotocol(&self) -> String {
        self.format().subprotocol(self.is_batched())
    }

    /// Serialize a message, reusing the payload this serializer cached on it.
    ///
    /// Returns the payload and whether it must go in a binary frame.
    pub fn serialize(&mut self, message: &mut Message) -> Result<(Bytes, bool), CodecError> {
        if let Some(payload) = message.cache().get(&self.id) {
            trace!(
                serializer = %self.id,
                message = message.name(),
                "serialization cache hit"
            );
            return Ok((payload.clone(), self.codec.is_binary()));
        }

        let value = message.marshal();
        let (payload, is_binary) = self.codec.encode(&value)?;
        message.cache_mut().insert(self.id, payload.clone());

        let rated = self.rating.rate(payload.len(), 1);
        self.serialized.record(payload.len(), rated);
        trace!(
            serializer = %self.id,
            message = message.name(),
            bytes = payload.len(),
            "serialized"
        );
        self.check_autoreset();
        Ok((payload, is_binary))
    }

    /// Decode a payload into its messages.
    ///
    /// An unbatched serializer always yields exactly one message; a batched
    /// one yields one per record, possibly none.
    pub fn unserialize(&mut self, payload: &[u8]) -> Result<Vec<Message>, ProtocolError> {
        if !self.is_batched() && payload.is_empty() {
            return Err(ProtocolError::EmptyPayload);
        }
        let values = self.codec.decode(payload).map_err(|err| {
            debug!(serializer = %self.id, error = %err, "payload decode failed");
            ProtocolError::from(err)
        })?;

        let messages = values
            .iter()
            .map(Message::unmarshal)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                debug!(serializer = %self.id, error = %err, "message unmarshal failed");
                err
            })?;

        let rated = self.rating.rate(payload.len(), messages.len());
        self.unserialized.record(payload.len(), rated);
        trace!(
            serializer = %self.id,
            bytes = payload.len(),
            messages = messages.len(),
            "unserialized"
        );
        self.check_autoreset();
        Ok(messages)
    }

    /// Like [`Serializer::unserialize`], but first checks that the transport
    /// frame type matches the format.
    pub fn unserialize_frame(
        &mut self,
        payload: &[u8],
        is_binary: bool,
    ) -> Result<Vec<Message>, ProtocolError> {
        let expected_binary = self.is_binary();
        if is_binary != expected_binary {
            debug!(
                serializer = %self.id,
                expected_binary,
                got_binary = is_binary,
                "frame type mismatch"
            );
            return Err(ProtocolError::FrameTypeMismatch {
                expected_binary,
                got_binary: is_binary,
            });
        }
        self.unserialize(payload)
    }

    /// Read and reset the counters.
    ///
    /// With `details` the two directions are reported separately, otherwise
    /// they are summed. Both trackers are reset either way and the auto-reset
    /// timer restarts.
    pub fn stats(&mut self, details: bool) -> StatsReport {
        let serialized = self.serialized.take();
        let unserialized = self.unserialized.take();
        self.last_reset = Instant::now();
        if details {
            StatsReport::Detailed {
                serialized,
                unserialized,
            }
        } else {
            StatsReport::Merged(serialized.merge(unserialized))
        }
    }

    /// Counters accumulated since the last reset, without resetting them.
    pub fn pending_stats(&self) -> StatsSnapshot {
        self.serialized.snapshot().merge(self.unserialized.snapshot())
    }

    /// Drain the counters into `callback` once `message_limit` operations
    /// have been counted or `duration` has passed since the last reset.
    ///
    /// A zero limit or zero duration disables that trigger. The callback runs
    /// inline on the serializing thread and must not block.
    pub fn set_stats_autoreset<F>(&mut self, message_limit: u64, duration: Duration, callback: F)
    where
        F: FnMut(StatsSnapshot) + Send + 'static,
    {
        debug!(
            serializer = %self.id,
            message_limit,
            ?duration,
            "stats autoreset configured"
        );
        self.autoreset = Some(AutoReset {
            message_limit,
            duration,
            callback: Box::new(callback),
        });
        self.last_reset = Instant::now();
    }

    pub fn clear_stats_autoreset(&mut self) {
        self.autoreset = None;
    }

    fn check_autoreset(&mut self) {
        let Some(autoreset) = self.autoreset.as_mut() else {
            return;
        };
        let messages = self.serialized.messages() + self.unserialized.messages();
        let by_count = autoreset.message_limit > 0 && messages >= autoreset.message_limit;
        let by_time =
            !autoreset.duration.is_zero() && self.last_reset.elapsed() >= autoreset.duration;
        if !by_count && !by_time {
            return;
        }

        let snapshot = self.serialized.take().merge(self.unserialized.take());
        self.last_reset = Instant::now();
        debug!(
            serializer = %self.id,
            bytes = snapshot.bytes,
            messages = snapshot.messages,
            rated_messages = snapshot.rated_messages,
            by_count,
            by_time,
            "stats autoreset"
        );
        (autoreset.callback)(snapshot);
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("id", &self.id)
            .field("codec", &self.codec)
            .field("rating", &self.rating)
            .field("serialized", &self.serialized.snapshot())
            .field("unserialized", &self.unserialized.snapshot())
            .field("autoreset", &self.autoreset.is_some())
            .finish()
    }
}

/// One serializer per format, unbatched then batched.
pub fn all_serializers() -> Vec<Serializer> {
    let mut serializers = Vec::with_capacity(Format::ALL.len() * 2);
    for batched in [false, true] {
        for format in Format::ALL {
            serializers.push(Serializer::from_parts(format, batched));
        }
    }
    serializers
}
