//! WAMP serializers.
//!
//! A [`Serializer`] binds one wire format (and batching mode) to the message
//! model: it turns a [`wampser_message::Message`] into a payload and back,
//! memoizes payloads on the message, and keeps rated traffic counters for
//! both directions.

pub mod config;
pub mod serializer;
pub mod stats;

pub use config::{SerializerConfig, DEFAULT_RATED_MESSAGE_SIZE};
pub use serializer::{all_serializers, Serializer};
pub use stats::{RatedStats, RatingPolicy, SizeRating, StatsReport, StatsSnapshot};
