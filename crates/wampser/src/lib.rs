//! WAMP message model and multi-format serializers.
//!
//! # Crate Structure
//!
//! - [`codec`]: Generic value tree, wire formats and batched framing
//! - [`message`]: Typed protocol messages with validation and payload caching
//! - [`serializer`]: Serializers with rated traffic statistics
//!
//! ```
//! use wampser::{Call, Format, Message, Serializer, Value};
//!
//! let mut serializer = Serializer::new(Format::Json);
//! let mut call: Message = Call::new(1, "com.myapp.add2")
//!     .unwrap()
//!     .with_args(vec![Value::from(2), Value::from(3)])
//!     .into();
//! let (payload, is_binary) = serializer.serialize(&mut call).unwrap();
//! assert!(!is_binary);
//! assert_eq!(serializer.unserialize(&payload).unwrap(), vec![call]);
//! ```

/// Re-export codec types.
pub mod codec {
    pub use wampser_codec::*;
}

/// Re-export message types.
pub mod message {
    pub use wampser_message::*;
}

/// Re-export serializer types.
pub mod serializer {
    pub use wampser_serializer::*;
}

pub use wampser_codec::{CodecError, Dict, Format, Value};
pub use wampser_message::{
    Abort, Call, CallResult, Cancel, CancelMode, ConstructionError, ErrorMessage, Event, Goodbye,
    Hello, Interrupt, InvokePolicy, Invocation, MatchPolicy, Message, ProtocolError, Publish,
    Published, Register, Registered, Role, Roles, SerializationCache, SerializerId, Subscribe,
    Subscribed, Unregister, Unregistered, Unsubscribe, Unsubscribed, WampMessage, Welcome, Yield,
};
pub use wampser_serializer::{
    all_serializers, RatingPolicy, Serializer, SerializerConfig, SizeRating, StatsReport,
    StatsSnapshot,
};
