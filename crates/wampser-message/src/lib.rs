//! Typed WAMP messages.
//!
//! Every message kind is a struct with validated fields, a positional
//! marshal/unmarshal pair over [`wampser_codec::Value`], and a
//! [`SerializationCache`] that memoizes encoded payloads per serializer.
//! [`Message`] is the closed sum of all kinds.

mod fields;

pub mod cache;
pub mod error;
pub mod error_message;
pub mod message;
pub mod policy;
pub mod pubsub;
pub mod rpc;
pub mod session;
pub mod validate;

pub use cache::{SerializationCache, SerializerId};
pub use error::{ConstructionError, ProtocolError, Result};
pub use error_message::{ErrorMessage, ERROR_REQUEST_TYPES};
pub use message::{Message, WampMessage};
pub use policy::{CancelMode, InvokePolicy, MatchPolicy};
pub use pubsub::{Event, Publish, Published, Subscribe, Subscribed, Unsubscribe, Unsubscribed};
pub use rpc::{
    Call, CallResult, Cancel, Interrupt, Invocation, Register, Registered, Unregister,
    Unregistered, Yield,
};
pub use session::{Abort, Goodbye, Hello, Role, Roles, Welcome, CLOSE_NORMAL};
pub use validate::{check_id, check_timeout, check_uri, check_uri_pattern, MAX_ID, MAX_TIMEOUT};
