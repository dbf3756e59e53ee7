//! The closed set of protocol messages and the behaviour they share.

use tracing::debug;
use wampser_codec::Value;

use crate::cache::SerializationCache;
use crate::error::ProtocolError;
use crate::fields::Fields;
use crate::error_message::ErrorMessage;
use crate::pubsub::{
    Event, Publish, Published, Subscribe, Subscribed, Unsubscribe, Unsubscribed,
};
use crate::rpc::{
    Call, CallResult, Cancel, Interrupt, Invocation, Register, Registered, Unregister,
    Unregistered, Yield,
};
use crate::session::{Abort, Goodbye, Hello, Welcome};

/// Behaviour common to every message kind.
pub trait WampMessage: Sized {
    /// Wire type tag, the first element of the marshalled list.
    const MESSAGE_TYPE: u64;
    /// Upper-case message name used in diagnostics.
    const NAME: &'static str;

    /// Convert to the positional list form. Absent optional fields are omitted.
    fn marshal(&self) -> Value;

    /// Rebuild from a positional list whose first element is the type tag.
    fn unmarshal(items: &[Value]) -> Result<Self, ProtocolError>;

    fn cache(&self) -> &SerializationCache;

    fn cache_mut(&mut self) -> &mut SerializationCache;

    /// Drop every cached payload.
    fn uncache(&mut self) {
        self.cache_mut().clear();
    }
}

/// Check the leading type tag and hand back a field reader.
pub(crate) fn fields<M: WampMessage>(items: &[Value]) -> Result<Fields<'_>, ProtocolError> {
    match items.first().and_then(Value::as_u64) {
        Some(tag) if tag == M::MESSAGE_TYPE => Ok(Fields::new(M::NAME, items)),
        Some(tag) => Err(ProtocolError::invalid(
            M::NAME,
            "MessageType",
            format!("expected {}, got {tag}", M::MESSAGE_TYPE),
        )),
        None => Err(ProtocolError::MissingField {
            message: M::NAME,
            field: "MessageType",
        }),
    }
}

macro_rules! cache_accessors {
    () => {
        fn cache(&self) -> &$crate::cache::SerializationCache {
            &self.cache
        }

        fn cache_mut(&mut self) -> &mut $crate::cache::SerializationCache {
            &mut self.cache
        }
    };
}

/// Accessors and builders for the trailing Arguments/ArgumentsKw pair.
macro_rules! payload_accessors {
    () => {
        pub fn args(&self) -> &[wampser_codec::Value] {
            &self.args
        }

        pub fn kwargs(&self) -> &wampser_codec::Dict {
            &self.kwargs
        }

        pub fn with_args(mut self, args: Vec<wampser_codec::Value>) -> Self {
            self.args = args;
            self.cache.clear();
            self
        }

        pub fn with_kwargs(mut self, kwargs: wampser_codec::Dict) -> Self {
            self.kwargs = kwargs;
            self.cache.clear();
            self
        }
    };
}

pub(crate) use cache_accessors;
pub(crate) use payload_accessors;

/// A message made of a request ID and one more ID.
macro_rules! id_pair_message {
    ($(#[$doc:meta])* $name:ident, $tag:expr, $wire:expr, $second:ident, $second_field:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            request: u64,
            $second: u64,
            cache: $crate::cache::SerializationCache,
        }

        impl $name {
            pub fn new(request: u64, $second: u64) -> $crate::error::Result<Self> {
                Ok(Self {
                    request: $crate::validate::check_id("request", request)?,
                    $second: $crate::validate::check_id(stringify!($second), $second)?,
                    cache: $crate::cache::SerializationCache::default(),
                })
            }

            pub fn request(&self) -> u64 {
                self.request
            }

            pub fn $second(&self) -> u64 {
                self.$second
            }
        }

        impl $crate::message::WampMessage for $name {
            const MESSAGE_TYPE: u64 = $tag;
            const NAME: &'static str = $wire;

            fn marshal(&self) -> wampser_codec::Value {
                wampser_codec::Value::List(vec![
                    wampser_codec::Value::from(Self::MESSAGE_TYPE),
                    wampser_codec::Value::from(self.request),
                    wampser_codec::Value::from(self.$second),
                ])
            }

            fn unmarshal(
                items: &[wampser_codec::Value],
            ) -> std::result::Result<Self, $crate::error::ProtocolError> {
                let f = $crate::message::fields::<Self>(items)?;
                Ok(Self {
                    request: f.id(1, "Request")?,
                    $second: f.id(2, $second_field)?,
                    cache: $crate::cache::SerializationCache::default(),
                })
            }

            $crate::message::cache_accessors!();
        }
    };
}

pub(crate) use id_pair_message;

macro_rules! messages {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// Any protocol message.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Message {
            $($variant($ty),)*
        }

        impl Message {
            pub fn message_type(&self) -> u64 {
                match self {
                    $(Message::$variant(_) => <$ty as WampMessage>::MESSAGE_TYPE,)*
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Message::$variant(_) => <$ty as WampMessage>::NAME,)*
                }
            }

            pub fn marshal(&self) -> Value {
                match self {
                    $(Message::$variant(inner) => inner.marshal(),)*
                }
            }

            pub fn cache(&self) -> &SerializationCache {
                match self {
                    $(Message::$variant(inner) => inner.cache(),)*
                }
            }

            pub fn cache_mut(&mut self) -> &mut SerializationCache {
                match self {
                    $(Message::$variant(inner) => inner.cache_mut(),)*
                }
            }

            /// Drop every cached payload. Field values are untouched.
            pub fn uncache(&mut self) {
                self.cache_mut().clear();
            }

            /// Rebuild a message from its generic value form.
            pub fn unmarshal(value: &Value) -> Result<Self, ProtocolError> {
                let items = value.as_list().ok_or_else(|| {
                    ProtocolError::NotAMessage(format!("expected list, got {}", value.kind()))
                })?;
                let tag = match items.first() {
                    Some(first) => first.as_u64().ok_or_else(|| {
                        ProtocolError::NotAMessage(format!(
                            "type tag must be a non-negative integer, got {}",
                            first.kind()
                        ))
                    })?,
                    None => return Err(ProtocolError::NotAMessage("empty list".to_string())),
                };
                $(
                    if tag == <$ty as WampMessage>::MESSAGE_TYPE {
                        return <$ty as WampMessage>::unmarshal(items).map(Message::$variant);
                    }
                )*
                debug!(tag, "unknown message type");
                Err(ProtocolError::UnknownMessageType(tag))
            }
        }

        $(
            impl From<$ty> for Message {
                fn from(message: $ty) -> Self {
                    Message::$variant(message)
                }
            }
        )*
    };
}

messages! {
    Hello(Hello),
    Welcome(Welcome),
    Abort(Abort),
    Goodbye(Goodbye),
    Error(ErrorMessage),
    Publish(Publish),
    Published(Published),
    Subscribe(Subscribe),
    Subscribed(Subscribed),
    Unsubscribe(Unsubscribe),
    Unsubscribed(Unsubscribed),
    Event(Event),
    Call(Call),
    Cancel(Cancel),
    Result(CallResult),
    Register(Register),
    Registered(Registered),
    Unregister(Unregister),
    Unregistered(Unregistered),
    Invocation(Invocation),
    Interrupt(Interrupt),
    Yield(Yield),
}
