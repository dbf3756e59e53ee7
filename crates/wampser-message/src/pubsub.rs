//! Publish & subscribe messages.

use wampser_codec::{Dict, Value};

use crate::cache::SerializationCache;
use crate::error::{ProtocolError, Result};
use crate::fields::{ids_value, push_payload, put};
use crate::message::{
    cache_accessors, fields, id_pair_message, payload_accessors, WampMessage,
};
use crate::policy::MatchPolicy;
use crate::validate::{check_id, check_ids, check_uri, check_uri_pattern};

/// Publish an event to a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Publish {
    request: u64,
    topic: String,
    args: Vec<Value>,
    kwargs: Dict,
    acknowledge: Option<bool>,
    exclude_me: Option<bool>,
    exclude: Option<Vec<u64>>,
    eligible: Option<Vec<u64>>,
    retain: Option<bool>,
    cache: SerializationCache,
}

impl Publish {
    pub fn new(request: u64, topic: impl Into<String>) -> Result<Self> {
        Ok(Self {
            request: check_id("request", request)?,
            topic: check_uri("topic", topic)?,
            args: Vec::new(),
            kwargs: Dict::new(),
            acknowledge: None,
            exclude_me: None,
            exclude: None,
            eligible: None,
            retain: None,
            cache: SerializationCache::default(),
        })
    }

    pub fn request(&self) -> u64 {
        self.request
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn acknowledge(&self) -> Option<bool> {
        self.acknowledge
    }

    pub fn exclude_me(&self) -> Option<bool> {
        self.exclude_me
    }

    pub fn exclude(&self) -> Option<&[u64]> {
        self.exclude.as_deref()
    }

    pub fn eligible(&self) -> Option<&[u64]> {
        self.eligible.as_deref()
    }

    pub fn retain(&self) -> Option<bool> {
        self.retain
    }

    payload_accessors!();

    pub fn with_acknowledge(mut self, acknowledge: bool) -> Self {
        self.acknowledge = Some(acknowledge);
        self.cache.clear();
        self
    }

    pub fn with_exclude_me(mut self, exclude_me: bool) -> Self {
        self.exclude_me = Some(exclude_me);
        self.cache.clear();
        self
    }

    /// Session IDs that must not receive the event.
    pub fn with_exclude(mut self, sessions: Vec<u64>) -> Result<Self> {
        self.exclude = Some(check_ids("exclude", sessions)?);
        self.cache.clear();
        Ok(self)
    }

    /// Restrict delivery to these session IDs.
    pub fn with_eligible(mut self, sessions: Vec<u64>) -> Result<Self> {
        self.eligible = Some(check_ids("eligible", sessions)?);
        self.cache.clear();
        Ok(self)
    }

    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = Some(retain);
        self.cache.clear();
        self
    }
}

impl WampMessage for Publish {
    const MESSAGE_TYPE: u64 = 16;
    const NAME: &'static str = "PUBLISH";

    fn marshal(&self) -> Value {
        let mut options = Dict::new();
        put(&mut options, "acknowledge", self.acknowledge);
        put(&mut options, "exclude_me", self.exclude_me);
        put(&mut options, "exclude", self.exclude.as_deref().map(ids_value));
        put(&mut options, "eligible", self.eligible.as_deref().map(ids_value));
        put(&mut options, "retain", self.retain);
        let mut out = vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::from(self.request),
            Value::Map(options),
            Value::from(self.topic.as_str()),
        ];
        push_payload(&mut out, &self.args, &self.kwargs);
        Value::List(out)
    }

    fn unmarshal(items: &[Value]) -> std::result::Result<Self, ProtocolError> {
        let f = fields::<Self>(items)?;
        let request = f.id(1, "Request")?;
        let options = f.dict(2, "Options")?;
        Ok(Self {
            request,
            topic: f.uri(3, "Topic")?,
            args: f.args(4)?,
            kwargs: f.kwargs(5)?,
            acknowledge: options.bool("acknowledge")?,
            exclude_me: options.bool("exclude_me")?,
            exclude: options.ids("exclude")?,
            eligible: options.ids("eligible")?,
            retain: options.bool("retain")?,
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}

id_pair_message!(
    /// Acknowledgement of an acknowledged PUBLISH.
    Published, 17, "PUBLISHED", publication, "Publication"
);

/// Subscribe to a topic or topic pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscribe {
    request: u64,
    topic: String,
    match_policy: MatchPolicy,
    cache: SerializationCache,
}

impl Subscribe {
    /// Exact-match subscription.
    pub fn new(request: u64, topic: impl Into<String>) -> Result<Self> {
        Self::pattern(request, topic, MatchPolicy::Exact)
    }

    /// Subscription whose topic is matched with `policy`.
    pub fn pattern(request: u64, topic: impl Into<String>, policy: MatchPolicy) -> Result<Self> {
        Ok(Self {
            request: check_id("request", request)?,
            topic: check_uri_pattern("topic", topic, policy)?,
            match_policy: policy,
            cache: SerializationCache::default(),
        })
    }

    pub fn request(&self) -> u64 {
        self.request
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn match_policy(&self) -> MatchPolicy {
        self.match_policy
    }
}

impl WampMessage for Subscribe {
    const MESSAGE_TYPE: u64 = 32;
    const NAME: &'static str = "SUBSCRIBE";

    fn marshal(&self) -> Value {
        let mut options = Dict::new();
        if self.match_policy != MatchPolicy::Exact {
            put(&mut options, "match", Some(self.match_policy.as_str()));
        }
        Value::List(vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::from(self.request),
            Value::Map(options),
            Value::from(self.topic.as_str()),
        ])
    }

    fn unmarshal(items: &[Value]) -> std::result::Result<Self, ProtocolError> {
        let f = fields::<Self>(items)?;
        let request = f.id(1, "Request")?;
        let options = f.dict(2, "Options")?;
        let match_policy = options.choice("match", MatchPolicy::parse)?.unwrap_or_default();
        Ok(Self {
            request,
            topic: f.uri_pattern(3, "Topic", match_policy)?,
            match_policy,
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}

id_pair_message!(
    /// Acknowledgement of a SUBSCRIBE.
    Subscribed, 33, "SUBSCRIBED", subscription, "Subscription"
);

id_pair_message!(
    /// Drop a subscription.
    Unsubscribe, 34, "UNSUBSCRIBE", subscription, "Subscription"
);

/// Acknowledgement of an UNSUBSCRIBE.
#[derive(Debug, Clone, PartialEq)]
pub struct Unsubscribed {
    request: u64,
    cache: SerializationCache,
}

impl Unsubscribed {
    pub fn new(request: u64) -> Result<Self> {
        Ok(Self {
            request: check_id("request", request)?,
            cache: SerializationCache::default(),
        })
    }

    pub fn request(&self) -> u64 {
        self.request
    }
}

impl WampMessage for Unsubscribed {
    const MESSAGE_TYPE: u64 = 35;
    const NAME: &'static str = "UNSUBSCRIBED";

    fn marshal(&self) -> Value {
        Value::List(vec![Value::from(Self::MESSAGE_TYPE), Value::from(self.request)])
    }

    fn unmarshal(items: &[Value]) -> std::result::Result<Self, ProtocolError> {
        let f = fields::<Self>(items)?;
        Ok(Self {
            request: f.id(1, "Request")?,
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}

/// An event delivered to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    subscription: u64,
    publication: u64,
    args: Vec<Value>,
    kwargs: Dict,
    publisher: Option<u64>,
    topic: Option<String>,
    retained: Option<bool>,
    cache: SerializationCache,
}

impl Event {
    pub fn new(subscription: u64, publication: u64) -> Result<Self> {
        Ok(Self {
            subscription: check_id("subscription", subscription)?,
            publication: check_id("publication", publication)?,
            args: Vec::new(),
            kwargs: Dict::new(),
            publisher: None,
            topic: None,
            retained: None,
            cache: SerializationCache::default(),
        })
    }

    pub fn subscription(&self) -> u64 {
        self.subscription
    }

    pub fn publication(&self) -> u64 {
        self.publication
    }

    pub fn publisher(&self) -> Option<u64> {
        self.publisher
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn retained(&self) -> Option<bool> {
        self.retained
    }

    payload_accessors!();

    /// Session ID of the disclosed publisher.
    pub fn with_publisher(mut self, session: u64) -> Result<Self> {
        self.publisher = Some(check_id("publisher", session)?);
        self.cache.clear();
        Ok(self)
    }

    /// Concrete topic, for pattern-based subscriptions.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Result<Self> {
        self.topic = Some(check_uri("topic", topic)?);
        self.cache.clear();
        Ok(self)
    }

    pub fn with_retained(mut self, retained: bool) -> Self {
        self.retained = Some(retained);
        self.cache.clear();
        self
    }
}

impl WampMessage for Event {
    const MESSAGE_TYPE: u64 = 36;
    const NAME: &'static str = "EVENT";

    fn marshal(&self) -> Value {
        let mut details = Dict::new();
        put(&mut details, "publisher", self.publisher);
        put(&mut details, "topic", self.topic.as_deref());
        put(&mut details, "retained", self.retained);
        let mut out = vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::from(self.subscription),
            Value::from(self.publication),
            Value::Map(details),
        ];
        push_payload(&mut out, &self.args, &self.kwargs);
        Value::List(out)
    }

    fn unmarshal(items: &[Value]) -> std::result::Result<Self, ProtocolError> {
        let f = fields::<Self>(items)?;
        let subscription = f.id(1, "Subscription")?;
        let publication = f.id(2, "Publication")?;
        let details = f.dict(3, "Details")?;
        Ok(Self {
            subscription,
            publication,
            args: f.args(4)?,
            kwargs: f.kwargs(5)?,
            publisher: details.id("publisher")?,
            topic: details.uri("topic")?,
            retained: details.bool("retained")?,
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}
