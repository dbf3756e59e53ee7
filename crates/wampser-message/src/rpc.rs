//! Remote procedure call messages.

use wampser_codec::{Dict, Value};

use crate::cache::SerializationCache;
use crate::error::{ConstructionError, ProtocolError, Result};
use crate::fields::{push_payload, put};
use crate::message::{
    cache_accessors, fields, id_pair_message, payload_accessors, WampMessage,
};
use crate::policy::{CancelMode, InvokePolicy, MatchPolicy};
use crate::validate::{check_id, check_timeout, check_uri, check_uri_pattern};

/// Call a procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    request: u64,
    procedure: String,
    args: Vec<Value>,
    kwargs: Dict,
    timeout: Option<u64>,
    receive_progress: Option<bool>,
    disclose_me: Option<bool>,
    cache: SerializationCache,
}

impl Call {
    pub fn new(request: u64, procedure: impl Into<String>) -> Result<Self> {
        Ok(Self {
            request: check_id("request", request)?,
            procedure: check_uri("procedure", procedure)?,
            args: Vec::new(),
            kwargs: Dict::new(),
            timeout: None,
            receive_progress: None,
            disclose_me: None,
            cache: SerializationCache::default(),
        })
    }

    pub fn request(&self) -> u64 {
        self.request
    }

    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    /// Call timeout in milliseconds.
    pub fn timeout(&self) -> Option<u64> {
        self.timeout
    }

    pub fn receive_progress(&self) -> Option<bool> {
        self.receive_progress
    }

    pub fn disclose_me(&self) -> Option<bool> {
        self.disclose_me
    }

    payload_accessors!();

    /// Fails for timeouts above [`MAX_TIMEOUT`](crate::validate::MAX_TIMEOUT).
    pub fn with_timeout(mut self, millis: u64) -> Result<Self> {
        self.timeout = Some(check_timeout(millis)?);
        self.cache.clear();
        Ok(self)
    }

    pub fn with_receive_progress(mut self, receive_progress: bool) -> Self {
        self.receive_progress = Some(receive_progress);
        self.cache.clear();
        self
    }

    pub fn with_disclose_me(mut self, disclose_me: bool) -> Self {
        self.disclose_me = Some(disclose_me);
        self.cache.clear();
        self
    }
}

impl WampMessage for Call {
    const MESSAGE_TYPE: u64 = 48;
    const NAME: &'static str = "CALL";

    fn marshal(&self) -> Value {
        let mut options = Dict::new();
        put(&mut options, "timeout", self.timeout);
        put(&mut options, "receive_progress", self.receive_progress);
        put(&mut options, "disclose_me", self.disclose_me);
        let mut out = vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::from(self.request),
            Value::Map(options),
            Value::from(self.procedure.as_str()),
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
            procedure: f.uri(3, "Procedure")?,
            args: f.args(4)?,
            kwargs: f.kwargs(5)?,
            timeout: options.integer("timeout")?,
            receive_progress: options.bool("receive_progress")?,
            disclose_me: options.bool("disclose_me")?,
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}

/// Cancel an outstanding CALL.
#[derive(Debug, Clone, PartialEq)]
pub struct Cancel {
    request: u64,
    mode: Option<CancelMode>,
    cache: SerializationCache,
}

impl Cancel {
    pub fn new(request: u64) -> Result<Self> {
        Ok(Self {
            request: check_id("request", request)?,
            mode: None,
            cache: SerializationCache::default(),
        })
    }

    pub fn request(&self) -> u64 {
        self.request
    }

    pub fn mode(&self) -> Option<CancelMode> {
        self.mode
    }

    pub fn with_mode(mut self, mode: CancelMode) -> Self {
        self.mode = Some(mode);
        self.cache.clear();
        self
    }
}

impl WampMessage for Cancel {
    const MESSAGE_TYPE: u64 = 49;
    const NAME: &'static str = "CANCEL";

    fn marshal(&self) -> Value {
        let mut options = Dict::new();
        put(&mut options, "mode", self.mode.map(CancelMode::as_str));
        Value::List(vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::from(self.request),
            Value::Map(options),
        ])
    }

    fn unmarshal(items: &[Value]) -> std::result::Result<Self, ProtocolError> {
        let f = fields::<Self>(items)?;
        let request = f.id(1, "Request")?;
        let options = f.dict(2, "Options")?;
        Ok(Self {
            request,
            mode: options.choice("mode", CancelMode::parse)?,
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}

/// Result of a CALL, possibly a progressive one.
#[derive(Debug, Clone, PartialEq)]
pub struct CallResult {
    request: u64,
    args: Vec<Value>,
    kwargs: Dict,
    progress: Option<bool>,
    cache: SerializationCache,
}

impl CallResult {
    pub fn new(request: u64) -> Result<Self> {
        Ok(Self {
            request: check_id("request", request)?,
            args: Vec::new(),
            kwargs: Dict::new(),
            progress: None,
            cache: SerializationCache::default(),
        })
    }

    pub fn request(&self) -> u64 {
        self.request
    }

    pub fn progress(&self) -> Option<bool> {
        self.progress
    }

    payload_accessors!();

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = Some(progress);
        self.cache.clear();
        self
    }
}

impl WampMessage for CallResult {
    const MESSAGE_TYPE: u64 = 50;
    const NAME: &'static str = "RESULT";

    fn marshal(&self) -> Value {
        let mut details = Dict::new();
        put(&mut details, "progress", self.progress);
        let mut out = vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::from(self.request),
            Value::Map(details),
        ];
        push_payload(&mut out, &self.args, &self.kwargs);
        Value::List(out)
    }

    fn unmarshal(items: &[Value]) -> std::result::Result<Self, ProtocolError> {
        let f = fields::<Self>(items)?;
        let request = f.id(1, "Request")?;
        let details = f.dict(2, "Details")?;
        Ok(Self {
            request,
            args: f.args(3)?,
            kwargs: f.kwargs(4)?,
            progress: details.bool("progress")?,
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}

/// Register a procedure or procedure pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Register {
    request: u64,
    procedure: String,
    match_policy: MatchPolicy,
    invoke: InvokePolicy,
    cache: SerializationCache,
}

impl Register {
    pub fn new(request: u64, procedure: impl Into<String>) -> Result<Self> {
        Self::pattern(request, procedure, MatchPolicy::Exact)
    }

    pub fn pattern(
        request: u64,
        procedure: impl Into<String>,
        policy: MatchPolicy,
    ) -> Result<Self> {
        Ok(Self {
            request: check_id("request", request)?,
            procedure: check_uri_pattern("procedure", procedure, policy)?,
            match_policy: policy,
            invoke: InvokePolicy::default(),
            cache: SerializationCache::default(),
        })
    }

    pub fn request(&self) -> u64 {
        self.request
    }

    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    pub fn match_policy(&self) -> MatchPolicy {
        self.match_policy
    }

    pub fn invoke(&self) -> InvokePolicy {
        self.invoke
    }

    pub fn with_invoke(mut self, invoke: InvokePolicy) -> Self {
        self.invoke = invoke;
        self.cache.clear();
        self
    }
}

impl WampMessage for Register {
    const MESSAGE_TYPE: u64 = 64;
    const NAME: &'static str = "REGISTER";

    fn marshal(&self) -> Value {
        let mut options = Dict::new();
        if self.match_policy != MatchPolicy::Exact {
            put(&mut options, "match", Some(self.match_policy.as_str()));
        }
        if self.invoke != InvokePolicy::Single {
            put(&mut options, "invoke", Some(self.invoke.as_str()));
        }
        Value::List(vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::from(self.request),
            Value::Map(options),
            Value::from(self.procedure.as_str()),
        ])
    }

    fn unmarshal(items: &[Value]) -> std::result::Result<Self, ProtocolError> {
        let f = fields::<Self>(items)?;
        let request = f.id(1, "Request")?;
        let options = f.dict(2, "Options")?;
        let match_policy = options.choice("match", MatchPolicy::parse)?.unwrap_or_default();
        Ok(Self {
            request,
            procedure: f.uri_pattern(3, "Procedure", match_policy)?,
            match_policy,
            invoke: options.choice("invoke", InvokePolicy::parse)?.unwrap_or_default(),
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}

id_pair_message!(
    /// Acknowledgement of a REGISTER.
    Registered, 65, "REGISTERED", registration, "Registration"
);

id_pair_message!(
    /// Withdraw a registration.
    Unregister, 66, "UNREGISTER", registration, "Registration"
);

/// Acknowledgement of an UNREGISTER.
#[derive(Debug, Clone, PartialEq)]
pub struct Unregistered {
    request: u64,
    cache: SerializationCache,
}

impl Unregistered {
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

impl WampMessage for Unregistered {
    const MESSAGE_TYPE: u64 = 67;
    const NAME: &'static str = "UNREGISTERED";

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

/// A dealer asking a callee to run a registered procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    request: u64,
    registration: u64,
    args: Vec<Value>,
    kwargs: Dict,
    timeout: Option<u64>,
    receive_progress: Option<bool>,
    caller: Option<u64>,
    procedure: Option<String>,
    cache: SerializationCache,
}

impl Invocation {
    pub fn new(request: u64, registration: u64) -> Result<Self> {
        Ok(Self {
            request: check_id("request", request)?,
            registration: check_id("registration", registration)?,
            args: Vec::new(),
            kwargs: Dict::new(),
            timeout: None,
            receive_progress: None,
            caller: None,
            procedure: None,
            cache: SerializationCache::default(),
        })
    }

    pub fn request(&self) -> u64 {
        self.request
    }

    pub fn registration(&self) -> u64 {
        self.registration
    }

    pub fn timeout(&self) -> Option<u64> {
        self.timeout
    }

    pub fn receive_progress(&self) -> Option<bool> {
        self.receive_progress
    }

    pub fn caller(&self) -> Option<u64> {
        self.caller
    }

    pub fn procedure(&self) -> Option<&str> {
        self.procedure.as_deref()
    }

    payload_accessors!();

    /// Fails for timeouts above [`MAX_TIMEOUT`](crate::validate::MAX_TIMEOUT).
    pub fn with_timeout(mut self, millis: u64) -> Result<Self> {
        self.timeout = Some(check_timeout(millis)?);
        self.cache.clear();
        Ok(self)
    }

    pub fn with_receive_progress(mut self, receive_progress: bool) -> Self {
        self.receive_progress = Some(receive_progress);
        self.cache.clear();
        self
    }

    /// Session ID of the disclosed caller.
    pub fn with_caller(mut self, session: u64) -> Result<Self> {
        self.caller = Some(check_id("caller", session)?);
        self.cache.clear();
        Ok(self)
    }

    /// Concrete procedure, for pattern-based registrations.
    pub fn with_procedure(mut self, procedure: impl Into<String>) -> Result<Self> {
        self.procedure = Some(check_uri("procedure", procedure)?);
        self.cache.clear();
        Ok(self)
    }
}

impl WampMessage for Invocation {
    const MESSAGE_TYPE: u64 = 68;
    const NAME: &'static str = "INVOCATION";

    fn marshal(&self) -> Value {
        let mut details = Dict::new();
        put(&mut details, "timeout", self.timeout);
        put(&mut details, "receive_progress", self.receive_progress);
        put(&mut details, "caller", self.caller);
        put(&mut details, "procedure", self.procedure.as_deref());
        let mut out = vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::from(self.request),
            Value::from(self.registration),
            Value::Map(details),
        ];
        push_payload(&mut out, &self.args, &self.kwargs);
        Value::List(out)
    }

    fn unmarshal(items: &[Value]) -> std::result::Result<Self, ProtocolError> {
        let f = fields::<Self>(items)?;
        let request = f.id(1, "Request")?;
        let registration = f.id(2, "Registration")?;
        let details = f.dict(3, "Details")?;
        Ok(Self {
            request,
            registration,
            args: f.args(4)?,
            kwargs: f.kwargs(5)?,
            timeout: details.integer("timeout")?,
            receive_progress: details.bool("receive_progress")?,
            caller: details.id("caller")?,
            procedure: details.uri("procedure")?,
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}

fn check_interrupt_mode(mode: CancelMode) -> Result<CancelMode> {
    match mode {
        CancelMode::Skip => Err(ConstructionError::InvalidField {
            field: "mode",
            reason: "'skip' is not valid for INTERRUPT".to_string(),
        }),
        other => Ok(other),
    }
}

/// A dealer asking a callee to stop a running invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Interrupt {
    request: u64,
    mode: Option<CancelMode>,
    cache: SerializationCache,
}

impl Interrupt {
    pub fn new(request: u64) -> Result<Self> {
        Ok(Self {
            request: check_id("request", request)?,
            mode: None,
            cache: SerializationCache::default(),
        })
    }

    pub fn request(&self) -> u64 {
        self.request
    }

    pub fn mode(&self) -> Option<CancelMode> {
        self.mode
    }

    /// Only `kill` and `killnowait` are accepted.
    pub fn with_mode(mut self, mode: CancelMode) -> Result<Self> {
        self.mode = Some(check_interrupt_mode(mode)?);
        self.cache.clear();
        Ok(self)
    }
}

impl WampMessage for Interrupt {
    const MESSAGE_TYPE: u64 = 69;
    const NAME: &'static str = "INTERRUPT";

    fn marshal(&self) -> Value {
        let mut options = Dict::new();
        put(&mut options, "mode", self.mode.map(CancelMode::as_str));
        Value::List(vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::from(self.request),
            Value::Map(options),
        ])
    }

    fn unmarshal(items: &[Value]) -> std::result::Result<Self, ProtocolError> {
        let f = fields::<Self>(items)?;
        let request = f.id(1, "Request")?;
        let options = f.dict(2, "Options")?;
        let mode = match options.choice("mode", CancelMode::parse)? {
            Some(mode) => Some(
                check_interrupt_mode(mode)
                    .map_err(|err| ProtocolError::from_construction(Self::NAME, err))?,
            ),
            None => None,
        };
        Ok(Self {
            request,
            mode,
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}

/// A callee's answer to an INVOCATION.
#[derive(Debug, Clone, PartialEq)]
pub struct Yield {
    request: u64,
    args: Vec<Value>,
    kwargs: Dict,
    progress: Option<bool>,
    cache: SerializationCache,
}

impl Yield {
    pub fn new(request: u64) -> Result<Self> {
        Ok(Self {
            request: check_id("request", request)?,
            args: Vec::new(),
            kwargs: Dict::new(),
            progress: None,
            cache: SerializationCache::default(),
        })
    }

    pub fn request(&self) -> u64 {
        self.request
    }

    pub fn progress(&self) -> Option<bool> {
        self.progress
    }

    payload_accessors!();

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = Some(progress);
        self.cache.clear();
        self
    }
}

impl WampMessage for Yield {
    const MESSAGE_TYPE: u64 = 70;
    const NAME: &'static str = "YIELD";

    fn marshal(&self) -> Value {
        let mut options = Dict::new();
        put(&mut options, "progress", self.progress);
        let mut out = vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::from(self.request),
            Value::Map(options),
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
            args: f.args(3)?,
            kwargs: f.kwargs(4)?,
            progress: options.bool("progress")?,
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kwargs() -> Dict {
        let mut kwargs = Dict::new();
        kwargs.insert("foo".to_string(), Value::from(23));
        kwargs.insert("bar".to_string(), Value::from("hello"));
        kwargs
    }

    #[test]
    fn call_layout_matches_wire_order() {
        let call = Call::new(123456, "com.myapp.procedure1")
            .unwrap()
            .with_args(vec![Value::from(1), Value::from(2), Value::from(3)])
            .with_kwargs(kwargs());
        let value = call.marshal();
        let items = value.as_list().unwrap();
        assert_eq!(items.len(), 6);
        assert_eq!(items[0], Value::from(48));
        assert_eq!(items[1], Value::from(123456));
        assert_eq!(items[2], Value::Map(Dict::new()));
        assert_eq!(items[3], Value::from("com.myapp.procedure1"));
        assert_eq!(Call::unmarshal(items).unwrap(), call);
    }

    #[test]
    fn call_rejects_bad_fields() {
        assert!(matches!(
            Call::new(0, "com.myapp.procedure1"),
            Err(ConstructionError::InvalidId { field: "request", .. })
        ));
        assert!(matches!(
            Call::new(1, "com.myapp..procedure1"),
            Err(ConstructionError::InvalidUri { .. })
        ));
    }

    #[test]
    fn call_options_round_trip() {
        let call = Call::new(1, "com.myapp.procedure1")
            .unwrap()
            .with_timeout(5000)
            .unwrap()
            .with_receive_progress(true);
        let value = call.marshal();
        let options = value.as_list().unwrap()[2].as_map().unwrap();
        assert_eq!(options["timeout"], Value::from(5000u64));
        assert!(!options.contains_key("disclose_me"));
        assert_eq!(Call::unmarshal(value.as_list().unwrap()).unwrap(), call);
    }

    #[test]
    fn timeout_bounds() {
        use crate::validate::MAX_TIMEOUT;

        let call = Call::new(1, "com.myapp.p")
            .unwrap()
            .with_timeout(MAX_TIMEOUT)
            .unwrap();
        let value = call.marshal();
        assert_eq!(Call::unmarshal(value.as_list().unwrap()).unwrap(), call);

        assert!(matches!(
            Call::new(1, "com.myapp.p").unwrap().with_timeout(u64::MAX),
            Err(ConstructionError::InvalidField {
                field: "timeout",
                ..
            })
        ));
        assert!(Invocation::new(1, 2)
            .unwrap()
            .with_timeout(1 << 63)
            .is_err());

        let invocation = Invocation::new(1, 2).unwrap().with_timeout(0).unwrap();
        let value = invocation.marshal();
        assert_eq!(
            Invocation::unmarshal(value.as_list().unwrap()).unwrap().timeout(),
            Some(0)
        );
    }

    #[test]
    fn extra_fields_and_unknown_options_are_ignored() {
        let mut options = Dict::new();
        options.insert("x_custom".to_string(), Value::from(true));
        let items = [
            Value::from(50),
            Value::from(9),
            Value::Map(options),
            Value::List(vec![Value::from(1)]),
            Value::Map(Dict::new()),
            Value::from("trailing"),
        ];
        let result = CallResult::unmarshal(&items).unwrap();
        assert_eq!(result.args(), &[Value::from(1)]);
        assert_eq!(result.progress(), None);
    }

    #[test]
    fn result_emits_empty_args_when_only_kwargs() {
        let result = CallResult::new(7).unwrap().with_kwargs(kwargs());
        let value = result.marshal();
        let items = value.as_list().unwrap();
        assert_eq!(items[3], Value::List(vec![]));
        assert_eq!(items[4], Value::Map(kwargs()));
    }

    #[test]
    fn register_policies() {
        let register = Register::pattern(1, "com.myapp..proc", MatchPolicy::Wildcard)
            .unwrap()
            .with_invoke(InvokePolicy::RoundRobin);
        let value = register.marshal();
        let options = value.as_list().unwrap()[2].as_map().unwrap();
        assert_eq!(options["match"], Value::from("wildcard"));
        assert_eq!(options["invoke"], Value::from("roundrobin"));
        assert_eq!(Register::unmarshal(value.as_list().unwrap()).unwrap(), register);

        let plain = Register::new(1, "com.myapp.proc").unwrap().marshal();
        assert_eq!(plain.as_list().unwrap()[2], Value::Map(Dict::new()));
    }

    #[test]
    fn interrupt_rejects_skip() {
        assert!(Interrupt::new(1).unwrap().with_mode(CancelMode::Skip).is_err());

        let mut options = Dict::new();
        options.insert("mode".to_string(), Value::from("skip"));
        let items = [Value::from(69), Value::from(1), Value::Map(options)];
        assert!(matches!(
            Interrupt::unmarshal(&items),
            Err(ProtocolError::InvalidField { field: "mode", .. })
        ));
    }

    #[test]
    fn cancel_accepts_skip() {
        let cancel = Cancel::new(123456).unwrap().with_mode(CancelMode::Skip);
        let value = cancel.marshal();
        assert_eq!(Cancel::unmarshal(value.as_list().unwrap()).unwrap(), cancel);
    }

    #[test]
    fn registered_and_unregister_share_layout() {
        let registered = Registered::new(123456, 789123).unwrap();
        assert_eq!(registered.registration(), 789123);
        assert_eq!(
            registered.marshal(),
            Value::List(vec![Value::from(65), Value::from(123456), Value::from(789123)])
        );
        let items = [Value::from(66), Value::from(1), Value::from(0)];
        assert!(matches!(
            Unregister::unmarshal(&items),
            Err(ProtocolError::InvalidField {
                field: "Registration",
                ..
            })
        ));
    }
}
