//! ERROR, the failure reply to a request.

use wampser_codec::{Dict, Value};

use crate::cache::SerializationCache;
use crate::error::{ConstructionError, ProtocolError, Result};
use crate::fields::push_payload;
use crate::message::{cache_accessors, fields, payload_accessors, WampMessage};
use crate::pubsub::{Publish, Subscribe, Unsubscribe};
use crate::rpc::{Call, Cancel, Invocation, Register, Unregister};
use crate::validate::{check_id, check_uri};

/// Message types an ERROR may answer.
pub const ERROR_REQUEST_TYPES: [u64; 8] = [
    Subscribe::MESSAGE_TYPE,
    Unsubscribe::MESSAGE_TYPE,
    Publish::MESSAGE_TYPE,
    Register::MESSAGE_TYPE,
    Unregister::MESSAGE_TYPE,
    Call::MESSAGE_TYPE,
    Invocation::MESSAGE_TYPE,
    Cancel::MESSAGE_TYPE,
];

fn check_request_type(value: u64) -> Result<u64> {
    if ERROR_REQUEST_TYPES.contains(&value) {
        Ok(value)
    } else {
        Err(ConstructionError::InvalidField {
            field: "request_type",
            reason: format!("message type {value} cannot be answered with ERROR"),
        })
    }
}

/// Failure reply correlated with a request.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorMessage {
    request_type: u64,
    request: u64,
    details: Dict,
    error: String,
    args: Vec<Value>,
    kwargs: Dict,
    cache: SerializationCache,
}

impl ErrorMessage {
    pub fn new(request_type: u64, request: u64, error: impl Into<String>) -> Result<Self> {
        Ok(Self {
            request_type: check_request_type(request_type)?,
            request: check_id("request", request)?,
            details: Dict::new(),
            error: check_uri("error", error)?,
            args: Vec::new(),
            kwargs: Dict::new(),
            cache: SerializationCache::default(),
        })
    }

    pub fn request_type(&self) -> u64 {
        self.request_type
    }

    pub fn request(&self) -> u64 {
        self.request
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn details(&self) -> &Dict {
        &self.details
    }

    pub fn with_details(mut self, details: Dict) -> Self {
        self.details = details;
        self.cache.clear();
        self
    }

    payload_accessors!();
}

impl WampMessage for ErrorMessage {
    const MESSAGE_TYPE: u64 = 8;
    const NAME: &'static str = "ERROR";

    fn marshal(&self) -> Value {
        let mut out = vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::from(self.request_type),
            Value::from(self.request),
            Value::Map(self.details.clone()),
            Value::from(self.error.as_str()),
        ];
        push_payload(&mut out, &self.args, &self.kwargs);
        Value::List(out)
    }

    fn unmarshal(items: &[Value]) -> std::result::Result<Self, ProtocolError> {
        let f = fields::<Self>(items)?;
        let request_type = f.integer(1, "RequestType")?;
        check_request_type(request_type)
            .map_err(|err| ProtocolError::from_construction(Self::NAME, err))?;
        let request = f.id(2, "Request")?;
        let details = f.dict(3, "Details")?;
        Ok(Self {
            request_type,
            request,
            details: details.as_dict().clone(),
            error: f.uri(4, "Error")?,
            args: f.args(5)?,
            kwargs: f.kwargs(6)?,
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}
