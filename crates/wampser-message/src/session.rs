//! Session control: HELLO, WELCOME, ABORT, GOODBYE.

use std::collections::BTreeMap;
use std::fmt;

use wampser_codec::{Dict, Value};

use crate::cache::SerializationCache;
use crate::error::{ConstructionError, ProtocolError, Result};
use crate::fields::{put, strings_value, Options};
use crate::message::{cache_accessors, fields, WampMessage};
use crate::validate::{check_id, check_uri};

/// Default GOODBYE reason.
pub const CLOSE_NORMAL: &str = "wamp.close.normal";

/// A peer role announced during session establishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Publisher,
    Subscriber,
    Caller,
    Callee,
    Broker,
    Dealer,
}

impl Role {
    pub const CLIENT: [Role; 4] = [Role::Publisher, Role::Subscriber, Role::Caller, Role::Callee];
    pub const ROUTER: [Role; 2] = [Role::Broker, Role::Dealer];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Publisher => "publisher",
            Role::Subscriber => "subscriber",
            Role::Caller => "caller",
            Role::Callee => "callee",
            Role::Broker => "broker",
            Role::Dealer => "dealer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "publisher" => Some(Role::Publisher),
            "subscriber" => Some(Role::Subscriber),
            "caller" => Some(Role::Caller),
            "callee" => Some(Role::Callee),
            "broker" => Some(Role::Broker),
            "dealer" => Some(Role::Dealer),
            _ => None,
        }
    }

    pub fn is_client(self) -> bool {
        Self::CLIENT.contains(&self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Announced roles, each with its details dict (usually `{"features": {...}}`).
pub type Roles = BTreeMap<Role, Dict>;

fn check_side(role: Role, client: bool) -> Result<Role> {
    if role.is_client() != client {
        let side = if client { "client" } else { "router" };
        return Err(ConstructionError::InvalidField {
            field: "roles",
            reason: format!("'{role}' is not a {side} role"),
        });
    }
    Ok(role)
}

fn check_roles(roles: Roles, client: bool) -> Result<Roles> {
    if roles.is_empty() {
        return Err(ConstructionError::MissingRoles);
    }
    for role in roles.keys() {
        check_side(*role, client)?;
    }
    Ok(roles)
}

fn bare_roles(roles: impl IntoIterator<Item = Role>) -> Roles {
    roles.into_iter().map(|role| (role, Dict::new())).collect()
}

fn roles_value(roles: &Roles) -> Value {
    Value::Map(
        roles
            .iter()
            .map(|(role, details)| (role.as_str().to_string(), Value::Map(details.clone())))
            .collect(),
    )
}

fn parse_roles(
    message: &'static str,
    details: &Options<'_>,
    client: bool,
) -> std::result::Result<Roles, ProtocolError> {
    let map = details.map("roles")?.ok_or(ProtocolError::MissingField {
        message,
        field: "roles",
    })?;
    let mut roles = Roles::new();
    for (name, role_details) in map {
        let role = Role::parse(name).ok_or_else(|| {
            ProtocolError::invalid(message, "roles", format!("unknown role '{name}'"))
        })?;
        let role_details = role_details.as_map().ok_or_else(|| {
            ProtocolError::invalid(
                message,
                "roles",
                format!("'{name}' details must be a map, got {}", role_details.kind()),
            )
        })?;
        roles.insert(role, role_details.clone());
    }
    check_roles(roles, client).map_err(|err| ProtocolError::from_construction(message, err))
}

/// Client request to join a realm.
#[derive(Debug, Clone, PartialEq)]
pub struct Hello {
    realm: String,
    roles: Roles,
    authmethods: Option<Vec<String>>,
    authid: Option<String>,
    agent: Option<String>,
    cache: SerializationCache,
}

impl Hello {
    pub fn new(realm: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Result<Self> {
        Ok(Self {
            realm: check_uri("realm", realm)?,
            roles: check_roles(bare_roles(roles), true)?,
            authmethods: None,
            authid: None,
            agent: None,
            cache: SerializationCache::default(),
        })
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn role_details(&self, role: Role) -> Option<&Dict> {
        self.roles.get(&role)
    }

    /// Announce `role` with a details dict, replacing any earlier entry.
    pub fn with_role_details(mut self, role: Role, details: Dict) -> Result<Self> {
        self.roles.insert(check_side(role, true)?, details);
        self.cache.clear();
        Ok(self)
    }

    pub fn authmethods(&self) -> Option<&[String]> {
        self.authmethods.as_deref()
    }

    pub fn authid(&self) -> Option<&str> {
        self.authid.as_deref()
    }

    pub fn agent(&self) -> Option<&str> {
        self.agent.as_deref()
    }

    pub fn with_authmethods(mut self, methods: Vec<String>) -> Self {
        self.authmethods = Some(methods);
        self.cache.clear();
        self
    }

    pub fn with_authid(mut self, authid: impl Into<String>) -> Self {
        self.authid = Some(authid.into());
        self.cache.clear();
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self.cache.clear();
        self
    }
}

impl WampMessage for Hello {
    const MESSAGE_TYPE: u64 = 1;
    const NAME: &'static str = "HELLO";

    fn marshal(&self) -> Value {
        let mut details = Dict::new();
        details.insert("roles".to_string(), roles_value(&self.roles));
        put(&mut details, "authmethods", self.authmethods.as_deref().map(strings_value));
        put(&mut details, "authid", self.authid.as_deref());
        put(&mut details, "agent", self.agent.as_deref());
        Value::List(vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::from(self.realm.as_str()),
            Value::Map(details),
        ])
    }

    fn unmarshal(items: &[Value]) -> std::result::Result<Self, ProtocolError> {
        let f = fields::<Self>(items)?;
        let realm = f.uri(1, "Realm")?;
        let details = f.dict(2, "Details")?;
        Ok(Self {
            realm,
            roles: parse_roles(Self::NAME, &details, true)?,
            authmethods: details.strings("authmethods")?,
            authid: details.string("authid")?.map(str::to_string),
            agent: details.string("agent")?.map(str::to_string),
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}

/// Router acceptance of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Welcome {
    session: u64,
    roles: Roles,
    authid: Option<String>,
    authrole: Option<String>,
    authmethod: Option<String>,
    cache: SerializationCache,
}

impl Welcome {
    pub fn new(session: u64, roles: impl IntoIterator<Item = Role>) -> Result<Self> {
        Ok(Self {
            session: check_id("session", session)?,
            roles: check_roles(bare_roles(roles), false)?,
            authid: None,
            authrole: None,
            authmethod: None,
            cache: SerializationCache::default(),
        })
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn role_details(&self, role: Role) -> Option<&Dict> {
        self.roles.get(&role)
    }

    /// Announce `role` with a details dict, replacing any earlier entry.
    pub fn with_role_details(mut self, role: Role, details: Dict) -> Result<Self> {
        self.roles.insert(check_side(role, false)?, details);
        self.cache.clear();
        Ok(self)
    }

    pub fn authid(&self) -> Option<&str> {
        self.authid.as_deref()
    }

    pub fn authrole(&self) -> Option<&str> {
        self.authrole.as_deref()
    }

    pub fn authmethod(&self) -> Option<&str> {
        self.authmethod.as_deref()
    }

    pub fn with_authid(mut self, authid: impl Into<String>) -> Self {
        self.authid = Some(authid.into());
        self.cache.clear();
        self
    }

    pub fn with_authrole(mut self, authrole: impl Into<String>) -> Self {
        self.authrole = Some(authrole.into());
        self.cache.clear();
        self
    }

    pub fn with_authmethod(mut self, authmethod: impl Into<String>) -> Self {
        self.authmethod = Some(authmethod.into());
        self.cache.clear();
        self
    }
}

impl WampMessage for Welcome {
    const MESSAGE_TYPE: u64 = 2;
    const NAME: &'static str = "WELCOME";

    fn marshal(&self) -> Value {
        let mut details = Dict::new();
        details.insert("roles".to_string(), roles_value(&self.roles));
        put(&mut details, "authid", self.authid.as_deref());
        put(&mut details, "authrole", self.authrole.as_deref());
        put(&mut details, "authmethod", self.authmethod.as_deref());
        Value::List(vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::from(self.session),
            Value::Map(details),
        ])
    }

    fn unmarshal(items: &[Value]) -> std::result::Result<Self, ProtocolError> {
        let f = fields::<Self>(items)?;
        let session = f.id(1, "Session")?;
        let details = f.dict(2, "Details")?;
        Ok(Self {
            session,
            roles: parse_roles(Self::NAME, &details, false)?,
            authid: details.string("authid")?.map(str::to_string),
            authrole: details.string("authrole")?.map(str::to_string),
            authmethod: details.string("authmethod")?.map(str::to_string),
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}

/// Session establishment refused.
#[derive(Debug, Clone, PartialEq)]
pub struct Abort {
    reason: String,
    message: Option<String>,
    cache: SerializationCache,
}

impl Abort {
    pub fn new(reason: impl Into<String>) -> Result<Self> {
        Ok(Self {
            reason: check_uri("reason", reason)?,
            message: None,
            cache: SerializationCache::default(),
        })
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self.cache.clear();
        self
    }
}

impl WampMessage for Abort {
    const MESSAGE_TYPE: u64 = 3;
    const NAME: &'static str = "ABORT";

    fn marshal(&self) -> Value {
        let mut details = Dict::new();
        put(&mut details, "message", self.message.as_deref());
        Value::List(vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::Map(details),
            Value::from(self.reason.as_str()),
        ])
    }

    fn unmarshal(items: &[Value]) -> std::result::Result<Self, ProtocolError> {
        let f = fields::<Self>(items)?;
        let details = f.dict(1, "Details")?;
        Ok(Self {
            reason: f.uri(2, "Reason")?,
            message: details.string("message")?.map(str::to_string),
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}

/// Session close, sent by either peer and echoed by the other.
#[derive(Debug, Clone, PartialEq)]
pub struct Goodbye {
    reason: String,
    message: Option<String>,
    cache: SerializationCache,
}

impl Goodbye {
    /// A GOODBYE with reason `wamp.close.normal`.
    pub fn new() -> Self {
        Self {
            reason: CLOSE_NORMAL.to_string(),
            message: None,
            cache: SerializationCache::default(),
        }
    }

    pub fn with_reason(reason: impl Into<String>) -> Result<Self> {
        Ok(Self {
            reason: check_uri("reason", reason)?,
            ..Self::new()
        })
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self.cache.clear();
        self
    }
}

impl Default for Goodbye {
    fn default() -> Self {
        Self::new()
    }
}

impl WampMessage for Goodbye {
    const MESSAGE_TYPE: u64 = 6;
    const NAME: &'static str = "GOODBYE";

    fn marshal(&self) -> Value {
        let mut details = Dict::new();
        put(&mut details, "message", self.message.as_deref());
        Value::List(vec![
            Value::from(Self::MESSAGE_TYPE),
            Value::Map(details),
            Value::from(self.reason.as_str()),
        ])
    }

    fn unmarshal(items: &[Value]) -> std::result::Result<Self, ProtocolError> {
        let f = fields::<Self>(items)?;
        let details = f.dict(1, "Details")?;
        Ok(Self {
            reason: f.uri(2, "Reason")?,
            message: details.string("message")?.map(str::to_string),
            cache: SerializationCache::default(),
        })
    }

    cache_accessors!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_requires_client_roles() {
        assert!(matches!(
            Hello::new("realm1", []),
            Err(ConstructionError::MissingRoles)
        ));
        assert!(matches!(
            Hello::new("realm1", [Role::Caller, Role::Dealer]),
            Err(ConstructionError::InvalidField { field: "roles", .. })
        ));
        assert!(Hello::new("realm1", [Role::Caller]).is_ok());
    }

    #[test]
    fn hello_marshal_layout() {
        let hello = Hello::new("realm1", [Role::Subscriber, Role::Publisher])
            .unwrap()
            .with_agent("wampser");
        let Value::List(items) = hello.marshal() else {
            panic!("expected list");
        };
        assert_eq!(items[0], Value::from(1));
        assert_eq!(items[1], Value::from("realm1"));
        let details = items[2].as_map().unwrap();
        let roles = details["roles"].as_map().unwrap();
        assert!(roles.contains_key("publisher") && roles.contains_key("subscriber"));
        assert_eq!(details["agent"], Value::from("wampser"));
        assert!(!details.contains_key("authid"));
        assert_eq!(Hello::unmarshal(&items).unwrap(), hello);
    }

    fn features(name: &str) -> Dict {
        let mut features = Dict::new();
        features.insert(name.to_string(), Value::from(true));
        let mut details = Dict::new();
        details.insert("features".to_string(), Value::Map(features));
        details
    }

    #[test]
    fn hello_keeps_role_details() {
        let mut roles = Dict::new();
        roles.insert(
            "subscriber".to_string(),
            Value::Map(features("pattern_based_subscription")),
        );
        let mut details = Dict::new();
        details.insert("roles".to_string(), Value::Map(roles));
        let items = vec![Value::from(1), Value::from("realm1"), Value::Map(details)];

        let hello = Hello::unmarshal(&items).unwrap();
        assert_eq!(
            hello.role_details(Role::Subscriber),
            Some(&features("pattern_based_subscription"))
        );
        assert_eq!(hello.marshal(), Value::List(items));
    }

    #[test]
    fn role_details_must_match_side() {
        let welcome = Welcome::new(1, [Role::Broker])
            .unwrap()
            .with_role_details(Role::Dealer, features("progressive_call_results"))
            .unwrap();
        assert_eq!(welcome.roles().len(), 2);
        assert!(welcome.role_details(Role::Broker).unwrap().is_empty());
        assert!(Welcome::new(1, [Role::Broker])
            .unwrap()
            .with_role_details(Role::Caller, Dict::new())
            .is_err());

        let mut roles = Dict::new();
        roles.insert("caller".to_string(), Value::from(1));
        let mut details = Dict::new();
        details.insert("roles".to_string(), Value::Map(roles));
        let items = [Value::from(1), Value::from("realm1"), Value::Map(details)];
        assert!(matches!(
            Hello::unmarshal(&items),
            Err(ProtocolError::InvalidField { field: "roles", .. })
        ));
    }

    #[test]
    fn welcome_rejects_client_roles_on_decode() {
        let mut roles = Dict::new();
        roles.insert("caller".to_string(), Value::Map(Dict::new()));
        let mut details = Dict::new();
        details.insert("roles".to_string(), Value::Map(roles));
        let items = [Value::from(2), Value::from(9129137332u64), Value::Map(details)];
        assert!(matches!(
            Welcome::unmarshal(&items),
            Err(ProtocolError::InvalidField { field: "roles", .. })
        ));
    }

    #[test]
    fn goodbye_defaults_to_normal_close() {
        let goodbye = Goodbye::new();
        assert_eq!(goodbye.reason(), CLOSE_NORMAL);
        assert_eq!(
            goodbye.marshal(),
            Value::List(vec![
                Value::from(6),
                Value::Map(Dict::new()),
                Value::from("wamp.close.normal")
            ])
        );
        assert!(Goodbye::with_reason("not a uri").is_err());
    }

    #[test]
    fn abort_round_trips_message() {
        let abort = Abort::new("wamp.error.no_such_realm")
            .unwrap()
            .with_message("realm does not exist");
        let Value::List(items) = abort.marshal() else {
            panic!("expected list");
        };
        let decoded = Abort::unmarshal(&items).unwrap();
        assert_eq!(decoded.message(), Some("realm does not exist"));
        assert_eq!(decoded, abort);
    }
}
