//! Positional field access for unmarshalling, and option-dict helpers.

use wampser_codec::{Dict, Value};

use crate::error::ProtocolError;
use crate::policy::MatchPolicy;
use crate::validate::{check_id, check_uri_pattern};

type Result<T> = std::result::Result<T, ProtocolError>;

/// Read-only view over a decoded message list.
pub(crate) struct Fields<'a> {
    message: &'static str,
    items: &'a [Value],
}

impl<'a> Fields<'a> {
    pub(crate) fn new(message: &'static str, items: &'a [Value]) -> Self {
        Self { message, items }
    }

    fn get(&self, index: usize, field: &'static str) -> Result<&'a Value> {
        self.items.get(index).ok_or(ProtocolError::MissingField {
            message: self.message,
            field,
        })
    }

    /// A non-negative integer (not range-checked as an ID).
    pub(crate) fn integer(&self, index: usize, field: &'static str) -> Result<u64> {
        let value = self.get(index, field)?;
        value.as_u64().ok_or_else(|| {
            ProtocolError::invalid(
                self.message,
                field,
                format!("expected non-negative integer, got {}", value.kind()),
            )
        })
    }

    pub(crate) fn id(&self, index: usize, field: &'static str) -> Result<u64> {
        let value = self.integer(index, field)?;
        check_id(field, value).map_err(|err| ProtocolError::from_construction(self.message, err))
    }

    pub(crate) fn string(&self, index: usize, field: &'static str) -> Result<&'a str> {
        let value = self.get(index, field)?;
        value.as_str().ok_or_else(|| {
            ProtocolError::invalid(
                self.message,
                field,
                format!("expected string, got {}", value.kind()),
            )
        })
    }

    pub(crate) fn uri(&self, index: usize, field: &'static str) -> Result<String> {
        self.uri_pattern(index, field, MatchPolicy::Exact)
    }

    pub(crate) fn uri_pattern(
        &self,
        index: usize,
        field: &'static str,
        policy: MatchPolicy,
    ) -> Result<String> {
        let value = self.string(index, field)?;
        check_uri_pattern(field, value, policy)
            .map_err(|err| ProtocolError::from_construction(self.message, err))
    }

    pub(crate) fn dict(&self, index: usize, field: &'static str) -> Result<Options<'a>> {
        let value = self.get(index, field)?;
        match value.as_map() {
            Some(dict) => Ok(Options {
                message: self.message,
                dict,
            }),
            None => Err(ProtocolError::invalid(
                self.message,
                field,
                format!("expected map, got {}", value.kind()),
            )),
        }
    }

    /// Positional arguments; absent means empty.
    pub(crate) fn args(&self, index: usize) -> Result<Vec<Value>> {
        match self.items.get(index) {
            None => Ok(Vec::new()),
            Some(Value::List(items)) => Ok(items.clone()),
            Some(other) => Err(ProtocolError::invalid(
                self.message,
                "Arguments",
                format!("expected list, got {}", other.kind()),
            )),
        }
    }

    /// Keyword arguments; absent means empty.
    pub(crate) fn kwargs(&self, index: usize) -> Result<Dict> {
        match self.items.get(index) {
            None => Ok(Dict::new()),
            Some(Value::Map(map)) => Ok(map.clone()),
            Some(other) => Err(ProtocolError::invalid(
                self.message,
                "ArgumentsKw",
                format!("expected map, got {}", other.kind()),
            )),
        }
    }
}

/// Typed lookups in an options/details dict. Unknown keys are ignored.
pub(crate) struct Options<'a> {
    message: &'static str,
    dict: &'a Dict,
}

impl<'a> Options<'a> {
    fn invalid(&self, key: &'static str, expected: &str, got: &Value) -> ProtocolError {
        ProtocolError::invalid(
            self.message,
            key,
            format!("expected {expected}, got {}", got.kind()),
        )
    }

    /// The whole dict, for messages that carry it through verbatim.
    pub(crate) fn as_dict(&self) -> &'a Dict {
        self.dict
    }

    pub(crate) fn bool(&self, key: &'static str) -> Result<Option<bool>> {
        match self.dict.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "bool", value)),
        }
    }

    pub(crate) fn integer(&self, key: &'static str) -> Result<Option<u64>> {
        match self.dict.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "non-negative integer", value)),
        }
    }

    pub(crate) fn id(&self, key: &'static str) -> Result<Option<u64>> {
        match self.integer(key)? {
            None => Ok(None),
            Some(value) => check_id(key, value)
                .map(Some)
                .map_err(|err| ProtocolError::from_construction(self.message, err)),
        }
    }

    pub(crate) fn ids(&self, key: &'static str) -> Result<Option<Vec<u64>>> {
        let Some(value) = self.dict.get(key) else {
            return Ok(None);
        };
        let items = value
            .as_list()
            .ok_or_else(|| self.invalid(key, "list of IDs", value))?;
        items
            .iter()
            .map(|item| {
                let id = item
                    .as_u64()
                    .ok_or_else(|| self.invalid(key, "ID", item))?;
                check_id(key, id).map_err(|err| ProtocolError::from_construction(self.message, err))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    pub(crate) fn string(&self, key: &'static str) -> Result<Option<&'a str>> {
        match self.dict.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "string", value)),
        }
    }

    pub(crate) fn uri(&self, key: &'static str) -> Result<Option<String>> {
        match self.string(key)? {
            None => Ok(None),
            Some(value) => check_uri_pattern(key, value, MatchPolicy::Exact)
                .map(Some)
                .map_err(|err| ProtocolError::from_construction(self.message, err)),
        }
    }

    pub(crate) fn strings(&self, key: &'static str) -> Result<Option<Vec<String>>> {
        let Some(value) = self.dict.get(key) else {
            return Ok(None);
        };
        let items = value
            .as_list()
            .ok_or_else(|| self.invalid(key, "list of strings", value))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.invalid(key, "string", item))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    pub(crate) fn map(&self, key: &'static str) -> Result<Option<&'a Dict>> {
        match self.dict.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_map()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "map", value)),
        }
    }

    /// Parse an enumerated string option.
    pub(crate) fn choice<T>(
        &self,
        key: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>> {
        match self.string(key)? {
            None => Ok(None),
            Some(raw) => parse(raw).map(Some).ok_or_else(|| {
                ProtocolError::invalid(self.message, key, format!("unknown value '{raw}'"))
            }),
        }
    }
}

/// Insert an optional entry into an options dict.
pub(crate) fn put<V: Into<Value>>(dict: &mut Dict, key: &str, value: Option<V>) {
    if let Some(value) = value {
        dict.insert(key.to_string(), value.into());
    }
}

pub(crate) fn ids_value(ids: &[u64]) -> Value {
    Value::List(ids.iter().map(|id| Value::from(*id)).collect())
}

pub(crate) fn strings_value(items: &[String]) -> Value {
    Value::List(items.iter().map(|s| Value::from(s.as_str())).collect())
}

/// Append the trailing Arguments/ArgumentsKw elements.
///
/// Arguments are emitted when non-empty or when keyword arguments follow.
pub(crate) fn push_payload(out: &mut Vec<Value>, args: &[Value], kwargs: &Dict) {
    if !kwargs.is_empty() {
        out.push(Value::List(args.to_vec()));
        out.push(Value::Map(kwargs.clone()));
    } else if !args.is_empty() {
        out.push(Value::List(args.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_trailing_payload_is_empty() {
        let items = [Value::from(50), Value::from(1), Value::Map(Dict::new())];
        let fields = Fields::new("RESULT", &items);
        assert!(fields.args(3).unwrap().is_empty());
        assert!(fields.kwargs(4).unwrap().is_empty());
    }

    #[test]
    fn wrong_type_is_reported_with_field_name() {
        let items = [Value::from(48), Value::from("nope")];
        let fields = Fields::new("CALL", &items);
        let err = fields.id(1, "Request").unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidField {
                field: "Request",
                ..
            }
        ));
        assert!(matches!(
            fields.id(2, "Request"),
            Err(ProtocolError::MissingField { .. })
        ));
    }

    #[test]
    fn push_payload_keeps_args_slot_for_kwargs() {
        let mut kwargs = Dict::new();
        kwargs.insert("a".to_string(), Value::from(1));
        let mut out = Vec::new();
        push_payload(&mut out, &[], &kwargs);
        assert_eq!(out, vec![Value::List(vec![]), Value::Map(kwargs)]);

        let mut out = Vec::new();
        push_payload(&mut out, &[], &Dict::new());
        assert!(out.is_empty());
    }

    #[test]
    fn unknown_choice_is_rejected() {
        let mut dict = Dict::new();
        dict.insert("match".to_string(), Value::from("regex"));
        let options = Options {
            message: "SUBSCRIBE",
            dict: &dict,
        };
        assert!(options.choice("match", MatchPolicy::parse).is_err());
        assert_eq!(options.choice("invoke", MatchPolicy::parse).unwrap(), None);
    }
}
