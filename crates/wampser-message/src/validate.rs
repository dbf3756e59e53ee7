//! Field validation shared by constructors and unmarshalling.

use crate::error::{ConstructionError, Result};
use crate::policy::MatchPolicy;

/// Largest valid WAMP ID (2^53).
pub const MAX_ID: u64 = 1 << 53;

/// Validate a WAMP ID.
pub fn check_id(field: &'static str, value: u64) -> Result<u64> {
    if value == 0 || value > MAX_ID {
        return Err(ConstructionError::InvalidId { field, value });
    }
    Ok(value)
}

/// Largest timeout in milliseconds; every wire format keeps it an integer.
pub const MAX_TIMEOUT: u64 = i64::MAX as u64;

/// Validate a call timeout in milliseconds.
pub fn check_timeout(value: u64) -> Result<u64> {
    if value > MAX_TIMEOUT {
        return Err(ConstructionError::InvalidField {
            field: "timeout",
            reason: format!("{value} ms exceeds {MAX_TIMEOUT}"),
        });
    }
    Ok(value)
}

/// Validate a list of WAMP IDs.
pub fn check_ids(field: &'static str, values: Vec<u64>) -> Result<Vec<u64>> {
    for value in &values {
        check_id(field, *value)?;
    }
    Ok(values)
}

/// Validate a concrete URI (every component non-empty).
pub fn check_uri(field: &'static str, uri: impl Into<String>) -> Result<String> {
    check_uri_pattern(field, uri, MatchPolicy::Exact)
}

/// Validate a URI used as a subscription/registration pattern.
///
/// Prefix patterns may end with an empty component; wildcard patterns may
/// contain empty components anywhere.
pub fn check_uri_pattern(
    field: &'static str,
    uri: impl Into<String>,
    policy: MatchPolicy,
) -> Result<String> {
    let uri = uri.into();
    if is_valid_uri(&uri, policy) {
        Ok(uri)
    } else {
        Err(ConstructionError::InvalidUri { field, value: uri })
    }
}

fn is_valid_uri(uri: &str, policy: MatchPolicy) -> bool {
    if uri.is_empty() {
        return false;
    }
    let components: Vec<&str> = uri.split('.').collect();
    let last = components.len() - 1;
    components.iter().enumerate().all(|(index, component)| {
        let bad_char = component.chars().any(|c| c.is_whitespace() || c == '#');
        if bad_char {
            return false;
        }
        if !component.is_empty() {
            return true;
        }
        match policy {
            MatchPolicy::Exact => false,
            MatchPolicy::Prefix => index == last && last > 0,
            MatchPolicy::Wildcard => true,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_positive_and_bounded() {
        assert!(check_id("request", 1).is_ok());
        assert!(check_id("request", MAX_ID).is_ok());
        assert!(matches!(
            check_id("request", 0),
            Err(ConstructionError::InvalidId { value: 0, .. })
        ));
        assert!(check_id("request", MAX_ID + 1).is_err());
    }

    #[test]
    fn timeouts_stay_in_integer_range() {
        assert_eq!(check_timeout(0).unwrap(), 0);
        assert_eq!(check_timeout(MAX_TIMEOUT).unwrap(), MAX_TIMEOUT);
        assert!(matches!(
            check_timeout(MAX_TIMEOUT + 1),
            Err(ConstructionError::InvalidField {
                field: "timeout",
                ..
            })
        ));
        assert!(check_timeout(u64::MAX).is_err());
    }

    #[test]
    fn exact_uris() {
        assert!(check_uri("procedure", "com.myapp.procedure1").is_ok());
        assert!(check_uri("procedure", "com.myapp.\u{4f60}\u{597d}\u{4e16}\u{754c}").is_ok());
        assert!(check_uri("procedure", "").is_err());
        assert!(check_uri("procedure", "com..procedure").is_err());
        assert!(check_uri("procedure", "com.my app").is_err());
        assert!(check_uri("procedure", "com.my#app").is_err());
        assert!(check_uri("procedure", "com.myapp.").is_err());
    }

    #[test]
    fn pattern_uris() {
        assert!(check_uri_pattern("topic", "com.myapp.", MatchPolicy::Prefix).is_ok());
        assert!(check_uri_pattern("topic", "com..topic", MatchPolicy::Prefix).is_err());
        assert!(check_uri_pattern("topic", ".", MatchPolicy::Prefix).is_err());
        assert!(check_uri_pattern("topic", "com..topic", MatchPolicy::Wildcard).is_ok());
        assert!(check_uri_pattern("topic", "com. .topic", MatchPolicy::Wildcard).is_err());
    }
}
