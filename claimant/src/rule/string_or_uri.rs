use regex::Regex;
use serde_json::Value;

use super::{ClaimRule, RawClaim, Rejected};
use crate::error;

/// A claim rule ensuring the value is a string, optionally matching a pattern
///
/// Without a pattern, `null` passes through and every other scalar is
/// converted to its string form. With a pattern, the value must be a scalar
/// whose string form matches the pattern in full.
///
/// ```
/// use claimant::rule::{ClaimRule, RawClaim, StringOrUri};
/// use serde_json::json;
///
/// # fn main() -> Result<(), claimant::error::InvalidRuleConfig> {
/// let any = StringOrUri::new();
/// assert_eq!(any.apply(RawClaim::from(3.1)), Ok(json!("3.1")));
///
/// let https = StringOrUri::matching(r"https://[^/]+(/.*)?")?;
/// assert!(https.apply(RawClaim::from("https://issuer.example/")).is_ok());
/// assert!(https.apply(RawClaim::from("http://issuer.example/")).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct StringOrUri {
    regex: Option<Regex>,
}

impl StringOrUri {
    /// A rule accepting any scalar
    #[inline]
    pub const fn new() -> Self {
        Self { regex: None }
    }

    /// A rule accepting only scalars whose string form fully matches `pattern`
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn matching(pattern: &str) -> Result<Self, error::InvalidRuleConfig> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(error::invalid_rule_config)?;
        Ok(Self { regex: Some(regex) })
    }

    /// The anchored pattern, if any
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.regex.as_ref().map(Regex::as_str)
    }
}

impl ClaimRule for StringOrUri {
    fn apply(&self, value: RawClaim<'_>) -> Result<Value, Rejected> {
        let value = value.into_json();
        match &self.regex {
            None if value.is_null() => Ok(Value::Null),
            None => string_form(&value).map(Value::String).ok_or(Rejected),
            Some(regex) => match string_form(&value) {
                Some(s) if regex.is_match(&s) => Ok(Value::String(s)),
                _ => Err(Rejected),
            },
        }
    }
}

fn string_form(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if n.is_f64() => f.to_string(),
            _ => n.to_string(),
        }),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
