use serde_json::Value;

use super::{ClaimRule, RawClaim, Rejected};

/// A claim rule that only allows values from a predetermined list
///
/// Membership is strict: both the JSON type and the value must match, so
/// the integer `3`, the float `3.0`, and the string `"3"` are all distinct.
///
/// ```
/// use claimant::rule::{AllowedValues, ClaimRule, RawClaim};
///
/// let rule = AllowedValues::new(["ES256", "EdDSA"]);
///
/// assert!(rule.apply(RawClaim::from("ES256")).is_ok());
/// assert!(rule.apply(RawClaim::from("es256")).is_err());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct AllowedValues {
    allowed: Vec<Value>,
}

impl AllowedValues {
    /// Constructs a rule allowing exactly the given values
    pub fn new<I>(allowed: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Adds another allowed value
    pub fn or_allow(mut self, value: impl Into<Value>) -> Self {
        self.allowed.push(value.into());
        self
    }

    /// The allowed values, in the order they were configured
    #[inline]
    #[must_use]
    pub fn allowed(&self) -> &[Value] {
        &self.allowed
    }
}

impl ClaimRule for AllowedValues {
    fn apply(&self, value: RawClaim<'_>) -> Result<Value, Rejected> {
        let value = value.into_json();
        if self.allowed.contains(&value) {
            Ok(value)
        } else {
            Err(Rejected)
        }
    }
}
