//! Claim sets
//!
//! A [`ClaimSet`] holds the claims of a token payload, or of a token header,
//! as an ordered JSON object. Claims may be given rules, and every value
//! written to a claim with a rule is passed through that rule first. What
//! happens when a rule refuses a value is decided by the set's
//! [`WritePolicy`].
//!
//! ```
//! use claimant::{rule::NumericDate, ClaimSet, WritePolicy};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut claims = ClaimSet::new();
//! claims.add_rule(["iat", "exp"], NumericDate::default())?;
//!
//! claims.set("iss", "https://issuer.example")?;
//! claims.set("exp", "1700000000")?;
//! assert_eq!(claims.get("exp"), Some(&json!(1_700_000_000)));
//!
//! // The default policy refuses bad values and leaves the claim untouched
//! assert!(claims.set("exp", "tomorrow").is_err());
//! assert_eq!(claims.get("exp"), Some(&json!(1_700_000_000)));
//!
//! // A soft-drop set removes the claim instead
//! let mut lenient = ClaimSet::with_policy(WritePolicy::SoftDrop)
//!     .with_rule(["exp"], NumericDate::default())?;
//! lenient.set("exp", 1_700_000_000)?;
//! lenient.set("exp", "tomorrow")?;
//! assert!(!lenient.contains("exp"));
//!
//! assert_eq!(
//!     claims.to_string(),
//!     r#"{"iss":"https://issuer.example","exp":1700000000}"#
//! );
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, fmt, sync::Arc};

use aliri_braid::braid;
use claimant_clock::UnixTime;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{
    diagnostic::{Diagnostic, DiagnosticSink, Silent},
    error::{self, UNSET_JTI},
    filter::coerce_integer,
    rule::{ClaimRule, NumericDate, RawClaim, Rejected, StringOrUri},
    validity::ValidityChain,
};

/// The name of a claim
///
/// Claim names are non-empty strings.
#[braid(
    serde,
    validator,
    ref_doc = "A borrowed reference to a [`ClaimName`]"
)]
pub struct ClaimName;

impl aliri_braid::Validator for ClaimName {
    type Error = error::InvalidClaimName;

    fn validate(s: &str) -> Result<(), Self::Error> {
        if s.is_empty() {
            Err(error::invalid_claim_name())
        } else {
            Ok(())
        }
    }
}

/// Names of the claims registered by RFC 7519
pub mod registered {
    /// Issuer
    pub const ISS: &str = "iss";
    /// Subject
    pub const SUB: &str = "sub";
    /// Audience
    pub const AUD: &str = "aud";
    /// Expiration time
    pub const EXP: &str = "exp";
    /// Not before
    pub const NBF: &str = "nbf";
    /// Issued at
    pub const IAT: &str = "iat";
    /// JWT ID
    pub const JTI: &str = "jti";

    /// All registered claim names
    pub const ALL: [&str; 7] = [ISS, SUB, AUD, EXP, NBF, IAT, JTI];
}

/// What a claim set does when a rule refuses a value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WritePolicy {
    /// Refuse the write with a [`RejectedClaim`][error::RejectedClaim]
    /// error, leaving any existing value in place
    #[default]
    Strict,

    /// Remove the claim and report the rejection only to the diagnostic sink
    SoftDrop,
}

static SILENT: Lazy<Arc<dyn DiagnosticSink>> = Lazy::new(|| Arc::new(Silent));

/// The claims of a token payload or header
///
/// Two claim sets are equal when their claims are equal; rules, policy,
/// sink, and header do not take part in comparisons.
#[derive(Clone)]
pub struct ClaimSet {
    claims: Map<String, Value>,
    rules: HashMap<ClaimName, Arc<dyn ClaimRule>>,
    header: Option<Box<ClaimSet>>,
    policy: WritePolicy,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for ClaimSet {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ClaimSet {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.claims == other.claims
    }
}

impl Eq for ClaimSet {}

impl fmt::Debug for ClaimSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut rules: Vec<_> = self.rules.keys().map(|n| n.as_str()).collect();
        rules.sort_unstable();

        f.debug_struct("ClaimSet")
            .field("claims", &self.claims)
            .field("rules", &rules)
            .field("header", &self.header)
            .field("policy", &self.policy)
            .finish()
    }
}

impl ClaimSet {
    /// An empty claim set using the [`Strict`][WritePolicy::Strict] policy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(WritePolicy::default())
    }

    /// An empty claim set using the given write policy
    #[must_use]
    pub fn with_policy(policy: WritePolicy) -> Self {
        Self::empty(policy, Arc::clone(&SILENT))
    }

    fn empty(policy: WritePolicy, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            claims: Map::new(),
            rules: HashMap::new(),
            header: None,
            policy,
            sink,
        }
    }

    /// Sends diagnostics to the given sink
    ///
    /// A header that already exists is switched to the same sink; one
    /// created later inherits it.
    #[must_use]
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.set_sink(Arc::new(sink));
        self
    }

    /// Sends diagnostics to the given shared sink
    pub fn set_sink(&mut self, sink: Arc<dyn DiagnosticSink>) {
        if let Some(header) = &mut self.header {
            header.set_sink(Arc::clone(&sink));
        }
        self.sink = sink;
    }

    /// Registers a rule for one or more claims, builder-style
    ///
    /// # Errors
    ///
    /// Returns an error if any of the names is empty.
    pub fn with_rule<I>(
        mut self,
        names: I,
        rule: impl ClaimRule + 'static,
    ) -> Result<Self, error::InvalidClaimName>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.add_rule(names, rule)?;
        Ok(self)
    }

    /// Registers the standard rules for the registered claims
    ///
    /// `iat`, `nbf`, and `exp` must be NumericDates; `iss`, `sub`, and `jti`
    /// must be strings.
    #[must_use]
    pub fn with_registered_rules(mut self) -> Self {
        let date: Arc<dyn ClaimRule> = Arc::new(NumericDate::default());
        let text: Arc<dyn ClaimRule> = Arc::new(StringOrUri::new());

        self.insert_rule(&[registered::IAT, registered::NBF, registered::EXP], &date);
        self.insert_rule(&[registered::ISS, registered::SUB, registered::JTI], &text);
        self
    }

    fn insert_rule(&mut self, names: &[&str], rule: &Arc<dyn ClaimRule>) {
        let names = names
            .iter()
            .filter_map(|n| ClaimName::new((*n).to_owned()).ok());
        for name in names {
            self.rules.insert(name, Arc::clone(rule));
        }
    }

    /// Registers a rule for one or more claims
    ///
    /// The rule replaces any rule previously registered for those claims.
    /// Values already stored are not re-checked.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the names is empty, in which case no rule
    /// is registered for any of them.
    pub fn add_rule<I>(
        &mut self,
        names: I,
        rule: impl ClaimRule + 'static,
    ) -> Result<&mut Self, error::InvalidClaimName>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| ClaimName::new(n.as_ref().to_owned()))
            .collect::<Result<Vec<_>, _>>()?;

        let rule: Arc<dyn ClaimRule> = Arc::new(rule);
        for name in names {
            self.rules.insert(name, Arc::clone(&rule));
        }

        Ok(self)
    }

    /// Whether a rule is registered for the claim
    #[must_use]
    pub fn has_rule(&self, name: &str) -> bool {
        ClaimNameRef::from_str(name).map_or(false, |n| self.rules.contains_key(n))
    }

    /// The write policy of this claim set
    #[inline]
    #[must_use]
    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// Gets the value of a claim
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Whether the claim is present
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.claims.contains_key(name)
    }

    /// Removes a claim, returning its value
    ///
    /// The order of the remaining claims is preserved.
    #[inline]
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.claims.shift_remove(name)
    }

    /// Writes a claim
    ///
    /// Writing `null` removes the claim. Otherwise the value is passed
    /// through the rule registered for the claim, if any; a rule that yields
    /// `null` also removes the claim.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or, under the
    /// [`Strict`][WritePolicy::Strict] policy, if the rule refuses the
    /// value. A refused write leaves the claim set unmodified.
    pub fn set<'a>(
        &mut self,
        name: &str,
        value: impl Into<RawClaim<'a>>,
    ) -> Result<(), error::WriteError> {
        let key = ClaimNameRef::from_str(name)?;
        let value = value.into();

        if value.is_null() {
            self.remove(name);
            return Ok(());
        }

        let stored = match self.rules.get(key).map(Arc::clone) {
            Some(rule) => {
                let input = value.kind();
                match rule.apply(value) {
                    Ok(Value::Null) => {
                        self.notice_rejected(name);
                        Value::Null
                    }
                    Ok(v) => v,
                    Err(Rejected) => {
                        self.notice_rejected(name);
                        match self.policy {
                            WritePolicy::SoftDrop => Value::Null,
                            WritePolicy::Strict => {
                                return Err(error::rejected_claim(name, input, self.jti()).into())
                            }
                        }
                    }
                }
            }
            None => {
                self.sink.notice(&Diagnostic::UnfilteredClaim {
                    claim: name,
                    jti: self.jti().unwrap_or(UNSET_JTI),
                });
                value.into_json()
            }
        };

        if stored.is_null() {
            self.remove(name);
        } else {
            self.claims.insert(name.to_owned(), stored);
        }

        Ok(())
    }

    /// Writes many claims, in iteration order
    ///
    /// # Errors
    ///
    /// Stops at the first claim that cannot be written and returns its
    /// error. Claims written before that point remain written.
    pub fn set_many<'a, I, K, V>(&mut self, claims: I) -> Result<(), error::WriteError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RawClaim<'a>>,
    {
        for (name, value) in claims {
            self.set(name.as_ref(), value)?;
        }
        Ok(())
    }

    fn notice_rejected(&self, name: &str) {
        self.sink.notice(&Diagnostic::RejectedClaim {
            claim: name,
            jti: self.jti().unwrap_or(UNSET_JTI),
        });
    }

    /// The header claim set, if one has been created
    #[inline]
    #[must_use]
    pub fn header(&self) -> Option<&ClaimSet> {
        self.header.as_deref()
    }

    /// The header claim set, created empty on first use
    ///
    /// A newly created header shares the write policy and diagnostic sink
    /// of this claim set, but none of its rules.
    pub fn header_mut(&mut self) -> &mut ClaimSet {
        let (policy, sink) = (self.policy, &self.sink);
        self.header
            .get_or_insert_with(|| Box::new(Self::empty(policy, Arc::clone(sink))))
    }

    /// Replaces the header with a copy of `header`
    ///
    /// The copy is independent: later changes to `header` do not affect
    /// this claim set.
    pub fn replace_header(&mut self, header: &ClaimSet) -> &mut Self {
        self.header = Some(Box::new(header.clone()));
        self
    }

    /// Replaces the header with a new claim set holding `claims`
    ///
    /// # Errors
    ///
    /// Returns an error if any claim name is empty. The existing header is
    /// kept in that case.
    pub fn adopt_header(
        &mut self,
        claims: Map<String, Value>,
    ) -> Result<&mut Self, error::WriteError> {
        let mut header = Self::empty(self.policy, Arc::clone(&self.sink));
        header.set_many(claims)?;
        self.header = Some(Box::new(header));
        Ok(self)
    }

    /// The number of claims
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Whether there are no claims
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Iterates over the claims in insertion order
    #[inline]
    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.claims.iter()
    }

    /// Iterates over the claim names in insertion order
    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.claims.keys().map(String::as_str)
    }

    /// The claims as a JSON object map
    #[inline]
    #[must_use]
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// `jti` (JWT ID), if present as a string
    #[must_use]
    pub fn jti(&self) -> Option<&str> {
        self.get(registered::JTI).and_then(Value::as_str)
    }

    /// `iss` (issuer), if present as a string
    #[must_use]
    pub fn iss(&self) -> Option<&str> {
        self.get(registered::ISS).and_then(Value::as_str)
    }

    /// `sub` (subject), if present as a string
    #[must_use]
    pub fn sub(&self) -> Option<&str> {
        self.get(registered::SUB).and_then(Value::as_str)
    }

    /// `exp` (expiration time), if present as an integer
    #[must_use]
    pub fn exp(&self) -> Option<UnixTime> {
        self.numeric_date(registered::EXP)
    }

    /// `nbf` (not before), if present as an integer
    #[must_use]
    pub fn nbf(&self) -> Option<UnixTime> {
        self.numeric_date(registered::NBF)
    }

    /// `iat` (issued at), if present as an integer
    #[must_use]
    pub fn iat(&self) -> Option<UnixTime> {
        self.numeric_date(registered::IAT)
    }

    fn numeric_date(&self, name: &str) -> Option<UnixTime> {
        self.get(name).and_then(coerce_integer).map(UnixTime)
    }

    /// Checks the claims against a chain of validity rules
    ///
    /// # Errors
    ///
    /// Returns an error listing every failure if any rule fails.
    pub fn validate(&self, chain: &ValidityChain) -> Result<(), error::InvalidToken> {
        let jti = self.jti().unwrap_or(UNSET_JTI);

        if chain.is_empty() {
            self.sink.notice(&Diagnostic::NoValidityRules { jti });
            return Ok(());
        }

        let failures = chain.failures(self);
        if failures.is_empty() {
            return Ok(());
        }

        self.sink.notice(&Diagnostic::InvalidToken {
            jti,
            failures: &failures,
        });
        Err(error::invalid_token(self.jti(), failures))
    }

    /// The claims as a JSON object
    ///
    /// The header is not included.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// The claims as compact JSON text
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialized.
    pub fn to_json_string(&self) -> Result<String, error::Unexpected> {
        serde_json::to_string(&self.claims).map_err(error::unexpected)
    }

    /// A claim set holding the members of a JSON object, without rules
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not an object or holds an empty key.
    pub fn from_json(value: Value) -> Result<Self, error::LoadError> {
        let mut claims = Self::new();
        claims.load(value)?;
        Ok(claims)
    }

    /// A claim set holding the members of a JSON object text, without rules
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not valid JSON, is not an object, or
    /// holds an empty key.
    pub fn from_json_str(json: &str) -> Result<Self, error::LoadError> {
        let value: Value = serde_json::from_str(json).map_err(error::malformed_claims)?;
        Self::from_json(value)
    }

    /// Writes every member of a decoded JSON object through this set's rules
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not an object or if a member cannot
    /// be written. Members written before the failure remain written.
    pub fn load(&mut self, value: Value) -> Result<(), error::LoadError> {
        match value {
            Value::Object(map) => Ok(self.set_many(map)?),
            _ => Err(error::not_an_object().into()),
        }
    }
}

impl fmt::Display for ClaimSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let json = self.to_json_string().map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl Serialize for ClaimSet {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.claims.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ClaimSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let mut claims = Self::new();
        claims.set_many(map).map_err(serde::de::Error::custom)?;
        Ok(claims)
    }
}

impl<'a> IntoIterator for &'a ClaimSet {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.claims.iter()
    }
}
