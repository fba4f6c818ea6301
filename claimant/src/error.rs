//! Common errors

#![allow(missing_copy_implementations)]

use std::{error::Error as StdError, fmt};

use thiserror::Error;

/// Placeholder used in messages when a claim set has no `jti` claim
pub(crate) const UNSET_JTI: &str = "(unset)";

/// A claim name was not acceptable
///
/// Claim names must be non-empty strings.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("claim names must be non-empty strings")]
pub struct InvalidClaimName {
    _p: (),
}

impl From<std::convert::Infallible> for InvalidClaimName {
    fn from(e: std::convert::Infallible) -> Self {
        match e {}
    }
}

pub(crate) const fn invalid_claim_name() -> InvalidClaimName {
    InvalidClaimName { _p: () }
}

/// A claim value was rejected by the rule registered for the claim
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid value for claim {claim} ({input}) on JWT with ID {jti}")]
pub struct RejectedClaim {
    claim: String,
    input: &'static str,
    jti: String,
}

impl RejectedClaim {
    /// The name of the claim that was being written
    #[must_use]
    pub fn claim(&self) -> &str {
        &self.claim
    }

    /// The kind of input that was rejected, such as `string` or `integer`
    #[must_use]
    pub fn input(&self) -> &'static str {
        self.input
    }
}

pub(crate) fn rejected_claim(
    claim: impl Into<String>,
    input: &'static str,
    jti: Option<&str>,
) -> RejectedClaim {
    RejectedClaim {
        claim: claim.into(),
        input,
        jti: jti.unwrap_or(UNSET_JTI).to_owned(),
    }
}

/// The claim payload is malformed and cannot be loaded into a claim set
#[derive(Debug, Error)]
#[error("malformed claims: payload must be a JSON object")]
pub struct MalformedClaims {
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

pub(crate) fn malformed_claims(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> MalformedClaims {
    MalformedClaims {
        source: Some(source.into()),
    }
}

pub(crate) const fn not_an_object() -> MalformedClaims {
    MalformedClaims { source: None }
}

/// A rule could not be constructed from its configuration
#[derive(Debug, Error)]
#[error("invalid rule configuration")]
pub struct InvalidRuleConfig {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn invalid_rule_config(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> InvalidRuleConfig {
    InvalidRuleConfig {
        source: source.into(),
    }
}

/// Unexpected error (possibly a bug)
#[derive(Debug, Error)]
#[error("unexpected error")]
pub struct Unexpected {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn unexpected(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> Unexpected {
    Unexpected {
        source: source.into(),
    }
}

/// The token failed one or more validity rules
///
/// Every individual failure is retained, in the order in which the rules
/// were registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidToken {
    jti: String,
    failures: Vec<String>,
}

impl InvalidToken {
    /// The individual failure descriptions
    #[must_use]
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

impl fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid JWT with ID {}", self.jti)?;
        let mut sep = ": ";
        for failure in &self.failures {
            f.write_str(sep)?;
            f.write_str(failure)?;
            sep = "; ";
        }
        Ok(())
    }
}

impl StdError for InvalidToken {}

pub(crate) fn invalid_token(jti: Option<&str>, failures: Vec<String>) -> InvalidToken {
    InvalidToken {
        jti: jti.unwrap_or(UNSET_JTI).to_owned(),
        failures,
    }
}

/// An error occurring while writing a claim
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WriteError {
    /// The claim name is not acceptable
    #[error(transparent)]
    InvalidClaimName(#[from] InvalidClaimName),

    /// The claim value was rejected by its rule
    #[error(transparent)]
    RejectedClaim(#[from] RejectedClaim),
}

impl WriteError {
    /// Whether the error is due to an unacceptable claim name
    #[must_use]
    pub fn is_invalid_name(&self) -> bool {
        matches!(self, Self::InvalidClaimName(_))
    }

    /// Whether the error is due to a rejected claim value
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::RejectedClaim(_))
    }
}

/// An error occurring while loading a decoded payload into a claim set
#[derive(Debug, Error)]
pub enum LoadError {
    /// The payload is not a JSON object
    #[error(transparent)]
    MalformedClaims(#[from] MalformedClaims),

    /// A claim could not be written
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// An error occurring while encoding a claim set into a token
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The payload or header could not be serialized
    #[error(transparent)]
    Unexpected(#[from] Unexpected),

    /// The encoder was given invalid input or is misconfigured
    #[error("token encoder failed")]
    Encoder(#[source] Box<dyn StdError + Send + Sync + 'static>),
}

/// An error occurring while decoding a token into claims
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The token payload is not a JSON object
    #[error(transparent)]
    MalformedClaims(#[from] MalformedClaims),

    /// A decoded claim was rejected by the receiving claim set
    #[error(transparent)]
    Write(#[from] WriteError),

    /// The decoder rejected the token or is misconfigured
    #[error("token decoder failed")]
    Decoder(#[source] Box<dyn StdError + Send + Sync + 'static>),
}

impl From<LoadError> for DecodeError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::MalformedClaims(e) => Self::MalformedClaims(e),
            LoadError::Write(e) => Self::Write(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_claim_names_claim_and_input() {
        let err = rejected_claim("exp", "string", None);
        assert_eq!(
            err.to_string(),
            "invalid value for claim exp (string) on JWT with ID (unset)"
        );
        assert_eq!(err.claim(), "exp");
        assert_eq!(err.input(), "string");
    }

    #[test]
    fn invalid_token_lists_every_failure() {
        let err = invalid_token(
            Some("abc"),
            vec!["first problem".to_owned(), "second problem".to_owned()],
        );
        assert_eq!(
            err.to_string(),
            "invalid JWT with ID abc: first problem; second problem"
        );
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn write_error_classification() {
        let name: WriteError = invalid_claim_name().into();
        assert!(name.is_invalid_name());
        assert!(!name.is_rejected());

        let rejected: WriteError = rejected_claim("iss", "array", Some("x")).into();
        assert!(rejected.is_rejected());
    }
}
