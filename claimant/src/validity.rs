//! Whole-token validity rules
//!
//! Where a [`ClaimRule`][crate::rule::ClaimRule] guards a single claim as it
//! is written, a [`ValidityRule`] looks at the claim set as a whole, on
//! demand. A validity rule never fails loudly: it either finds nothing wrong
//! or returns a human-readable description of what is wrong.
//!
//! Rules are collected into a [`ValidityChain`], which runs every rule and
//! gathers one failure description per failing rule.
//!
//! ```
//! use claimant::{validity::{AllowedClaimSet, TemporalValidity, ValidityChain}, ClaimSet};
//! use claimant_clock::{TestClock, UnixTime};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let chain = ValidityChain::new()
//!     .with(AllowedClaimSet::new(["sub", "exp"], ["iss"])?)
//!     .with(TemporalValidity::default().with_clock(TestClock::new(UnixTime(1_000))));
//!
//! let mut claims = ClaimSet::new();
//! claims.set("sub", "alice")?;
//! claims.set("exp", 2_000)?;
//! assert!(chain.check(&claims).is_ok());
//!
//! claims.set("role", "admin")?;
//! claims.set("exp", 500)?;
//! let failures = chain.failures(&claims);
//! assert_eq!(failures.len(), 2);
//! assert_eq!(failures[0], "allowed claims mismatch: unrecognized are role");
//! # Ok(())
//! # }
//! ```

use std::{fmt, sync::Arc};

use crate::{error, ClaimSet};

mod allowed_claims;
mod temporal;

pub use allowed_claims::AllowedClaimSet;
pub use temporal::{TemporalValidity, TemporalViolation};

/// A predicate over a whole claim set
pub trait ValidityRule: fmt::Debug + Send + Sync {
    /// Evaluates the claim set, describing the failure if there is one
    fn evaluate(&self, claims: &ClaimSet) -> Option<String>;
}

impl<T> ValidityRule for &'_ T
where
    T: ValidityRule + ?Sized,
{
    #[inline]
    fn evaluate(&self, claims: &ClaimSet) -> Option<String> {
        T::evaluate(self, claims)
    }
}

impl<T> ValidityRule for Box<T>
where
    T: ValidityRule + ?Sized,
{
    #[inline]
    fn evaluate(&self, claims: &ClaimSet) -> Option<String> {
        T::evaluate(self, claims)
    }
}

impl<T> ValidityRule for Arc<T>
where
    T: ValidityRule + ?Sized,
{
    #[inline]
    fn evaluate(&self, claims: &ClaimSet) -> Option<String> {
        T::evaluate(self, claims)
    }
}

/// A validity rule backed by a function
///
/// Constructed with [`from_fn()`].
#[derive(Clone, Copy)]
pub struct FnValidity<F> {
    f: F,
}

impl<F> fmt::Debug for FnValidity<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("FnValidity")
    }
}

impl<F> ValidityRule for FnValidity<F>
where
    F: Fn(&ClaimSet) -> Option<String> + Send + Sync,
{
    #[inline]
    fn evaluate(&self, claims: &ClaimSet) -> Option<String> {
        (self.f)(claims)
    }
}

/// Wraps a function as a validity rule
///
/// ```
/// use claimant::{validity, ClaimSet};
///
/// let has_subject = validity::from_fn(|c: &ClaimSet| {
///     c.sub().is_none().then(|| "JWT has no subject".to_owned())
/// });
/// # let _ = has_subject;
/// ```
pub fn from_fn<F>(f: F) -> FnValidity<F>
where
    F: Fn(&ClaimSet) -> Option<String> + Send + Sync,
{
    FnValidity { f }
}

/// An ordered list of validity rules
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct ValidityChain {
    rules: Vec<Arc<dyn ValidityRule>>,
}

impl ValidityChain {
    /// An empty chain
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule, builder-style
    #[inline]
    pub fn with(mut self, rule: impl ValidityRule + 'static) -> Self {
        self.push(rule);
        self
    }

    /// Appends a rule
    pub fn push(&mut self, rule: impl ValidityRule + 'static) {
        self.rules.push(Arc::new(rule));
    }

    /// Appends a shared rule
    pub fn push_shared(&mut self, rule: Arc<dyn ValidityRule>) {
        self.rules.push(rule);
    }

    /// The number of rules in the chain
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the chain has no rules
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs every rule, collecting one description per failing rule
    ///
    /// Descriptions appear in the order in which the rules were added.
    #[must_use]
    pub fn failures(&self, claims: &ClaimSet) -> Vec<String> {
        self.rules
            .iter()
            .filter_map(|rule| rule.evaluate(claims))
            .collect()
    }

    /// Runs every rule, failing if any rule fails
    ///
    /// Unlike [`ClaimSet::validate()`], this does not notify the claim
    /// set's diagnostic sink.
    ///
    /// # Errors
    ///
    /// Returns an error listing every failure.
    pub fn check(&self, claims: &ClaimSet) -> Result<(), error::InvalidToken> {
        let failures = self.failures(claims);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(error::invalid_token(claims.jti(), failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;

    fn always(msg: &'static str) -> impl ValidityRule {
        from_fn(move |_: &ClaimSet| Some(msg.to_owned()))
    }

    fn never() -> impl ValidityRule {
        from_fn(|_: &ClaimSet| None)
    }

    #[test]
    fn empty_chain_passes() {
        let chain = ValidityChain::new();
        assert!(chain.is_empty());
        assert!(chain.check(&ClaimSet::new()).is_ok());
    }

    #[test]
    fn failures_are_collected_in_order() {
        let chain = ValidityChain::new()
            .with(always("first"))
            .with(never())
            .with(always("second"));

        assert_eq!(chain.len(), 3);
        assert_eq!(chain.failures(&ClaimSet::new()), ["first", "second"]);
    }

    #[test]
    fn check_names_the_token() -> Result<()> {
        let mut claims = ClaimSet::new();
        claims.set("jti", "abc")?;

        let chain = ValidityChain::new().with(always("nope"));
        let err = chain.check(&claims).unwrap_err();
        assert_eq!(err.to_string(), "invalid JWT with ID abc: nope");
        assert_eq!(err.failures(), ["nope"]);
        Ok(())
    }

    #[test]
    fn shared_rules_can_be_reused() {
        let rule: Arc<dyn ValidityRule> = Arc::new(always("shared"));
        let mut a = ValidityChain::new();
        let mut b = ValidityChain::new();
        a.push_shared(Arc::clone(&rule));
        b.push_shared(rule);

        let claims = ClaimSet::new();
        assert_eq!(a.failures(&claims), b.failures(&claims));
    }
}
