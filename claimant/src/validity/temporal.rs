use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use claimant_clock::{Clock, System, UnixTime};
use serde_json::Value;

use super::ValidityRule;
use crate::{claims::registered, filter::coerce_integer, ClaimSet};

/// A validity rule checking that the token is within its validity period
///
/// The clock is read once per evaluation. A token is expired when `exp`
/// lies more than the leeway before now, and not yet valid when `nbf` lies
/// more than the leeway after now. By default an expiration is mandatory,
/// the leeway is 30 seconds, and the system clock is used.
///
/// ```
/// use claimant::{validity::{TemporalValidity, ValidityRule}, ClaimSet};
/// use claimant_clock::{TestClock, UnixTime};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let rule = TemporalValidity::default()
///     .with_leeway_secs(10)
///     .with_clock(TestClock::new(UnixTime(1_699_306_654)));
///
/// let mut claims = ClaimSet::new();
/// claims.set("exp", 1_699_306_654 - 11)?;
/// assert_eq!(
///     rule.evaluate(&claims).as_deref(),
///     Some("JWT expired at 2023-11-06T21:37:23+00:00")
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
#[must_use]
pub struct TemporalValidity {
    must_expire: bool,
    leeway: Duration,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Default for TemporalValidity {
    fn default() -> Self {
        Self {
            must_expire: true,
            leeway: Duration::from_secs(30),
            clock: Arc::new(System),
        }
    }
}

impl fmt::Debug for TemporalValidity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TemporalValidity")
            .field("must_expire", &self.must_expire)
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}

impl TemporalValidity {
    /// Requires the `exp` claim to be present
    #[inline]
    pub fn require_expiration(self) -> Self {
        Self {
            must_expire: true,
            ..self
        }
    }

    /// Accepts tokens without an `exp` claim
    #[inline]
    pub fn allow_no_expiration(self) -> Self {
        Self {
            must_expire: false,
            ..self
        }
    }

    /// Sets the leeway allowed around `exp` and `nbf`
    #[inline]
    pub fn with_leeway(self, leeway: Duration) -> Self {
        Self { leeway, ..self }
    }

    /// Sets the leeway allowed around `exp` and `nbf`, in seconds
    #[inline]
    pub fn with_leeway_secs(self, leeway: u64) -> Self {
        self.with_leeway(Duration::from_secs(leeway))
    }

    /// Uses the given clock instead of the system clock
    #[inline]
    pub fn with_clock(self, clock: impl Clock + Send + Sync + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
            ..self
        }
    }

    /// Whether an `exp` claim is required
    #[inline]
    #[must_use]
    pub fn must_expire(&self) -> bool {
        self.must_expire
    }

    /// The leeway allowed around `exp` and `nbf`
    #[inline]
    #[must_use]
    pub fn leeway(&self) -> Duration {
        self.leeway
    }

    /// Every independent violation, in a fixed order
    ///
    /// A missing or malformed expiration comes first, then expiry, then a
    /// malformed `nbf`, then not-yet-valid.
    #[must_use]
    pub fn violations(&self, claims: &ClaimSet) -> Vec<TemporalViolation> {
        let now = self.clock.now();
        let leeway = self.leeway.as_secs();
        let mut violations = Vec::new();

        match read_date(claims.get(registered::EXP)) {
            Ok(None) if self.must_expire => {
                violations.push(TemporalViolation::MissingExpiration);
            }
            Ok(Some(exp)) if exp < now.saturating_sub_secs(leeway) => {
                violations.push(TemporalViolation::Expired(exp));
            }
            Err(()) => violations.push(TemporalViolation::Malformed(registered::EXP)),
            _ => {}
        }

        match read_date(claims.get(registered::NBF)) {
            Ok(Some(nbf)) if nbf > now.saturating_add_secs(leeway) => {
                violations.push(TemporalViolation::NotYetValid(nbf));
            }
            Err(()) => violations.push(TemporalViolation::Malformed(registered::NBF)),
            _ => {}
        }

        violations
    }
}

fn read_date(value: Option<&Value>) -> Result<Option<UnixTime>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => coerce_integer(v).map(|t| Some(UnixTime(t))).ok_or(()),
    }
}

impl ValidityRule for TemporalValidity {
    fn evaluate(&self, claims: &ClaimSet) -> Option<String> {
        self.violations(claims)
            .into_iter()
            .next()
            .map(|v| v.to_string())
    }
}

/// A way in which a token is outside its validity period
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemporalViolation {
    /// An expiration is required but `exp` is absent
    MissingExpiration,

    /// The token expired at the given time
    Expired(UnixTime),

    /// The token is not valid before the given time
    NotYetValid(UnixTime),

    /// The named claim is not a NumericDate
    Malformed(&'static str),
}

impl fmt::Display for TemporalViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MissingExpiration => f.write_str("JWT is missing a mandatory expiration"),
            Self::Expired(exp) => write!(f, "JWT expired at {}", Iso8601(*exp)),
            Self::NotYetValid(nbf) => write!(f, "JWT is only valid on/after {}", Iso8601(*nbf)),
            Self::Malformed(claim) => write!(f, "JWT has a malformed {claim} claim"),
        }
    }
}

struct Iso8601(UnixTime);

impl fmt::Display for Iso8601 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match DateTime::<Utc>::from_timestamp(self.0 .0, 0) {
            Some(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, false)),
            None => write!(f, "{} seconds after the epoch", self.0 .0),
        }
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::test::{fixed_clock, TS};

    fn rule() -> TemporalValidity {
        TemporalValidity::default()
            .with_leeway_secs(10)
            .with_clock(fixed_clock())
    }

    fn with(name: &str, value: i64) -> Result<ClaimSet> {
        let mut claims = ClaimSet::new();
        claims.set(name, value)?;
        Ok(claims)
    }

    fn with_exp_and(name: &str, value: i64) -> Result<ClaimSet> {
        let mut claims = with(name, value)?;
        claims.set("exp", TS + 3600)?;
        Ok(claims)
    }

    #[test]
    fn not_before_respects_leeway() -> Result<()> {
        let rule = rule();
        assert!(rule.evaluate(&with_exp_and("nbf", TS + 11)?).is_some());
        assert_eq!(rule.evaluate(&with_exp_and("nbf", TS + 5)?), None);
        assert_eq!(rule.evaluate(&with_exp_and("nbf", TS - 11)?), None);
        Ok(())
    }

    #[test]
    fn expiration_respects_leeway() -> Result<()> {
        let rule = rule();
        assert_eq!(rule.evaluate(&with("exp", TS - 5)?), None);
        assert!(rule.evaluate(&with("exp", TS - 11)?).is_some());
        assert_eq!(rule.evaluate(&with("exp", TS + 11)?), None);
        Ok(())
    }

    #[test]
    fn boundaries_are_inclusive() -> Result<()> {
        let rule = rule();
        assert_eq!(rule.evaluate(&with("exp", TS - 10)?), None);
        assert_eq!(rule.evaluate(&with_exp_and("nbf", TS + 10)?), None);
        Ok(())
    }

    #[test]
    fn missing_expiration() {
        let claims = ClaimSet::new();
        assert_eq!(
            rule().evaluate(&claims).as_deref(),
            Some("JWT is missing a mandatory expiration")
        );
        assert_eq!(rule().allow_no_expiration().evaluate(&claims), None);
        assert!(rule()
            .allow_no_expiration()
            .require_expiration()
            .evaluate(&claims)
            .is_some());
    }

    #[test]
    fn messages_render_iso_timestamps() -> Result<()> {
        assert_eq!(
            rule().evaluate(&with_exp_and("nbf", TS + 11)?).as_deref(),
            Some("JWT is only valid on/after 2023-11-06T21:37:45+00:00")
        );
        assert_eq!(
            TemporalViolation::Expired(UnixTime(0)).to_string(),
            "JWT expired at 1970-01-01T00:00:00+00:00"
        );
        Ok(())
    }

    #[test]
    fn first_violation_wins_but_all_are_available() -> Result<()> {
        let rule = rule();
        let claims = with("nbf", TS + 100)?;

        assert_eq!(
            rule.violations(&claims),
            [
                TemporalViolation::MissingExpiration,
                TemporalViolation::NotYetValid(UnixTime(TS + 100)),
            ]
        );
        assert_eq!(
            rule.evaluate(&claims).as_deref(),
            Some("JWT is missing a mandatory expiration")
        );
        Ok(())
    }

    #[test]
    fn expired_and_not_yet_valid_are_independent() -> Result<()> {
        let mut claims = with("exp", TS - 100)?;
        claims.set("nbf", TS + 100)?;
        assert_eq!(
            rule().violations(&claims),
            [
                TemporalViolation::Expired(UnixTime(TS - 100)),
                TemporalViolation::NotYetValid(UnixTime(TS + 100)),
            ]
        );
        Ok(())
    }

    #[test]
    fn malformed_dates_are_reported() -> Result<()> {
        let mut claims = ClaimSet::new();
        claims.set("exp", "tomorrow")?;
        assert_eq!(
            rule().evaluate(&claims).as_deref(),
            Some("JWT has a malformed exp claim")
        );
        Ok(())
    }

    #[test]
    fn string_dates_are_read() -> Result<()> {
        let mut claims = ClaimSet::new();
        claims.set("exp", (TS + 60).to_string())?;
        assert_eq!(rule().evaluate(&claims), None);
        Ok(())
    }
}
