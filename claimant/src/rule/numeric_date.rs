use serde_json::Value;

use super::{ClaimRule, RawClaim, Rejected};
use crate::{
    error,
    filter::{FilterError, FilterOptions, IntegerFilter, ValueFilter},
};

/// A claim rule ensuring the value is a NumericDate within a range
///
/// Clocks are read and date-times converted to seconds since the epoch;
/// any other scalar must convert cleanly to an integer. The default range
/// covers every non-negative `i64`.
///
/// ```
/// use claimant::rule::{ClaimRule, NumericDate, RawClaim};
/// use claimant_clock::{TestClock, UnixTime};
/// use serde_json::json;
///
/// let rule = NumericDate::default();
/// let clock = TestClock::new(UnixTime(1_699_306_654));
///
/// assert_eq!(rule.apply(RawClaim::clock(&clock)), Ok(json!(1_699_306_654)));
/// assert_eq!(rule.apply(RawClaim::from(1_699_306_654)), Ok(json!(1_699_306_654)));
/// assert!(rule.apply(RawClaim::from("yesterday")).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct NumericDate {
    filter: IntegerFilter,
}

impl Default for NumericDate {
    #[inline]
    fn default() -> Self {
        Self {
            filter: IntegerFilter::ordered(0, i64::MAX),
        }
    }
}

impl NumericDate {
    /// A NumericDate rule restricted to `min..=max`
    ///
    /// # Errors
    ///
    /// Returns an error if `min` is greater than `max`.
    pub fn with_range(min: i64, max: i64) -> Result<Self, error::InvalidRuleConfig> {
        Ok(Self {
            filter: IntegerFilter::with_range(min, max)?,
        })
    }

    /// The inclusive lower bound
    #[inline]
    #[must_use]
    pub const fn min(&self) -> i64 {
        self.filter.min()
    }

    /// The inclusive upper bound
    #[inline]
    #[must_use]
    pub const fn max(&self) -> i64 {
        self.filter.max()
    }
}

impl ClaimRule for NumericDate {
    fn apply(&self, value: RawClaim<'_>) -> Result<Value, Rejected> {
        self.filter
            .accept(&value.into_json())
            .map(Value::from)
            .ok_or(Rejected)
    }
}

/// A NumericDate filter for outbound claims
///
/// Resolves clock and date-time inputs itself and delegates everything
/// else, including the range, scalarity, and failure mode, to an
/// [`IntegerFilter`]. Unlike [`NumericDate`], a soft-failing filter turns a
/// bad value into `null`, which removes the claim instead of rejecting it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct NumericDateFilter {
    inner: IntegerFilter,
}

impl Default for NumericDateFilter {
    #[inline]
    fn default() -> Self {
        Self {
            inner: IntegerFilter::ordered(0, i64::MAX),
        }
    }
}

impl NumericDateFilter {
    /// A NumericDate filter over the given integer filter
    #[inline]
    pub const fn new(inner: IntegerFilter) -> Self {
        Self { inner }
    }

    /// Replaces the options of the underlying integer filter
    #[inline]
    pub const fn with_options(self, options: FilterOptions) -> Self {
        Self {
            inner: self.inner.with_options(options),
        }
    }
}

impl ValueFilter for NumericDateFilter {
    #[inline]
    fn filter_value(&self, value: Value) -> Result<Value, FilterError> {
        self.inner.filter_value(value)
    }
}

impl ClaimRule for NumericDateFilter {
    fn apply(&self, value: RawClaim<'_>) -> Result<Value, Rejected> {
        self.filter_value(value.into_json()).map_err(|_| Rejected)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use claimant_clock::{TestClock, UnixTime};
    use serde_json::json;

    use super::*;
    use crate::{
        filter::{Failure, Scalarity},
        test::TS,
    };

    #[test]
    fn in_range_integers_pass_through() -> Result<(), error::InvalidRuleConfig> {
        let rule = NumericDate::with_range(100, 200)?;
        for v in [100, 150, 200] {
            assert_eq!(rule.apply(RawClaim::from(v)), Ok(json!(v)));
        }
        Ok(())
    }

    #[test]
    fn out_of_range_integers_are_rejected() -> Result<(), error::InvalidRuleConfig> {
        let rule = NumericDate::with_range(100, 200)?;
        assert_eq!(rule.apply(RawClaim::from(99)), Err(Rejected));
        assert_eq!(rule.apply(RawClaim::from(201)), Err(Rejected));
        assert_eq!(NumericDate::default().apply(RawClaim::from(-1)), Err(Rejected));
        Ok(())
    }

    #[test]
    fn non_numeric_input_is_rejected() {
        let rule = NumericDate::default();
        assert_eq!(rule.apply(RawClaim::from("alpha")), Err(Rejected));
        assert_eq!(rule.apply(RawClaim::from(3.5)), Err(Rejected));
        assert_eq!(rule.apply(RawClaim::from(json!([TS]))), Err(Rejected));
        assert_eq!(rule.apply(RawClaim::from(json!({"ts": TS}))), Err(Rejected));
        assert_eq!(rule.apply(RawClaim::from(Value::Null)), Err(Rejected));
    }

    #[test]
    fn numeric_scalars_are_converted() {
        let rule = NumericDate::default();
        assert_eq!(rule.apply(RawClaim::from("1699306654")), Ok(json!(TS)));
        assert_eq!(rule.apply(RawClaim::from(1_699_306_654.0)), Ok(json!(TS)));
    }

    #[test]
    fn clock_reads_equal_their_timestamp() {
        let rule = NumericDate::default();
        let clock = TestClock::new(UnixTime(TS));
        assert_eq!(
            rule.apply(RawClaim::clock(&clock)),
            rule.apply(RawClaim::from(TS))
        );
    }

    #[test]
    fn date_times_resolve_to_epoch_seconds() {
        let rule = NumericDate::default();
        let dt = DateTime::<Utc>::from_timestamp(TS, 500).unwrap();
        assert_eq!(rule.apply(RawClaim::from(dt)), Ok(json!(TS)));
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let rule = NumericDate::default();
        let once = rule.apply(RawClaim::from("  42")).unwrap();
        assert_eq!(rule.apply(RawClaim::from(once.clone())), Ok(once));
    }

    #[test]
    fn strict_filter_resolves_instants() {
        let filter = NumericDateFilter::default().with_options(FilterOptions {
            failure: Failure::Soft,
            scalarity: Scalarity::Any,
        });
        let clock = TestClock::new(UnixTime(16_000_000));

        assert_eq!(filter.apply(RawClaim::from(16_000_000)), Ok(json!(16_000_000)));
        assert_eq!(filter.apply(RawClaim::clock(&clock)), Ok(json!(16_000_000)));
        assert!(filter
            .apply(RawClaim::from(std::time::SystemTime::now()))
            .unwrap()
            .is_i64());
    }

    #[test]
    fn strict_filter_failure_modes() {
        let hard = NumericDateFilter::default();
        assert_eq!(hard.apply(RawClaim::from("soon")), Err(Rejected));

        let soft = hard.with_options(FilterOptions {
            failure: Failure::Soft,
            ..FilterOptions::default()
        });
        assert_eq!(soft.apply(RawClaim::from("soon")), Ok(Value::Null));
    }
}
