//! Generic value filters
//!
//! Value filters are the general-purpose building blocks beneath the
//! specialized claim rules. A filter takes a JSON value and either returns
//! it in canonical form or fails. How a failure is reported is a matter of
//! configuration: with [`Failure::Soft`], a failing value is replaced by
//! `null`; with [`Failure::Hard`], the filter returns a [`FilterError`].
//!
//! [`Scalarity`] controls whether a filter accepts scalars, arrays of
//! scalars (filtered element by element), or either.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::error;

/// How a filter reports a value it cannot accept
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Failure {
    /// Replace the value with `null`
    Soft,

    /// Return a [`FilterError`]
    #[default]
    Hard,
}

/// The shape of value a filter accepts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Scalarity {
    /// Only scalars: strings, numbers, and booleans
    #[default]
    Scalar,

    /// Only arrays, each element of which is filtered as a scalar
    Array,

    /// Scalars or arrays of scalars
    Any,
}

/// Options shared by all value filters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FilterOptions {
    /// How failures are reported
    pub failure: Failure,

    /// Which shapes of value are accepted
    pub scalarity: Scalarity,
}

impl FilterOptions {
    fn fail(&self, filter: &'static str) -> Result<Value, FilterError> {
        match self.failure {
            Failure::Soft => Ok(Value::Null),
            Failure::Hard => Err(FilterError { filter }),
        }
    }
}

/// A value failed a filter configured for hard failure
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("value failed {filter} filter")]
pub struct FilterError {
    filter: &'static str,
}

impl FilterError {
    /// The name of the filter that failed
    #[must_use]
    pub fn filter(&self) -> &'static str {
        self.filter
    }
}

/// A filter over JSON values
pub trait ValueFilter: fmt::Debug + Send + Sync {
    /// Filters a value, returning it in canonical form
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be accepted and the filter is
    /// configured for hard failure.
    fn filter_value(&self, value: Value) -> Result<Value, FilterError>;
}

impl<T> ValueFilter for &'_ T
where
    T: ValueFilter + ?Sized,
{
    #[inline]
    fn filter_value(&self, value: Value) -> Result<Value, FilterError> {
        T::filter_value(self, value)
    }
}

impl<T> ValueFilter for Box<T>
where
    T: ValueFilter + ?Sized,
{
    #[inline]
    fn filter_value(&self, value: Value) -> Result<Value, FilterError> {
        T::filter_value(self, value)
    }
}

/// A filter accepting integers within an inclusive range
///
/// Accepted inputs are integers, floats without a fractional part, `true`
/// (as `1`), and strings holding a decimal integer. Output is always a JSON
/// integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct IntegerFilter {
    min: i64,
    max: i64,
    options: FilterOptions,
}

impl Default for IntegerFilter {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl IntegerFilter {
    /// An integer filter accepting any `i64`
    #[inline]
    pub const fn new() -> Self {
        Self {
            min: i64::MIN,
            max: i64::MAX,
            options: FilterOptions {
                failure: Failure::Hard,
                scalarity: Scalarity::Scalar,
            },
        }
    }

    /// An integer filter accepting values in `min..=max`
    ///
    /// # Errors
    ///
    /// Returns an error if `min` is greater than `max`.
    pub fn with_range(min: i64, max: i64) -> Result<Self, error::InvalidRuleConfig> {
        if min > max {
            return Err(error::invalid_rule_config(format!(
                "integer range is empty: {min} > {max}"
            )));
        }

        Ok(Self::ordered(min, max))
    }

    pub(crate) const fn ordered(min: i64, max: i64) -> Self {
        debug_assert!(min <= max);
        Self {
            min,
            max,
            ..Self::new()
        }
    }

    /// Replaces the filter options
    #[inline]
    pub const fn with_options(self, options: FilterOptions) -> Self {
        Self { options, ..self }
    }

    /// The inclusive lower bound
    #[inline]
    #[must_use]
    pub const fn min(&self) -> i64 {
        self.min
    }

    /// The inclusive upper bound
    #[inline]
    #[must_use]
    pub const fn max(&self) -> i64 {
        self.max
    }

    /// The filter options
    #[inline]
    pub const fn options(&self) -> FilterOptions {
        self.options
    }

    pub(crate) fn accept(&self, value: &Value) -> Option<i64> {
        coerce_integer(value).filter(|n| (self.min..=self.max).contains(n))
    }

    fn filter_scalar(&self, value: &Value) -> Result<Value, FilterError> {
        match self.accept(value) {
            Some(n) => Ok(Value::from(n)),
            None => self.options.fail("integer"),
        }
    }

    fn filter_elements(&self, items: Vec<Value>) -> Result<Value, FilterError> {
        items
            .iter()
            .map(|item| self.filter_scalar(item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

impl ValueFilter for IntegerFilter {
    fn filter_value(&self, value: Value) -> Result<Value, FilterError> {
        match (self.options.scalarity, value) {
            (Scalarity::Array | Scalarity::Any, Value::Array(items)) => self.filter_elements(items),
            (Scalarity::Array, _) => self.options.fail("integer"),
            (_, value) => self.filter_scalar(&value),
        }
    }
}

/// Reads an integer out of a JSON scalar
///
/// Arrays, objects, `null`, `false`, fractional floats, and strings that do
/// not hold a canonical decimal integer yield `None`.
pub(crate) fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            // i64::MAX as f64 rounds up to 2^63, which is out of range
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Some(f as i64)
            } else {
                None
            }
        }),
        Value::Bool(true) => Some(1),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<i64> {
    let digits = s.strip_prefix(&['+', '-'][..]).unwrap_or(s);
    let canonical = match digits.as_bytes() {
        [b'0'] => true,
        [b'1'..=b'9', rest @ ..] => rest.iter().all(u8::is_ascii_digit),
        _ => false,
    };

    if canonical {
        s.parse().ok()
    } else {
        None
    }
}
