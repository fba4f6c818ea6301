//! Claim rules
//!
//! A claim rule is the unit of write-time enforcement for a single claim.
//! Every value written to a claim with a registered rule is passed through
//! [`ClaimRule::apply()`], which either normalizes the value or rejects it.
//!
//! Rules never panic or fail on malformed input. A rejection is reported as
//! the [`Rejected`] sentinel and it is up to the owning
//! [`ClaimSet`][crate::ClaimSet] to decide what happens next, according to
//! its [`WritePolicy`][crate::WritePolicy].
//!
//! ```
//! use claimant::rule::{ClaimRule, NumericDate, RawClaim, StringOrUri};
//! use serde_json::json;
//!
//! let date = NumericDate::default();
//! assert_eq!(date.apply(RawClaim::from("1700000000")), Ok(json!(1_700_000_000)));
//! assert!(date.apply(RawClaim::from(-1)).is_err());
//!
//! let text = StringOrUri::new();
//! assert_eq!(text.apply(RawClaim::from(3)), Ok(json!("3")));
//! ```

use std::{fmt, sync::Arc, time::SystemTime};

use chrono::{DateTime, Utc};
use claimant_clock::{Clock, UnixTime};
use serde_json::Value;
use thiserror::Error;

mod allowed;
mod numeric_date;
mod string_or_uri;

pub use allowed::AllowedValues;
pub use numeric_date::{NumericDate, NumericDateFilter};
pub use string_or_uri::StringOrUri;

use crate::filter::{FilterError, ValueFilter};

/// The sentinel outcome of a claim rule that refused a value
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Error)]
#[error("value rejected by claim rule")]
pub struct Rejected;

/// A value on its way into a claim
///
/// Besides plain JSON values, a claim may be written from a clock, which is
/// read once at the time of the write, or from a date-time. Rules that deal
/// in NumericDates resolve both to seconds since the Unix epoch; every other
/// path resolves them the same way before the value is stored.
pub enum RawClaim<'a> {
    /// A JSON value
    Json(Value),

    /// A clock whose current reading is the value
    Clock(&'a dyn Clock),

    /// A specific instant in time
    DateTime(DateTime<Utc>),
}

impl<'a> RawClaim<'a> {
    /// A value read from the given clock when the claim is written
    #[inline]
    pub fn clock(clock: &'a dyn Clock) -> Self {
        Self::Clock(clock)
    }

    /// A value that renders to a string, captured in its rendered form
    #[inline]
    pub fn display(value: &impl fmt::Display) -> Self {
        Self::Json(Value::String(value.to_string()))
    }

    /// The kind of the value, as used in diagnostics and errors
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Json(Value::Null) => "null",
            Self::Json(Value::Bool(_)) => "boolean",
            Self::Json(Value::Number(n)) if n.is_f64() => "float",
            Self::Json(Value::Number(_)) => "integer",
            Self::Json(Value::String(_)) => "string",
            Self::Json(Value::Array(_)) => "array",
            Self::Json(Value::Object(_)) => "object",
            Self::Clock(_) => "clock",
            Self::DateTime(_) => "datetime",
        }
    }

    /// Whether this is the JSON `null` value
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Json(Value::Null))
    }

    /// Resolves the value to plain JSON
    ///
    /// Clocks are read and date-times are converted, both to an integer
    /// count of seconds since the Unix epoch.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(v) => v,
            Self::Clock(clock) => Value::from(clock.now().0),
            Self::DateTime(dt) => Value::from(dt.timestamp()),
        }
    }
}

impl fmt::Debug for RawClaim<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Self::Clock(_) => f.write_str("Clock(..)"),
            Self::DateTime(dt) => f.debug_tuple("DateTime").field(dt).finish(),
        }
    }
}

impl From<Value> for RawClaim<'_> {
    #[inline]
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl From<&Value> for RawClaim<'_> {
    #[inline]
    fn from(v: &Value) -> Self {
        Self::Json(v.clone())
    }
}

macro_rules! json_conversions {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for RawClaim<'_> {
                #[inline]
                fn from(v: $t) -> Self {
                    Self::Json(Value::from(v))
                }
            }
        )*
    };
}

json_conversions!(&str, String, bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl From<&String> for RawClaim<'_> {
    #[inline]
    fn from(v: &String) -> Self {
        Self::Json(Value::String(v.clone()))
    }
}

impl From<UnixTime> for RawClaim<'_> {
    #[inline]
    fn from(t: UnixTime) -> Self {
        Self::Json(Value::from(t.0))
    }
}

impl From<DateTime<Utc>> for RawClaim<'_> {
    #[inline]
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }
}

impl From<SystemTime> for RawClaim<'_> {
    #[inline]
    fn from(t: SystemTime) -> Self {
        Self::DateTime(DateTime::<Utc>::from(t))
    }
}

impl<'a> From<&'a dyn Clock> for RawClaim<'a> {
    #[inline]
    fn from(clock: &'a dyn Clock) -> Self {
        Self::Clock(clock)
    }
}

impl<'a, T> From<Option<T>> for RawClaim<'a>
where
    T: Into<RawClaim<'a>>,
{
    #[inline]
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Json(Value::Null),
        }
    }
}

/// A rule that normalizes or rejects the value of a single claim
pub trait ClaimRule: fmt::Debug + Send + Sync {
    /// Checks a claim value and returns it in its proper form
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] if the value cannot be used for this claim.
    fn apply(&self, value: RawClaim<'_>) -> Result<Value, Rejected>;
}

impl<T> ClaimRule for &'_ T
where
    T: ClaimRule + ?Sized,
{
    #[inline]
    fn apply(&self, value: RawClaim<'_>) -> Result<Value, Rejected> {
        T::apply(self, value)
    }
}

impl<T> ClaimRule for Box<T>
where
    T: ClaimRule + ?Sized,
{
    #[inline]
    fn apply(&self, value: RawClaim<'_>) -> Result<Value, Rejected> {
        T::apply(self, value)
    }
}

impl<T> ClaimRule for Arc<T>
where
    T: ClaimRule + ?Sized,
{
    #[inline]
    fn apply(&self, value: RawClaim<'_>) -> Result<Value, Rejected> {
        T::apply(self, value)
    }
}

/// A claim rule backed by a function
///
/// Constructed with [`from_fn()`].
#[derive(Clone, Copy)]
pub struct FnRule<F> {
    f: F,
}

impl<F> fmt::Debug for FnRule<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("FnRule")
    }
}

impl<F> ClaimRule for FnRule<F>
where
    F: Fn(RawClaim<'_>) -> Result<Value, Rejected> + Send + Sync,
{
    #[inline]
    fn apply(&self, value: RawClaim<'_>) -> Result<Value, Rejected> {
        (self.f)(value)
    }
}

/// Wraps a function as a claim rule
///
/// ```
/// use claimant::rule::{self, ClaimRule, RawClaim, Rejected};
/// use serde_json::{json, Value};
///
/// let increment = rule::from_fn(|v: RawClaim<'_>| match v.into_json() {
///     Value::Number(n) => n.as_i64().map(|n| json!(n + 1)).ok_or(Rejected),
///     _ => Err(Rejected),
/// });
///
/// assert_eq!(increment.apply(RawClaim::from(3)), Ok(json!(4)));
/// ```
pub fn from_fn<F>(f: F) -> FnRule<F>
where
    F: Fn(RawClaim<'_>) -> Result<Value, Rejected> + Send + Sync,
{
    FnRule { f }
}

/// A claim rule that delegates to a generic [`ValueFilter`]
///
/// Clock and date-time inputs are resolved to NumericDates before the
/// filter sees them. A filter configured for soft failure turns bad values
/// into `null`, which removes the claim; a hard failure rejects the value.
#[derive(Clone, Debug)]
pub struct Filtered<F> {
    filter: F,
}

impl<F> Filtered<F> {
    /// Adapts a value filter into a claim rule
    #[inline]
    pub const fn new(filter: F) -> Self {
        Self { filter }
    }

    /// The underlying value filter
    #[inline]
    pub fn filter(&self) -> &F {
        &self.filter
    }
}

impl<F> ClaimRule for Filtered<F>
where
    F: ValueFilter,
{
    fn apply(&self, value: RawClaim<'_>) -> Result<Value, Rejected> {
        self.filter
            .filter_value(value.into_json())
            .map_err(|_: FilterError| Rejected)
    }
}
