//! Diagnostics emitted by claim sets
//!
//! A [`ClaimSet`][crate::ClaimSet] reports noteworthy events, such as a
//! claim written without any rule or a value that a rule refused, to an
//! optional [`DiagnosticSink`]. The default sink, [`Silent`], discards
//! everything. With the `tracing` feature enabled, [`Tracing`] forwards
//! each event to the `tracing` ecosystem at an appropriate level.

use std::{fmt, sync::Arc};

/// The severity of a diagnostic event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Informational
    Info,

    /// Something looks wrong with the token
    Warn,

    /// A value could not be accepted
    Error,
}

/// A diagnostic event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Diagnostic<'a> {
    /// A claim was written that has no rule registered
    UnfilteredClaim {
        /// The claim name
        claim: &'a str,
        /// The `jti` of the token, or `(unset)`
        jti: &'a str,
    },

    /// A claim value was refused by its rule
    RejectedClaim {
        /// The claim name
        claim: &'a str,
        /// The `jti` of the token, or `(unset)`
        jti: &'a str,
    },

    /// The token failed one or more validity rules
    InvalidToken {
        /// The `jti` of the token, or `(unset)`
        jti: &'a str,
        /// Each individual failure
        failures: &'a [String],
    },

    /// The token was validated against an empty set of validity rules
    NoValidityRules {
        /// The `jti` of the token, or `(unset)`
        jti: &'a str,
    },
}

impl Diagnostic<'_> {
    /// The severity of this event
    #[must_use]
    pub const fn level(&self) -> Level {
        match self {
            Self::UnfilteredClaim { .. } | Self::NoValidityRules { .. } => Level::Info,
            Self::InvalidToken { .. } => Level::Warn,
            Self::RejectedClaim { .. } => Level::Error,
        }
    }
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnfilteredClaim { claim, jti } => {
                write!(f, "unfiltered claim {claim} on JWT with ID {jti}")
            }
            Self::RejectedClaim { claim, jti } => {
                write!(f, "invalid value for claim {claim} on JWT with ID {jti}")
            }
            Self::InvalidToken { jti, failures } => {
                write!(f, "invalid JWT with ID {jti}: {}", failures.join("; "))
            }
            Self::NoValidityRules { jti } => {
                write!(f, "JWT with ID {jti} has no validity rules")
            }
        }
    }
}

/// A receiver of diagnostic events
pub trait DiagnosticSink: Send + Sync {
    /// Receives a diagnostic event
    fn notice(&self, diagnostic: &Diagnostic<'_>);
}

impl<T> DiagnosticSink for &'_ T
where
    T: DiagnosticSink + ?Sized,
{
    #[inline]
    fn notice(&self, diagnostic: &Diagnostic<'_>) {
        T::notice(self, diagnostic)
    }
}

impl<T> DiagnosticSink for Box<T>
where
    T: DiagnosticSink + ?Sized,
{
    #[inline]
    fn notice(&self, diagnostic: &Diagnostic<'_>) {
        T::notice(self, diagnostic)
    }
}

impl<T> DiagnosticSink for Arc<T>
where
    T: DiagnosticSink + ?Sized,
{
    #[inline]
    fn notice(&self, diagnostic: &Diagnostic<'_>) {
        T::notice(self, diagnostic)
    }
}

/// A sink that discards every event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Silent;

impl DiagnosticSink for Silent {
    #[inline]
    fn notice(&self, _: &Diagnostic<'_>) {}
}

/// A sink that forwards events to `tracing`
///
/// Each event is logged at the `tracing` level matching
/// [`Diagnostic::level()`], with the claim name and `jti` as fields.
#[cfg(feature = "tracing")]
#[cfg_attr(docsrs, doc(cfg(feature = "tracing")))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tracing;

#[cfg(feature = "tracing")]
impl DiagnosticSink for Tracing {
    fn notice(&self, diagnostic: &Diagnostic<'_>) {
        let (claim, jti) = match *diagnostic {
            Diagnostic::UnfilteredClaim { claim, jti }
            | Diagnostic::RejectedClaim { claim, jti } => (Some(claim), jti),
            Diagnostic::InvalidToken { jti, .. } | Diagnostic::NoValidityRules { jti } => (None, jti),
        };

        match diagnostic.level() {
            Level::Info => tracing::info!(claim, jti, "{diagnostic}"),
            Level::Warn => tracing::warn!(claim, jti, "{diagnostic}"),
            Level::Error => tracing::error!(claim, jti, "{diagnostic}"),
        }
    }
}

/// A sink backed by a function
///
/// Constructed with [`from_fn()`].
#[derive(Clone, Copy)]
pub struct FnSink<F> {
    f: F,
}

impl<F> fmt::Debug for FnSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("FnSink")
    }
}

impl<F> DiagnosticSink for FnSink<F>
where
    F: Fn(&Diagnostic<'_>) + Send + Sync,
{
    #[inline]
    fn notice(&self, diagnostic: &Diagnostic<'_>) {
        (self.f)(diagnostic)
    }
}

/// Wraps a function as a diagnostic sink
pub fn from_fn<F>(f: F) -> FnSink<F>
where
    F: Fn(&Diagnostic<'_>) + Send + Sync,
{
    FnSink { f }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn levels() {
        let unfiltered = Diagnostic::UnfilteredClaim {
            claim: "x",
            jti: "(unset)",
        };
        let rejected = Diagnostic::RejectedClaim {
            claim: "x",
            jti: "(unset)",
        };
        assert_eq!(unfiltered.level(), Level::Info);
        assert_eq!(rejected.level(), Level::Error);
        assert!(rejected.level() > unfiltered.level());
    }

    #[test]
    fn messages_name_the_token() {
        let failures = vec!["too early".to_owned(), "too late".to_owned()];
        let diag = Diagnostic::InvalidToken {
            jti: "abc",
            failures: &failures,
        };
        assert_eq!(diag.to_string(), "invalid JWT with ID abc: too early; too late");
    }

    #[test]
    #[cfg(feature = "tracing")]
    #[tracing_test::traced_test]
    fn tracing_sink_logs_at_the_event_level() {
        Tracing.notice(&Diagnostic::RejectedClaim {
            claim: "exp",
            jti: "abc",
        });
        Tracing.notice(&Diagnostic::NoValidityRules { jti: "def" });

        assert!(logs_contain("ERROR"));
        assert!(logs_contain("invalid value for claim exp on JWT with ID abc"));
        assert!(logs_contain("INFO"));
        assert!(logs_contain("JWT with ID def has no validity rules"));
        assert!(!logs_contain("WARN"));
    }

    #[test]
    fn function_sinks_receive_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            from_fn(move |d: &Diagnostic<'_>| seen.lock().unwrap().push(d.to_string()))
        };

        sink.notice(&Diagnostic::NoValidityRules { jti: "j" });
        Silent.notice(&Diagnostic::NoValidityRules { jti: "k" });

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["JWT with ID j has no validity rules".to_owned()]
        );
    }
}
