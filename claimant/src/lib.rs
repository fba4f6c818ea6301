//! Claim sets for JSON Web Tokens, with write-time rules and validity checks
//!
//! This crate holds the payload and header of a token as ordered JSON claim
//! sets and keeps them well-formed:
//!
//! * [`rule`]s normalize or reject each value as it is written to a claim;
//! * [`validity`] rules evaluate the claim set as a whole on demand;
//! * [`codec`] defines the seams for the backends that sign, encrypt, and
//!   serialize tokens.
//!
//! Registered claims follow [RFC7519][].
//!
//! [RFC7519]: https://tools.ietf.org/html/rfc7519
//!
//! # Example
//!
//! ```
//! use claimant::{
//!     rule::{RawClaim, StringOrUri},
//!     validity::{AllowedClaimSet, TemporalValidity, ValidityChain},
//!     ClaimSet,
//! };
//! use claimant_clock::{TestClock, UnixTime};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let clock = TestClock::new(UnixTime(1_699_306_654));
//!
//! let mut claims = ClaimSet::new()
//!     .with_registered_rules()
//!     .with_rule(["aud"], StringOrUri::matching(r"https://.+")?)?;
//!
//! claims.set("iss", "https://issuer.example")?;
//! claims.set("aud", "https://api.example")?;
//! claims.set("iat", RawClaim::clock(&clock))?;
//! claims.set("exp", 1_699_310_254)?;
//!
//! assert!(claims.set("aud", "ftp://api.example").is_err());
//! assert!(claims.set("exp", "next week").is_err());
//!
//! let chain = ValidityChain::new()
//!     .with(AllowedClaimSet::new(["iss", "aud", "exp"], ["iat", "sub"])?)
//!     .with(TemporalValidity::default().with_clock(clock));
//! claims.validate(&chain)?;
//!
//! assert_eq!(
//!     claims.to_string(),
//!     r#"{"iss":"https://issuer.example","aud":"https://api.example","iat":1699306654,"exp":1699310254}"#
//! );
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod claims;
pub mod codec;
pub mod diagnostic;
pub mod error;
pub mod filter;
pub mod rule;
pub mod validity;

#[cfg(test)]
pub(crate) mod test;

#[doc(inline)]
pub use claims::{registered, ClaimName, ClaimNameRef, ClaimSet, WritePolicy};
#[doc(inline)]
pub use validity::{ValidityChain, ValidityRule};
