use super::ValidityRule;
use crate::{error, ClaimName, ClaimSet};

/// A validity rule restricting which claims may be present
///
/// Every mandatory claim must be present, and every present claim must be
/// either mandatory or optional.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct AllowedClaimSet {
    mandatory: Vec<ClaimName>,
    optional: Vec<ClaimName>,
}

impl AllowedClaimSet {
    /// Constructs a rule from the mandatory and optional claim names
    ///
    /// # Errors
    ///
    /// Returns an error if any name is empty.
    pub fn new<M, O>(mandatory: M, optional: O) -> Result<Self, error::InvalidClaimName>
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
        O: IntoIterator,
        O::Item: AsRef<str>,
    {
        Ok(Self {
            mandatory: claim_names(mandatory)?,
            optional: claim_names(optional)?,
        })
    }

    /// The mandatory claim names
    #[must_use]
    pub fn mandatory(&self) -> &[ClaimName] {
        &self.mandatory
    }

    /// The optional claim names
    #[must_use]
    pub fn optional(&self) -> &[ClaimName] {
        &self.optional
    }

    /// Mandatory claims that are absent, in configured order
    pub fn missing<'a>(&'a self, claims: &'a ClaimSet) -> impl Iterator<Item = &'a str> + 'a {
        self.mandatory
            .iter()
            .map(|n| n.as_str())
            .filter(move |name| !claims.contains(name))
    }

    /// Present claims that are neither mandatory nor optional, in claim order
    pub fn surplus<'a>(&'a self, claims: &'a ClaimSet) -> impl Iterator<Item = &'a str> + 'a {
        claims.names().filter(move |name| !self.allows(name))
    }

    fn allows(&self, name: &str) -> bool {
        self.mandatory
            .iter()
            .chain(&self.optional)
            .any(|allowed| allowed.as_str() == name)
    }
}

fn claim_names<I>(names: I) -> Result<Vec<ClaimName>, error::InvalidClaimName>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    names
        .into_iter()
        .map(|n| ClaimName::new(n.as_ref().to_owned()))
        .collect()
}

impl ValidityRule for AllowedClaimSet {
    fn evaluate(&self, claims: &ClaimSet) -> Option<String> {
        let missing: Vec<_> = self.missing(claims).collect();
        let surplus: Vec<_> = self.surplus(claims).collect();

        let mut parts = Vec::with_capacity(2);
        if !missing.is_empty() {
            parts.push(format!("missing are {}", missing.join(", ")));
        }
        if !surplus.is_empty() {
            parts.push(format!("unrecognized are {}", surplus.join(", ")));
        }

        if parts.is_empty() {
            None
        } else {
            Some(format!("allowed claims mismatch: {}", parts.join(" - ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use serde_json::json;

    use super::*;

    fn claims(names: &[&str]) -> Result<ClaimSet> {
        let mut claims = ClaimSet::new();
        for name in names {
            claims.set(name, json!(1))?;
        }
        Ok(claims)
    }

    #[test]
    fn exact_match_passes() -> Result<()> {
        let rule = AllowedClaimSet::new(["a", "b"], ["c"])?;
        assert_eq!(rule.evaluate(&claims(&["a", "b"])?), None);
        assert_eq!(rule.evaluate(&claims(&["b", "c", "a"])?), None);
        Ok(())
    }

    #[test]
    fn reports_missing_claims() -> Result<()> {
        let rule = AllowedClaimSet::new(["a", "b", "c"], ["d"])?;
        assert_eq!(
            rule.evaluate(&claims(&["b"])?).as_deref(),
            Some("allowed claims mismatch: missing are a, c")
        );
        Ok(())
    }

    #[test]
    fn reports_unrecognized_claims() -> Result<()> {
        let rule = AllowedClaimSet::new(["a"], ["b"])?;
        assert_eq!(
            rule.evaluate(&claims(&["z", "a", "y"])?).as_deref(),
            Some("allowed claims mismatch: unrecognized are z, y")
        );
        Ok(())
    }

    #[test]
    fn reports_both() -> Result<()> {
        let rule = AllowedClaimSet::new(["a", "b"], ["c"])?;
        assert_eq!(
            rule.evaluate(&claims(&["a", "d"])?).as_deref(),
            Some("allowed claims mismatch: missing are b - unrecognized are d")
        );
        Ok(())
    }

    #[test]
    fn empty_configuration_rejects_everything_present() -> Result<()> {
        let rule = AllowedClaimSet::default();
        assert_eq!(rule.evaluate(&ClaimSet::new()), None);
        assert!(rule.evaluate(&claims(&["a"])?).is_some());
        Ok(())
    }

    #[test]
    fn empty_names_are_refused() {
        assert!(AllowedClaimSet::new([""], Vec::<&str>::new()).is_err());
        assert!(AllowedClaimSet::new(["a"], [""]).is_err());
    }
}
