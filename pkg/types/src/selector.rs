use anyhow::{Result, bail};
use std::collections::BTreeMap;
use std::fmt;

use crate::validate::{validate_label_key, validate_label_value};

/// One clause of a label selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    Exists(String),
    DoesNotExist(String),
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Requirement::Equals(k, v) => labels.get(k) == Some(v),
            // Like Kubernetes, `k!=v` also matches objects without `k`.
            Requirement::NotEquals(k, v) => labels.get(k) != Some(v),
            Requirement::Exists(k) => labels.contains_key(k),
            Requirement::DoesNotExist(k) => !labels.contains_key(k),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Equals(k, v) => write!(f, "{}={}", k, v),
            Requirement::NotEquals(k, v) => write!(f, "{}!={}", k, v),
            Requirement::Exists(k) => write!(f, "{}", k),
            Requirement::DoesNotExist(k) => write!(f, "!{}", k),
        }
    }
}

/// Equality-based label selector, e.g. `k8s-app=konnectivity-server,!canary`.
/// All requirements must hold. The empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    /// Selector that matches every object.
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Self::everything());
        }

        let mut requirements = Vec::new();
        for term in input.split(',') {
            let term = term.trim();
            if term.is_empty() {
                bail!("empty term in label selector '{}'", input);
            }
            requirements.push(parse_term(term)?);
        }
        Ok(Self { requirements })
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self.requirements.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", terms.join(","))
    }
}

fn parse_term(term: &str) -> Result<Requirement> {
    // `!=` must be checked before `=`/`==`.
    if let Some((key, value)) = term.split_once("!=") {
        let (key, value) = checked_pair(key, value)?;
        return Ok(Requirement::NotEquals(key, value));
    }
    if let Some((key, value)) = term.split_once("==").or_else(|| term.split_once('=')) {
        let (key, value) = checked_pair(key, value)?;
        return Ok(Requirement::Equals(key, value));
    }
    if let Some(key) = term.strip_prefix('!') {
        let key = key.trim();
        validate_label_key(key)?;
        return Ok(Requirement::DoesNotExist(key.to_string()));
    }
    validate_label_key(term)?;
    Ok(Requirement::Exists(term.to_string()))
}

fn checked_pair(key: &str, value: &str) -> Result<(String, String)> {
    let (key, value) = (key.trim(), value.trim());
    validate_label_key(key)?;
    validate_label_value(value)?;
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let sel = LabelSelector::parse("  ").unwrap();
        assert!(sel.is_empty());
        assert!(sel.matches(&labels(&[])));
        assert!(sel.matches(&labels(&[("a", "b")])));
    }

    #[test]
    fn test_equality() {
        let sel = LabelSelector::parse("k8s-app=konnectivity-server").unwrap();
        assert!(sel.matches(&labels(&[("k8s-app", "konnectivity-server")])));
        assert!(!sel.matches(&labels(&[("k8s-app", "other")])));
        assert!(!sel.matches(&labels(&[])));

        let double = LabelSelector::parse("k8s-app==konnectivity-server").unwrap();
        assert_eq!(sel, double);
    }

    #[test]
    fn test_inequality_matches_missing_key() {
        let sel = LabelSelector::parse("tier!=canary").unwrap();
        assert!(sel.matches(&labels(&[])));
        assert!(sel.matches(&labels(&[("tier", "stable")])));
        assert!(!sel.matches(&labels(&[("tier", "canary")])));
    }

    #[test]
    fn test_existence_terms() {
        let sel = LabelSelector::parse("owned, !paused").unwrap();
        assert!(sel.matches(&labels(&[("owned", "")])));
        assert!(!sel.matches(&labels(&[("owned", "yes"), ("paused", "true")])));
        assert!(!sel.matches(&labels(&[])));
    }

    #[test]
    fn test_conjunction_and_display() {
        let sel = LabelSelector::parse("a=1,b!=2,c,!d").unwrap();
        assert_eq!(sel.requirements().len(), 4);
        assert_eq!(sel.to_string(), "a=1,b!=2,c,!d");
        assert!(sel.matches(&labels(&[("a", "1"), ("c", "x")])));
        assert!(!sel.matches(&labels(&[("a", "1")])));
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(LabelSelector::parse("a=1,,b=2").is_err());
        assert!(LabelSelector::parse("=value").is_err());
        assert!(LabelSelector::parse("a=bad value").is_err());
        assert!(LabelSelector::parse("!").is_err());
    }
}
