//! Value resolver - picks the guarded candidate that applies to a context
//!
//! Candidates whose guards match the context compete on specificity (the
//! number of non-wildcard guard dimensions). The most specific candidate
//! wins; among equally specific candidates the first declared one wins,
//! and every differing value it beat is reported as a [`Tie`].

use crate::error::{Error, Result};
use crate::model::{AttributeCategory, Guard, GuardedValue, Node};
use std::collections::BTreeSet;
use std::fmt;

/// The concrete (domain, node, labels) a value is resolved for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    pub domain: String,
    pub node: String,
    pub labels: BTreeSet<String>,
}

impl ResolutionContext {
    pub fn new(domain: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            node: node.into(),
            labels: BTreeSet::new(),
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Context of a node within its declared domain
    pub fn for_node(node: &Node) -> Self {
        Self {
            domain: node.domain.clone(),
            node: node.name.clone(),
            labels: node.labels.clone(),
        }
    }
}

impl Guard {
    /// Check whether every non-wildcard dimension admits the context
    ///
    /// Labels match when the guard's label set intersects the context's.
    pub fn matches(&self, context: &ResolutionContext) -> bool {
        (self.domain.is_empty() || self.domain.contains(&context.domain))
            && (self.node.is_empty() || self.node.contains(&context.node))
            && (self.label.is_empty() || !self.label.is_disjoint(&context.labels))
    }
}

/// Two equally specific candidates with different values
#[derive(Debug, Clone, PartialEq)]
pub struct Tie<'a, T> {
    pub chosen: &'a T,
    pub discarded: &'a T,
}

impl<T: fmt::Display> Tie<'_, T> {
    /// Warning text naming where the tie happened and both values
    pub fn message(
        &self,
        domain: &str,
        service: &str,
        category: AttributeCategory,
        attribute: &str,
    ) -> String {
        let key = inspect_key(attribute);
        format!(
            "domain '{domain}', service '{service}': '{category}': choosing {{ {key}: {} }} \
             over {{ {key}: {} }} even though they both match with the same quality",
            self.chosen, self.discarded
        )
    }
}

/// Outcome of resolving one attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a, T> {
    pub value: &'a T,
    /// Differing values that lost only on declaration order
    pub ties: Vec<Tie<'a, T>>,
}

/// Resolve one attribute's candidates for a context
///
/// Fails with [`Error::NoMatchingValue`] when no candidate matches.
pub fn resolve<'a, T: PartialEq>(
    attribute: &str,
    candidates: &'a [GuardedValue<T>],
    context: &ResolutionContext,
) -> Result<Resolution<'a, T>> {
    let matching: Vec<&GuardedValue<T>> = candidates
        .iter()
        .filter(|candidate| candidate.guard.matches(context))
        .collect();

    let best = matching
        .iter()
        .map(|candidate| candidate.guard.specificity())
        .max()
        .ok_or_else(|| Error::NoMatchingValue {
            attribute: attribute.to_string(),
        })?;

    let mut top = matching
        .into_iter()
        .filter(|candidate| candidate.guard.specificity() == best);

    // `best` came from a matching candidate, so `top` is never empty
    let Some(winner) = top.next() else {
        return Err(Error::NoMatchingValue {
            attribute: attribute.to_string(),
        });
    };

    let ties = top
        .filter(|candidate| candidate.value != winner.value)
        .map(|candidate| Tie {
            chosen: &winner.value,
            discarded: &candidate.value,
        })
        .collect();

    Ok(Resolution {
        value: &winner.value,
        ties,
    })
}

/// Render an object key: bare when it is a plain identifier, quoted otherwise
fn inspect_key(key: &str) -> String {
    let mut chars = key.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');

    if identifier {
        key.to_string()
    } else {
        format!("'{}'", key.replace('\'', "\\'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn guard(domain: &[&str], label: &[&str], node: &[&str]) -> Guard {
        let set = |items: &[&str]| items.iter().map(ToString::to_string).collect();
        Guard {
            domain: set(domain),
            label: set(label),
            node: set(node),
        }
    }

    fn candidate(g: Guard, value: &str) -> GuardedValue<Value> {
        GuardedValue::new(g, Value::from(value))
    }

    fn local() -> ResolutionContext {
        ResolutionContext::new("local", "node1").with_labels(["blue"])
    }

    #[test]
    fn test_single_wildcard_always_wins() {
        let candidates = vec![GuardedValue::universal(Value::from("only"))];
        for context in [
            local(),
            ResolutionContext::new("prod", "n9"),
            ResolutionContext::new("", "").with_labels(["x", "y"]),
        ] {
            let resolution = resolve("a", &candidates, &context).unwrap();
            assert_eq!(resolution.value, &Value::from("only"));
            assert!(resolution.ties.is_empty());
        }
    }

    #[test]
    fn test_no_match_fails() {
        let candidates = vec![candidate(guard(&["prod"], &[], &[]), "p")];
        let err = resolve("configFile", &candidates, &local()).unwrap_err();
        assert!(matches!(err, Error::NoMatchingValue { ref attribute } if attribute == "configFile"));
    }

    #[test]
    fn test_node_guard_beats_wildcard() {
        let candidates = vec![
            GuardedValue::universal(Value::from("any")),
            candidate(guard(&[], &[], &["node1"]), "mine"),
        ];
        let resolution = resolve("a", &candidates, &local()).unwrap();
        assert_eq!(resolution.value, &Value::from("mine"));
        assert!(resolution.ties.is_empty());
    }

    #[test]
    fn test_more_dimensions_beat_fewer() {
        let candidates = vec![
            candidate(guard(&["local"], &[], &[]), "domain"),
            candidate(guard(&["local"], &["blue"], &[]), "domain+label"),
            candidate(guard(&[], &[], &["node1"]), "node"),
        ];
        let resolution = resolve("a", &candidates, &local()).unwrap();
        assert_eq!(resolution.value, &Value::from("domain+label"));
    }

    #[test]
    fn test_labels_match_on_intersection() {
        let candidates = vec![candidate(guard(&[], &["red", "blue"], &[]), "labelled")];
        assert!(resolve("a", &candidates, &local()).is_ok());

        let red_only = ResolutionContext::new("local", "node1").with_labels(["green"]);
        assert!(resolve("a", &candidates, &red_only).is_err());
    }

    #[test]
    fn test_equal_tie_is_silent() {
        let candidates = vec![
            candidate(guard(&["local"], &[], &[]), "same"),
            candidate(guard(&[], &[], &["node1"]), "same"),
        ];
        let resolution = resolve("a", &candidates, &local()).unwrap();
        assert_eq!(resolution.value, &Value::from("same"));
        assert!(resolution.ties.is_empty());
    }

    #[test]
    fn test_differing_tie_picks_first_declared() {
        let candidates = vec![
            candidate(guard(&["local"], &[], &[]), "default"),
            candidate(guard(&["local"], &[], &[]), "other"),
        ];
        let resolution = resolve("configFile", &candidates, &local()).unwrap();
        assert_eq!(resolution.value, &Value::from("default"));
        assert_eq!(resolution.ties.len(), 1);

        let message = resolution.ties[0].message(
            "local",
            "CollectorService",
            AttributeCategory::Settings,
            "configFile",
        );
        assert_eq!(
            message,
            "domain 'local', service 'CollectorService': 'settings': choosing \
             { configFile: 'default' } over { configFile: 'other' } even though \
             they both match with the same quality"
        );
    }

    #[test]
    fn test_less_specific_candidates_never_tie() {
        let candidates = vec![
            GuardedValue::universal(Value::from("a")),
            GuardedValue::universal(Value::from("b")),
            candidate(guard(&["local"], &[], &[]), "winner"),
        ];
        let resolution = resolve("a", &candidates, &local()).unwrap();
        assert_eq!(resolution.value, &Value::from("winner"));
        assert!(resolution.ties.is_empty());
    }

    #[test]
    fn test_inspect_key_quotes_non_identifiers() {
        assert_eq!(inspect_key("configFile"), "configFile");
        assert_eq!(inspect_key("log.level"), "'log.level'");
        assert_eq!(inspect_key("1st"), "'1st'");
    }
}
