//! Configuration model - domains, nodes, solutions and services
//!
//! Every service attribute is held as an ordered list of guarded
//! candidates. Raw configuration forms (a bare scalar, a single guard
//! object, or a list mixing both) are normalized into that shape by
//! [`CandidatesLike::normalize`], preserving declaration order.

use crate::error::{Error, Result};
use crate::types::{ServiceKind, Value};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default Bridge port
pub const DEFAULT_PORT: u16 = 8080;

// ============================================================================
// Guarded values
// ============================================================================

/// Applicability constraints of a candidate value
///
/// An empty set is a wildcard for its dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Guard {
    pub domain: BTreeSet<String>,
    pub label: BTreeSet<String>,
    pub node: BTreeSet<String>,
}

impl Guard {
    /// Guard that matches every context
    pub fn any() -> Self {
        Self::default()
    }

    /// Number of non-wildcard dimensions
    pub fn specificity(&self) -> usize {
        [&self.domain, &self.label, &self.node]
            .into_iter()
            .filter(|set| !set.is_empty())
            .count()
    }
}

/// A value tagged with the contexts it applies to
#[derive(Debug, Clone, PartialEq)]
pub struct GuardedValue<T> {
    pub guard: Guard,
    pub value: T,
}

impl<T> GuardedValue<T> {
    /// Value that applies everywhere
    pub fn universal(value: T) -> Self {
        Self {
            guard: Guard::any(),
            value,
        }
    }

    pub fn new(guard: Guard, value: T) -> Self {
        Self { guard, value }
    }
}

/// Candidates of one attribute, in declaration order
pub type Candidates<T> = Vec<GuardedValue<T>>;

/// Attribute name → ordered candidates
pub type GuardedAttributes = BTreeMap<String, Candidates<Value>>;

/// Which guarded map of a service an attribute belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeCategory {
    Settings,
    Preferences,
    DeploymentOptions,
}

impl AttributeCategory {
    pub const ALL: [AttributeCategory; 3] =
        [Self::Settings, Self::Preferences, Self::DeploymentOptions];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::Preferences => "preferences",
            Self::DeploymentOptions => "deploymentOptions",
        }
    }
}

impl fmt::Display for AttributeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A named group of nodes targeted together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    pub name: String,
    pub description: Option<String>,
}

/// A Bridge instance services are delivered to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Domain this node is assigned to
    pub domain: String,
    pub labels: BTreeSet<String>,
}

impl Node {
    pub fn has_credentials(&self) -> bool {
        self.user.is_some() && self.password.is_some()
    }
}

/// A set of services delivered together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub name: String,
    pub description: Option<String>,
}

/// A deployable service with its guarded attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub name: String,
    pub kind: ServiceKind,
    /// Absolute path of the packaged repository
    pub repository: PathBuf,
    /// Solution this service belongs to
    pub solution: String,
    pub settings: GuardedAttributes,
    pub preferences: GuardedAttributes,
    pub deployment_options: GuardedAttributes,
}

impl Service {
    pub fn attributes(&self, category: AttributeCategory) -> &GuardedAttributes {
        match category {
            AttributeCategory::Settings => &self.settings,
            AttributeCategory::Preferences => &self.preferences,
            AttributeCategory::DeploymentOptions => &self.deployment_options,
        }
    }
}

/// Everything read from a delivery project
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    pub domains: Vec<Domain>,
    pub nodes: Vec<Node>,
    pub solutions: Vec<Solution>,
    pub services: Vec<Service>,
}

impl Configuration {
    pub fn domain(&self, name: &str) -> Option<&Domain> {
        self.domains.iter().find(|d| d.name == name)
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn solution(&self, name: &str) -> Option<&Solution> {
        self.solutions.iter().find(|s| s.name == name)
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Services of a solution in declaration order
    pub fn services_of<'a>(&'a self, solution: &'a str) -> impl Iterator<Item = &'a Service> {
        self.services.iter().filter(move |s| s.solution == solution)
    }

    /// Whether any node carries the label
    pub fn has_label(&self, label: &str) -> bool {
        self.nodes.iter().any(|n| n.labels.contains(label))
    }
}

// ============================================================================
// Raw configuration forms
// ============================================================================

/// A string or a list of strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn into_set(self) -> BTreeSet<String> {
        match self {
            Self::One(s) => BTreeSet::from([s]),
            Self::Many(list) => list.into_iter().collect(),
        }
    }
}

fn into_set(value: Option<StringOrList>) -> BTreeSet<String> {
    value.map(StringOrList::into_set).unwrap_or_default()
}

/// One candidate as written in configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GuardedValueLike {
    Guarded {
        #[serde(default)]
        domain: Option<StringOrList>,
        #[serde(default)]
        label: Option<StringOrList>,
        #[serde(default)]
        node: Option<StringOrList>,
        #[serde(default)]
        value: Option<Value>,
    },
    Plain(Value),
}

impl GuardedValueLike {
    pub fn normalize(self) -> GuardedValue<Value> {
        match self {
            Self::Plain(value) => GuardedValue::universal(value),
            Self::Guarded {
                domain,
                label,
                node,
                value,
            } => GuardedValue::new(
                Guard {
                    domain: into_set(domain),
                    label: into_set(label),
                    node: into_set(node),
                },
                value.unwrap_or_else(|| Value::Text(String::new())),
            ),
        }
    }
}

/// All candidates of one attribute as written in configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CandidatesLike {
    Many(Vec<GuardedValueLike>),
    One(GuardedValueLike),
}

impl CandidatesLike {
    pub fn normalize(self) -> Candidates<Value> {
        match self {
            Self::One(candidate) => vec![candidate.normalize()],
            Self::Many(candidates) => candidates
                .into_iter()
                .map(GuardedValueLike::normalize)
                .collect(),
        }
    }
}

pub fn normalize_attributes(raw: BTreeMap<String, CandidatesLike>) -> GuardedAttributes {
    raw.into_iter()
        .map(|(key, candidates)| (key, candidates.normalize()))
        .collect()
}

/// Domain file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomainLike {
    #[serde(default)]
    pub description: Option<String>,
}

impl DomainLike {
    pub fn normalize(self, name: &str) -> Domain {
        Domain {
            name: name.to_string(),
            description: self.description,
        }
    }
}

/// Solution file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SolutionLike {
    #[serde(default)]
    pub description: Option<String>,
}

impl SolutionLike {
    pub fn normalize(self, name: &str) -> Solution {
        Solution {
            name: name.to_string(),
            description: self.description,
        }
    }
}

/// Node file contents
#[derive(Debug, Clone, Deserialize)]
pub struct NodeLike {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub domain: String,
    #[serde(default, alias = "label")]
    pub labels: Option<StringOrList>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl NodeLike {
    pub fn normalize(self, name: &str) -> Node {
        Node {
            name: name.to_string(),
            host: self.host,
            port: self.port.unwrap_or(DEFAULT_PORT),
            user: self.user,
            password: self.password,
            domain: self.domain,
            labels: into_set(self.labels),
        }
    }
}

/// Service file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceLike {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub solution: Option<String>,
    #[serde(default)]
    pub settings: BTreeMap<String, CandidatesLike>,
    #[serde(default)]
    pub preferences: BTreeMap<String, CandidatesLike>,
    #[serde(default, alias = "deploymentOptions")]
    pub deployment_options: BTreeMap<String, CandidatesLike>,
}

impl ServiceLike {
    /// Bring a service to canonical form
    ///
    /// `config_root` is the project directory; the repository path is
    /// resolved against its `repositories` folder.
    pub fn normalize(self, name: &str, config_root: &Path) -> Result<Service> {
        let kind = self
            .kind
            .as_deref()
            .ok_or(Error::MissingServiceType)?
            .parse::<ServiceKind>()?;

        let repository = match self.repository.as_deref() {
            Some(repository) if !repository.is_empty() => {
                config_root.join("repositories").join(repository)
            }
            _ => return Err(Error::MissingRepository),
        };

        let solution = self.solution.ok_or(Error::MissingSolution)?;

        Ok(Service {
            name: name.to_string(),
            kind,
            repository,
            solution,
            settings: normalize_attributes(self.settings),
            preferences: normalize_attributes(self.preferences),
            deployment_options: normalize_attributes(self.deployment_options),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_plain_string_normalizes_to_universal_candidate() {
        let raw: GuardedValueLike = serde_json::from_str(r#""gugus""#).unwrap();
        assert_eq!(raw.normalize(), GuardedValue::universal(Value::from("gugus")));
    }

    #[test]
    fn test_guard_fields_accept_string_or_list() {
        let raw: GuardedValueLike =
            serde_json::from_str(r#"{"domain": "local", "label": ["a", "b"], "value": "x"}"#)
                .unwrap();
        let candidate = raw.normalize();
        assert_eq!(candidate.guard.domain, set(&["local"]));
        assert_eq!(candidate.guard.label, set(&["a", "b"]));
        assert!(candidate.guard.node.is_empty());
        assert_eq!(candidate.value, Value::from("x"));
        assert_eq!(candidate.guard.specificity(), 2);
    }

    #[test]
    fn test_unknown_guard_keys_are_ignored() {
        let raw: GuardedValueLike =
            serde_json::from_str(r#"{"node": "n1", "comment": "ignored", "value": true}"#)
                .unwrap();
        let candidate = raw.normalize();
        assert_eq!(candidate.guard.node, set(&["n1"]));
        assert_eq!(candidate.value, Value::Bool(true));
    }

    #[test]
    fn test_candidate_list_keeps_declaration_order() {
        let raw: CandidatesLike = serde_json::from_str(
            r#"[{"value": "default", "domain": ["local"]}, "fallback", {"value": "other", "domain": ["local"]}]"#,
        )
        .unwrap();
        let candidates = raw.normalize();
        let values: Vec<_> = candidates.iter().map(|c| c.value.clone()).collect();
        assert_eq!(
            values,
            vec![
                Value::from("default"),
                Value::from("fallback"),
                Value::from("other")
            ]
        );
        assert_eq!(candidates[1].guard, Guard::any());
    }

    #[test]
    fn test_service_without_settings() {
        let raw: ServiceLike =
            serde_json::from_str(r#"{"type": "xUML", "repository": "Repo.rep", "solution": "s"}"#)
                .unwrap();
        let service = raw.normalize("Svc", Path::new("/home/modeller/cd")).unwrap();
        assert_eq!(service.kind, ServiceKind::Xuml);
        assert_eq!(
            service.repository,
            PathBuf::from("/home/modeller/cd/repositories/Repo.rep")
        );
        assert!(service.settings.is_empty());
        assert!(service.preferences.is_empty());
        assert!(service.deployment_options.is_empty());
    }

    #[test]
    fn test_service_with_wrong_type() {
        let raw: ServiceLike =
            serde_json::from_str(r#"{"type": "gugus", "repository": "Repo.rep"}"#).unwrap();
        let err = raw.normalize("Svc", Path::new("/")).unwrap_err();
        assert!(err.to_string().starts_with("Service type 'gugus' is unknown."));
    }

    #[test]
    fn test_service_without_type_or_repository() {
        let raw: ServiceLike = serde_json::from_str(r#"{"repository": "Repo.rep"}"#).unwrap();
        assert!(matches!(
            raw.normalize("Svc", Path::new("/")),
            Err(Error::MissingServiceType)
        ));

        let raw: ServiceLike = serde_json::from_str(r#"{"type": "xUML"}"#).unwrap();
        let err = raw.normalize("Svc", Path::new("/")).unwrap_err();
        assert_eq!(err.to_string(), "Missing 'repository' field.");
    }

    #[test]
    fn test_service_accepts_camel_case_deployment_options() {
        let raw: ServiceLike = serde_json::from_str(
            r#"{"type": "node", "repository": "r.zip", "solution": "s",
                "deploymentOptions": {"startup": true}}"#,
        )
        .unwrap();
        let service = raw.normalize("Svc", Path::new("/p")).unwrap();
        assert_eq!(
            service.deployment_options["startup"],
            vec![GuardedValue::universal(Value::Bool(true))]
        );
    }

    #[test]
    fn test_node_from_toml() {
        let raw: NodeLike = toml::from_str(
            r#"
            host = "bridge.example.com"
            domain = "production"
            labels = "dmz"
            "#,
        )
        .unwrap();
        let node = raw.normalize("bridge1");
        assert_eq!(node.port, DEFAULT_PORT);
        assert_eq!(node.labels, set(&["dmz"]));
        assert!(!node.has_credentials());
    }
}
