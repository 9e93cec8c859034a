//! Delivery tree - domain → node → solution → service with resolved attributes
//!
//! The builder walks every node of every domain, resolves each service's
//! guarded attributes in the node's context and records ties and
//! structural problems in the diagnostics sink. It never stops at the
//! first problem so one pass surfaces as many as possible.

use crate::diagnostics::Diagnostics;
use crate::model::{AttributeCategory, Configuration, Node, Service};
use crate::resolver::{ResolutionContext, resolve};
use crate::types::{AttributeMap, DeploymentOptions, ServiceKind};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Resolved delivery structure for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryTree {
    pub domains: Vec<DomainBranch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomainBranch {
    pub name: String,
    pub nodes: Vec<NodeBranch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeBranch {
    pub name: String,
    pub labels: BTreeSet<String>,
    pub solutions: Vec<SolutionBranch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolutionBranch {
    pub name: String,
    /// Leaves are shared between a tree and the trees filtered from it
    pub services: Vec<Arc<ResolvedService>>,
}

/// A service with every attribute resolved for one node
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedService {
    pub name: String,
    pub kind: ServiceKind,
    pub repository: PathBuf,
    pub settings: AttributeMap,
    pub preferences: AttributeMap,
    pub deployment_options: DeploymentOptions,
}

impl DeliveryTree {
    pub fn domain(&self, name: &str) -> Option<&DomainBranch> {
        self.domains.iter().find(|d| d.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// All node branches in traversal order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeBranch> {
        self.domains.iter().flat_map(|d| d.nodes.iter())
    }
}

impl NodeBranch {
    /// All services on this node in traversal order
    pub fn services(&self) -> impl Iterator<Item = &Arc<ResolvedService>> {
        self.solutions.iter().flat_map(|s| s.services.iter())
    }
}

/// Build the delivery tree for a configuration
pub fn build(configuration: &Configuration, diagnostics: &Diagnostics) -> DeliveryTree {
    report_duplicates(configuration, diagnostics);

    for node in &configuration.nodes {
        if configuration.domain(&node.domain).is_none() {
            diagnostics.error(format!(
                "node '{}' declares unknown domain '{}'",
                node.name, node.domain
            ));
        }
    }

    for service in &configuration.services {
        if configuration.solution(&service.solution).is_none() {
            diagnostics.error(format!(
                "service '{}' references unknown solution '{}'",
                service.name, service.solution
            ));
        }
    }

    let mut sink = ResolutionSink {
        diagnostics,
        reported: HashSet::new(),
    };
    let mut domains = Vec::with_capacity(configuration.domains.len());
    for domain in &configuration.domains {
        let mut nodes = Vec::new();
        for node in configuration.nodes.iter().filter(|n| n.domain == domain.name) {
            nodes.push(build_node(configuration, node, &mut sink));
        }
        domains.push(DomainBranch {
            name: domain.name.clone(),
            nodes,
        });
    }

    DeliveryTree { domains }
}

/// Diagnostics of attribute resolution
///
/// Nodes of one domain usually resolve the same candidates, so a tie is
/// reported the first time it is seen in a domain only.
struct ResolutionSink<'a> {
    diagnostics: &'a Diagnostics,
    reported: HashSet<String>,
}

impl ResolutionSink<'_> {
    fn tie(&mut self, message: String) {
        if self.reported.insert(message.clone()) {
            self.diagnostics.warn(message);
        }
    }

    fn error(&self, message: String) {
        self.diagnostics.error(message);
    }
}

fn build_node(
    configuration: &Configuration,
    node: &Node,
    sink: &mut ResolutionSink<'_>,
) -> NodeBranch {
    let context = ResolutionContext::for_node(node);

    let mut solutions = Vec::with_capacity(configuration.solutions.len());
    for solution in &configuration.solutions {
        let services = configuration
            .services_of(&solution.name)
            .filter_map(|service| resolve_service(service, &context, sink))
            .map(Arc::new)
            .collect();
        solutions.push(SolutionBranch {
            name: solution.name.clone(),
            services,
        });
    }

    NodeBranch {
        name: node.name.clone(),
        labels: node.labels.clone(),
        solutions,
    }
}

/// Resolve a service for one node, `None` when its deployment options are invalid
fn resolve_service(
    service: &Service,
    context: &ResolutionContext,
    sink: &mut ResolutionSink<'_>,
) -> Option<ResolvedService> {
    let settings = resolve_map(service, AttributeCategory::Settings, context, sink);
    let preferences = resolve_map(service, AttributeCategory::Preferences, context, sink);
    let options = resolve_map(service, AttributeCategory::DeploymentOptions, context, sink);

    let deployment_options = match DeploymentOptions::from_attributes(&options) {
        Ok(options) => options,
        Err(e) => {
            sink.error(format!(
                "domain '{}', node '{}', service '{}': 'deploymentOptions': {}",
                context.domain, context.node, service.name, e
            ));
            return None;
        }
    };

    Some(ResolvedService {
        name: service.name.clone(),
        kind: service.kind,
        repository: service.repository.clone(),
        settings,
        preferences,
        deployment_options,
    })
}

fn resolve_map(
    service: &Service,
    category: AttributeCategory,
    context: &ResolutionContext,
    sink: &mut ResolutionSink<'_>,
) -> AttributeMap {
    let mut resolved = AttributeMap::new();

    for (attribute, candidates) in service.attributes(category) {
        match resolve(attribute, candidates, context) {
            Ok(resolution) => {
                for tie in &resolution.ties {
                    sink.tie(tie.message(&context.domain, &service.name, category, attribute));
                }
                resolved.insert(attribute.clone(), resolution.value.clone());
            }
            Err(e) => {
                log::debug!(
                    "node '{}', service '{}', {category}: {e}; attribute omitted",
                    context.node,
                    service.name
                );
            }
        }
    }

    resolved
}

fn report_duplicates(configuration: &Configuration, diagnostics: &Diagnostics) {
    let groups: [(&str, Vec<&str>); 4] = [
        (
            "domain",
            configuration.domains.iter().map(|d| d.name.as_str()).collect(),
        ),
        (
            "node",
            configuration.nodes.iter().map(|n| n.name.as_str()).collect(),
        ),
        (
            "solution",
            configuration.solutions.iter().map(|s| s.name.as_str()).collect(),
        ),
        (
            "service",
            configuration.services.iter().map(|s| s.name.as_str()).collect(),
        ),
    ];

    for (what, names) in groups {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for name in names {
            if !seen.insert(name) && reported.insert(name) {
                diagnostics.error(format!("{what} '{name}' is declared more than once"));
            }
        }
    }
}
