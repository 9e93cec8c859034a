//! Tree filter - narrows a delivery tree to what one run should touch
//!
//! The domain is mandatory. Every other filter is optional and an empty
//! set places no constraint. Supplied filters are ANDed.

use crate::diagnostics::Diagnostics;
use crate::model::Configuration;
use crate::tree::{DeliveryTree, DomainBranch, NodeBranch, SolutionBranch};
use std::collections::BTreeSet;

/// Selection of a delivery run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryFilter {
    pub domain: String,
    pub nodes: BTreeSet<String>,
    /// Matched against node labels
    pub labels: BTreeSet<String>,
    pub solutions: BTreeSet<String>,
    pub services: BTreeSet<String>,
}

impl DeliveryFilter {
    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    fn admits_node(&self, node: &NodeBranch) -> bool {
        (self.nodes.is_empty() || self.nodes.contains(&node.name))
            && (self.labels.is_empty() || !self.labels.is_disjoint(&node.labels))
    }

    fn admits_solution(&self, name: &str) -> bool {
        self.solutions.is_empty() || self.solutions.contains(name)
    }

    fn admits_service(&self, name: &str) -> bool {
        self.services.is_empty() || self.services.contains(name)
    }
}

/// Reduce a tree to the part selected by `filter`
///
/// The input tree is left untouched; service leaves are shared with it.
pub fn filter(
    tree: &DeliveryTree,
    filter: &DeliveryFilter,
    configuration: &Configuration,
    diagnostics: &Diagnostics,
) -> DeliveryTree {
    warn_unknown(filter, configuration, diagnostics);

    let Some(domain) = tree.domain(&filter.domain) else {
        diagnostics.error(format!("unknown domain '{}'", filter.domain));
        return DeliveryTree::default();
    };

    let nodes = domain
        .nodes
        .iter()
        .filter(|node| filter.admits_node(node))
        .filter_map(|node| filter_node(node, filter))
        .collect();

    DeliveryTree {
        domains: vec![DomainBranch {
            name: domain.name.clone(),
            nodes,
        }],
    }
}

/// `None` when a solution or service filter left the node empty
fn filter_node(node: &NodeBranch, filter: &DeliveryFilter) -> Option<NodeBranch> {
    let solutions: Vec<SolutionBranch> = node
        .solutions
        .iter()
        .filter(|solution| filter.admits_solution(&solution.name))
        .map(|solution| SolutionBranch {
            name: solution.name.clone(),
            services: solution
                .services
                .iter()
                .filter(|service| filter.admits_service(&service.name))
                .cloned()
                .collect(),
        })
        .filter(|solution| filter.services.is_empty() || !solution.services.is_empty())
        .collect();

    let narrowed = !filter.solutions.is_empty() || !filter.services.is_empty();
    if narrowed && solutions.is_empty() {
        log::debug!("node '{}' has nothing left to deliver", node.name);
        return None;
    }

    Some(NodeBranch {
        name: node.name.clone(),
        labels: node.labels.clone(),
        solutions,
    })
}

fn warn_unknown(filter: &DeliveryFilter, configuration: &Configuration, diagnostics: &Diagnostics) {
    for name in &filter.nodes {
        if configuration.node(name).is_none() {
            diagnostics.warn(format!("node filter '{name}' matches no configured node"));
        }
    }
    for label in &filter.labels {
        if !configuration.has_label(label) {
            diagnostics.warn(format!("label filter '{label}' matches no configured node"));
        }
    }
    for name in &filter.solutions {
        if configuration.solution(name).is_none() {
            diagnostics.warn(format!(
                "solution filter '{name}' matches no configured solution"
            ));
        }
    }
    for name in &filter.services {
        if configuration.service(name).is_none() {
            diagnostics.warn(format!("service filter '{name}' matches no configured service"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Level;
    use crate::tree::build;
    use crate::tree::tests::{sample_configuration, service, solution};
    use std::sync::Arc;

    fn built() -> (Configuration, DeliveryTree) {
        let mut configuration = sample_configuration();
        configuration.solutions.push(solution("billing"));
        configuration.services.push(service("InvoiceService", "billing"));
        let tree = build(&configuration, &Diagnostics::new());
        (configuration, tree)
    }

    fn names(set: &[&str]) -> BTreeSet<String> {
        set.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_domain_selects_one_subtree() {
        let (configuration, tree) = built();
        let diagnostics = Diagnostics::new();
        let filtered = filter(
            &tree,
            &DeliveryFilter::for_domain("production"),
            &configuration,
            &diagnostics,
        );

        assert_eq!(filtered.domains.len(), 1);
        let nodes: Vec<_> = filtered.nodes().map(|n| n.name.as_str()).collect();
        assert_eq!(nodes, ["prod1", "prod2"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_domain_is_an_error() {
        let (configuration, tree) = built();
        let diagnostics = Diagnostics::new();
        let filtered = filter(
            &tree,
            &DeliveryFilter::for_domain("staging"),
            &configuration,
            &diagnostics,
        );
        assert!(filtered.is_empty());
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_filters_are_anded() {
        let (configuration, tree) = built();
        let selection = DeliveryFilter {
            nodes: names(&["prod1", "prod2"]),
            labels: names(&["internal"]),
            ..DeliveryFilter::for_domain("production")
        };
        let filtered = filter(&tree, &selection, &configuration, &Diagnostics::new());
        let nodes: Vec<_> = filtered.nodes().map(|n| n.name.as_str()).collect();
        assert_eq!(nodes, ["prod2"]);
    }

    #[test]
    fn test_service_filter_prunes_empty_solutions() {
        let (configuration, tree) = built();
        let selection = DeliveryFilter {
            services: names(&["InvoiceService"]),
            ..DeliveryFilter::for_domain("local")
        };
        let filtered = filter(&tree, &selection, &configuration, &Diagnostics::new());
        let node = filtered.nodes().next().unwrap();
        let solutions: Vec<_> = node.solutions.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(solutions, ["billing"]);
    }

    #[test]
    fn test_unknown_filter_values_warn() {
        let (configuration, tree) = built();
        let diagnostics = Diagnostics::new();
        let selection = DeliveryFilter {
            labels: names(&["gpu"]),
            services: names(&["Ghost"]),
            ..DeliveryFilter::for_domain("local")
        };
        let filtered = filter(&tree, &selection, &configuration, &diagnostics);

        assert!(filtered.nodes().next().is_none());
        let entries = diagnostics.into_vec();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|d| d.level == Level::Warn));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let (configuration, tree) = built();
        let selections = [
            DeliveryFilter::for_domain("production"),
            DeliveryFilter {
                labels: names(&["dmz"]),
                solutions: names(&["monitoring"]),
                ..DeliveryFilter::for_domain("production")
            },
            DeliveryFilter {
                services: names(&["ReportService"]),
                ..DeliveryFilter::for_domain("local")
            },
        ];

        for selection in selections {
            let diagnostics = Diagnostics::new();
            let once = filter(&tree, &selection, &configuration, &diagnostics);
            let twice = filter(&once, &selection, &configuration, &diagnostics);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_leaves_are_shared_with_input() {
        let (configuration, tree) = built();
        let filtered = filter(
            &tree,
            &DeliveryFilter::for_domain("local"),
            &configuration,
            &Diagnostics::new(),
        );
        let original = tree.domain("local").unwrap().nodes[0].services().next().unwrap();
        let shared = filtered.nodes().next().unwrap().services().next().unwrap();
        assert!(Arc::ptr_eq(original, shared));
    }
}
