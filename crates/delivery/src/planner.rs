//! Task list compiler - turns a filtered tree into per-node task lists

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::filter::{DeliveryFilter, filter};
use crate::model::{Configuration, Node};
use crate::tree::{DeliveryTree, ResolvedService, build};
use crate::types::{AttributeMap, DeploymentOptions, ServiceKind};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Kind of a remote step, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Deploy,
    Settings,
    Preferences,
    Start,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::Settings => "settings",
            Self::Preferences => "preferences",
            Self::Start => "start",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remote step with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Deploy {
        repository: PathBuf,
        options: DeploymentOptions,
    },
    Settings {
        values: AttributeMap,
    },
    Preferences {
        values: AttributeMap,
    },
    Start,
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Deploy { .. } => TaskKind::Deploy,
            Self::Settings { .. } => TaskKind::Settings,
            Self::Preferences { .. } => TaskKind::Preferences,
            Self::Start => TaskKind::Start,
        }
    }

    /// Human readable one-liner for reports
    pub fn describe(&self) -> String {
        match self {
            Self::Deploy { repository, .. } => format!("deploy {}", repository.display()),
            Self::Settings { values } => format!("settings ({} values)", values.len()),
            Self::Preferences { values } => format!("preferences ({} values)", values.len()),
            Self::Start => "start".to_string(),
        }
    }
}

/// Ordered tasks of one service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceTasks {
    pub service: String,
    pub kind: ServiceKind,
    pub tasks: Vec<Task>,
}

impl ServiceTasks {
    /// Deploy, settings, preferences, start; steps without data are left out
    pub fn for_service(service: &ResolvedService) -> Self {
        let mut tasks = Vec::with_capacity(4);

        if !service.repository.as_os_str().is_empty() {
            tasks.push(Task::Deploy {
                repository: service.repository.clone(),
                options: service.deployment_options.clone(),
            });
        }
        if !service.settings.is_empty() {
            tasks.push(Task::Settings {
                values: service.settings.clone(),
            });
        }
        if !service.preferences.is_empty() {
            tasks.push(Task::Preferences {
                values: service.preferences.clone(),
            });
        }
        tasks.push(Task::Start);

        Self {
            service: service.name.clone(),
            kind: service.kind,
            tasks,
        }
    }

    pub fn kinds(&self) -> Vec<TaskKind> {
        self.tasks.iter().map(Task::kind).collect()
    }
}

/// Everything to run against one node
#[derive(Debug, Clone, PartialEq)]
pub struct TaskList {
    pub node: Node,
    /// One entry per service, run concurrently
    pub service_tasks: Vec<ServiceTasks>,
}

impl TaskList {
    /// Total number of tasks across all services
    pub fn total_tasks(&self) -> usize {
        self.service_tasks.iter().map(|s| s.tasks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.service_tasks.is_empty()
    }
}

/// Compile one task list per node of the tree, in traversal order
///
/// `nodes` supplies the connection details; tree nodes without a
/// matching entry are skipped.
pub fn compile(tree: &DeliveryTree, nodes: &[Node]) -> Vec<TaskList> {
    tree.nodes()
        .filter_map(|branch| {
            let Some(node) = nodes.iter().find(|n| n.name == branch.name) else {
                log::warn!("no connection details for node '{}'", branch.name);
                return None;
            };

            let service_tasks: Vec<ServiceTasks> = branch
                .services()
                .map(|service| ServiceTasks::for_service(service))
                .collect();

            log::debug!(
                "node '{}': {} services, {} tasks",
                node.name,
                service_tasks.len(),
                service_tasks.iter().map(|s| s.tasks.len()).sum::<usize>()
            );

            Some(TaskList {
                node: node.clone(),
                service_tasks,
            })
        })
        .collect()
}

/// Build, filter and compile in one go
///
/// Warnings stay in `diagnostics`. Any error-level diagnostic stops
/// the run here with [`Error::Configuration`] so nothing is executed.
pub fn prepare(
    configuration: &Configuration,
    selection: &DeliveryFilter,
    diagnostics: &Diagnostics,
) -> Result<Vec<TaskList>> {
    let tree = build(configuration, diagnostics);
    let filtered = filter(&tree, selection, configuration, diagnostics);

    let errors = diagnostics.error_count();
    if errors > 0 {
        return Err(Error::Configuration { errors });
    }

    Ok(compile(&filtered, &configuration.nodes))
}
