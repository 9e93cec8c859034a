//! Execution engine - runs task lists against Bridge nodes
//!
//! Nodes are processed one after another in task list order. On a node,
//! every service's task sequence runs on its own worker of a dedicated
//! rayon pool, while tasks inside a sequence run strictly in order.

use crate::context::{Connection, Connector, CredentialProvider, DeliveryReporter};
use crate::error::{Error, Result, TaskFailure};
use crate::planner::{ServiceTasks, Task, TaskList};
use crate::remote::{RemoteOperations, RemoteResult};
use crate::types::{ExecuteOptions, ServiceStatus};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Execute one node's task list
///
/// Returns one slot per service sequence, `None` for a sequence that
/// succeeded. A failing task ends its own sequence only. With
/// `break_on_error` the first failure also stops all sequences of the
/// node before their next task, and the node fails with
/// [`Error::NodeAborted`].
///
/// Credentials are requested before the node is reported as started.
/// Dry runs report every task through `reporter` and never connect.
pub fn execute<C, P, R>(
    task_list: &TaskList,
    connector: &C,
    credentials: &P,
    options: ExecuteOptions,
    reporter: &R,
) -> Result<Vec<Option<TaskFailure>>>
where
    C: Connector + ?Sized,
    P: CredentialProvider + ?Sized,
    R: DeliveryReporter + ?Sized,
{
    let node = &task_list.node;

    if options.dry_run {
        reporter.on_node_start(node, task_list.service_tasks.len());
        for sequence in &task_list.service_tasks {
            for task in &sequence.tasks {
                log::debug!(
                    "[dry-run] node '{}', service '{}': {}",
                    node.name,
                    sequence.service,
                    task.describe()
                );
                reporter.on_task_planned(&node.name, &sequence.service, task);
            }
        }
        reporter.on_node_complete(node, 0);
        return Ok(vec![None; task_list.service_tasks.len()]);
    }

    if task_list.service_tasks.is_empty() {
        log::debug!("node '{}': nothing to deliver", node.name);
        reporter.on_node_start(node, 0);
        reporter.on_node_complete(node, 0);
        return Ok(Vec::new());
    }

    let mut connection = Connection::for_node(node);
    if !connection.has_credentials() {
        log::debug!("node '{}': requesting credentials", node.name);
        let provided = credentials.credentials(&connection)?;
        connection = connection.with_credentials(provided);
    }

    let remote = connector
        .connect(&connection)
        .map_err(|source| Error::Connection {
            node: node.name.clone(),
            source,
        })?;

    reporter.on_node_start(node, task_list.service_tasks.len());

    log::info!(
        "node '{}': running {} tasks for {} services",
        node.name,
        task_list.total_tasks(),
        task_list.service_tasks.len()
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(task_list.service_tasks.len())
        .build()?;

    let abort = AtomicBool::new(false);
    let abort_on_failure = options.break_on_error.then_some(&abort);
    let first_failure: Mutex<Option<TaskFailure>> = Mutex::new(None);

    let results: Vec<Option<TaskFailure>> = pool.install(|| {
        task_list
            .service_tasks
            .par_iter()
            .map(|sequence| {
                let outcome = run_sequence(&node.name, sequence, &remote, abort_on_failure, reporter);
                if let Some(failure) = &outcome
                    && abort_on_failure.is_some()
                {
                    let mut first = lock(&first_failure);
                    if first.is_none() {
                        *first = Some(failure.clone());
                    }
                }
                outcome
            })
            .collect()
    });

    let failed = results.iter().flatten().count();
    reporter.on_node_complete(node, failed);

    let first_failure = first_failure
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(failure) = first_failure {
        return Err(Error::NodeAborted {
            node: node.name.clone(),
            failure,
        });
    }

    Ok(results)
}

/// Run one service's tasks in order until the first failure
///
/// With an `abort` flag, a failure raises it before it is reported and a
/// raised flag stops the sequence before its next task.
fn run_sequence<O, R>(
    node: &str,
    sequence: &ServiceTasks,
    remote: &O,
    abort: Option<&AtomicBool>,
    reporter: &R,
) -> Option<TaskFailure>
where
    O: RemoteOperations + ?Sized,
    R: DeliveryReporter + ?Sized,
{
    for task in &sequence.tasks {
        if abort.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            log::debug!(
                "node '{node}', service '{}': aborted before {}",
                sequence.service,
                task.kind()
            );
            return None;
        }

        reporter.on_task_start(node, &sequence.service, task);
        let result = run_task(remote, sequence, task);
        if result.is_err()
            && let Some(flag) = abort
        {
            flag.store(true, Ordering::SeqCst);
        }
        reporter.on_task_complete(node, &sequence.service, task.kind(), result.as_ref().map(|_| ()));

        if let Err(error) = result {
            log::debug!(
                "node '{node}', service '{}': {} failed: {error}",
                sequence.service,
                task.kind()
            );
            return Some(TaskFailure {
                node: node.to_string(),
                service: sequence.service.clone(),
                task: task.kind(),
                error,
            });
        }
    }
    None
}

fn run_task<O: RemoteOperations + ?Sized>(
    remote: &O,
    sequence: &ServiceTasks,
    task: &Task,
) -> RemoteResult<()> {
    match task {
        Task::Deploy {
            repository,
            options,
        } => remote.deploy_service(repository, options),
        Task::Settings { values } => {
            remote.set_service_settings(&sequence.service, sequence.kind, values)
        }
        Task::Preferences { values } => {
            remote.set_service_preferences(&sequence.service, sequence.kind, values)
        }
        Task::Start => {
            remote.set_service_status(ServiceStatus::Start, &sequence.service, sequence.kind)
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Run driver
// ============================================================================

/// Outcome of one service sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReport {
    pub service: String,
    pub failure: Option<TaskFailure>,
}

/// Outcome of one node
#[derive(Debug)]
pub struct NodeReport {
    pub node: String,
    pub services: Vec<ServiceReport>,
    /// Set when the node failed as a whole (credentials, connection, abort)
    pub error: Option<Error>,
}

impl NodeReport {
    pub fn failed(&self) -> usize {
        self.services.iter().filter(|s| s.failure.is_some()).count()
            + usize::from(self.error.is_some())
    }
}

/// Aggregated outcome of a delivery run
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub nodes: Vec<NodeReport>,
    /// Nodes never attempted because an earlier node was aborted
    pub skipped: Vec<String>,
}

impl DeliveryReport {
    /// Number of failed service sequences and failed nodes
    pub fn failed(&self) -> usize {
        self.nodes.iter().map(NodeReport::failed).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped.is_empty()
    }

    /// Every service-level failure in node order
    pub fn failures(&self) -> impl Iterator<Item = &TaskFailure> {
        self.nodes
            .iter()
            .flat_map(|n| n.services.iter())
            .filter_map(|s| s.failure.as_ref())
    }

    /// `Err(Error::Delivery)` when anything failed
    pub fn into_result(self) -> Result<()> {
        let failed = self.failed();
        if failed > 0 || !self.skipped.is_empty() {
            Err(Error::Delivery { failed })
        } else {
            Ok(())
        }
    }
}

/// Execute task lists node after node
///
/// A node that fails as a whole is recorded and the run moves on, unless
/// `break_on_error` is set, in which case later nodes are skipped.
pub fn deliver<C, P, R>(
    task_lists: &[TaskList],
    connector: &C,
    credentials: &P,
    options: ExecuteOptions,
    reporter: &R,
) -> DeliveryReport
where
    C: Connector + ?Sized,
    P: CredentialProvider + ?Sized,
    R: DeliveryReporter + ?Sized,
{
    let mut report = DeliveryReport::default();

    for (index, task_list) in task_lists.iter().enumerate() {
        let node = task_list.node.name.clone();
        let services = |slots: Vec<Option<TaskFailure>>| -> Vec<ServiceReport> {
            task_list
                .service_tasks
                .iter()
                .zip(slots)
                .map(|(sequence, failure)| ServiceReport {
                    service: sequence.service.clone(),
                    failure,
                })
                .collect()
        };

        match execute(task_list, connector, credentials, options, reporter) {
            Ok(slots) => report.nodes.push(NodeReport {
                node,
                services: services(slots),
                error: None,
            }),
            Err(error) => {
                log::warn!("node '{node}': {error}");
                report.nodes.push(NodeReport {
                    node,
                    services: Vec::new(),
                    error: Some(error),
                });
                if options.break_on_error {
                    report.skipped = task_lists[index + 1..]
                        .iter()
                        .map(|t| t.node.name.clone())
                        .collect();
                    break;
                }
            }
        }
    }

    report
}
