//! # Delivery
//!
//! Continuous-delivery core for Bridge services.
//!
//! This crate resolves context-guarded service attributes for every node
//! of a configuration, narrows the result to what one run should touch,
//! compiles per-node task lists and executes them against the nodes.
//!
//! ## Core Concepts
//!
//! - **GuardedValue**: a candidate value restricted to domains, labels and nodes
//! - **DeliveryTree**: domain → node → solution → service with resolved attributes
//! - **DeliveryFilter**: the domain plus optional node/label/solution/service sets
//! - **TaskList**: per node, one ordered task sequence per service
//! - **Executor**: runs sequences of a node concurrently, nodes one by one
//!
//! ## Example
//!
//! ```ignore
//! use delivery::{
//!     deliver, prepare, Diagnostics, DeliveryFilter, ExecuteOptions, NoCredentials, Silent,
//! };
//!
//! let diagnostics = Diagnostics::new();
//! let task_lists = prepare(&configuration, &DeliveryFilter::for_domain("local"), &diagnostics)?;
//!
//! let report = deliver(
//!     &task_lists,
//!     &connector,
//!     &NoCredentials,
//!     ExecuteOptions { dry_run: true, ..Default::default() },
//!     &Silent,
//! );
//! report.into_result()?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`RemoteOperations`]: service management calls of one node
//! - [`Connector`]: opens [`RemoteOperations`] for a node connection
//! - [`CredentialProvider`]: supplies missing user and password
//! - [`DeliveryReporter`]: receives progress events
//!
//! The crate itself performs no network or file I/O.

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod filter;
pub mod model;
pub mod planner;
pub mod remote;
pub mod resolver;
pub mod tree;
pub mod types;

// Re-export main types at crate root
pub use context::{
    Connection, Connector, CredentialProvider, Credentials, DeliveryReporter, NoCredentials,
    Silent,
};
pub use diagnostics::{Diagnostic, Diagnostics, Level};
pub use error::{Error, ErrorKind, RemoteError, Result, TaskFailure};
pub use executor::{DeliveryReport, NodeReport, ServiceReport, deliver, execute};
pub use filter::{DeliveryFilter, filter};
pub use model::{
    Configuration, DEFAULT_PORT, Domain, Guard, GuardedValue, Node, Service, Solution,
};
pub use planner::{ServiceTasks, Task, TaskKind, TaskList, compile, prepare};
pub use remote::{RemoteOperations, RemoteResult, ServiceOperation};
pub use resolver::{ResolutionContext, resolve};
pub use tree::{DeliveryTree, ResolvedService, build};
pub use types::{
    AttributeMap, DeploymentOptions, ExecuteOptions, ServiceKind, ServiceStatus, Value,
};
