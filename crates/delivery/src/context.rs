//! Connection and provider traits
//!
//! These traits allow the delivery crate to be used without depending
//! on a specific Bridge client, credential prompt or output format.

use crate::error::{Error, RemoteError, Result};
use crate::model::Node;
use crate::planner::{Task, TaskKind};
use crate::remote::RemoteOperations;

/// Login of a Bridge user
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Where and as whom to connect to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub node: String,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Connection {
    pub fn for_node(node: &Node) -> Self {
        Self {
            node: node.name.clone(),
            host: node.host.clone(),
            port: node.port,
            user: node.user.clone(),
            password: node.password.clone(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.user.is_some() && self.password.is_some()
    }

    /// Fill in missing user and password
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.user.get_or_insert(credentials.user);
        self.password.get_or_insert(credentials.password);
        self
    }
}

/// Opens remote operation handles for nodes
pub trait Connector {
    type Remote: RemoteOperations;

    fn connect(&self, connection: &Connection) -> std::result::Result<Self::Remote, RemoteError>;
}

/// Supplies credentials for nodes that have none configured
///
/// Only consulted for real runs; dry runs never ask.
pub trait CredentialProvider {
    fn credentials(&self, connection: &Connection) -> Result<Credentials>;
}

/// Provider for non-interactive runs: missing credentials are an error
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn credentials(&self, connection: &Connection) -> Result<Credentials> {
        Err(Error::Credentials {
            node: connection.node.clone(),
            message: "no user and password configured".to_string(),
        })
    }
}

/// Receives events while task lists are executed
///
/// Task events for one node arrive from several threads, so the
/// reporter must be `Sync`. All methods default to doing nothing.
pub trait DeliveryReporter: Sync {
    /// Called before the first task of a node
    fn on_node_start(&self, _node: &Node, _services: usize) {}

    /// Called for every task of a dry run instead of executing it
    fn on_task_planned(&self, _node: &str, _service: &str, _task: &Task) {}

    /// Called when a task is about to be executed
    fn on_task_start(&self, _node: &str, _service: &str, _task: &Task) {}

    /// Called when a task finished, successfully or not
    fn on_task_complete(
        &self,
        _node: &str,
        _service: &str,
        _task: TaskKind,
        _result: std::result::Result<(), &RemoteError>,
    ) {
    }

    /// Called when the node's batch is over
    fn on_node_complete(&self, _node: &Node, _failed: usize) {}
}

/// No-op reporter
pub struct Silent;

impl DeliveryReporter for Silent {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::node;

    #[test]
    fn test_configured_credentials_are_kept() {
        let mut configured = node("bridge1", "local", &[]);
        configured.user = Some("admin".into());

        let connection = Connection::for_node(&configured).with_credentials(Credentials {
            user: "prompted".into(),
            password: "secret".into(),
        });
        assert_eq!(connection.user.as_deref(), Some("admin"));
        assert_eq!(connection.password.as_deref(), Some("secret"));
        assert!(connection.has_credentials());
    }

    #[test]
    fn test_no_credentials_fails() {
        let connection = Connection::for_node(&node("bridge1", "local", &[]));
        let err = NoCredentials.credentials(&connection).unwrap_err();
        assert!(matches!(err, Error::Credentials { ref node, .. } if node == "bridge1"));
    }

    #[test]
    fn test_debug_hides_password() {
        let credentials = Credentials {
            user: "admin".into(),
            password: "secret".into(),
        };
        assert!(!format!("{credentials:?}").contains("secret"));
    }
}
