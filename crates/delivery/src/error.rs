//! Error types for delivery operations.
//!
//! Errors are categorized so callers can tell a configuration problem
//! ("nothing was executed") from a delivery problem ("something was
//! executed and part of it failed").

use crate::planner::TaskKind;
use std::fmt;
use thiserror::Error;

/// Categories of delivery errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Structural or validation problem in the configuration
    Configuration,
    /// No guarded candidate applies to a context
    Resolution,
    /// One or more remote operations failed
    Delivery,
    /// Credentials could not be obtained for a node
    Credentials,
    /// A node could not be connected to
    Connection,
}

impl ErrorKind {
    /// Get a user-friendly description of this error kind.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration errors detected, skipping execution",
            Self::Resolution => "no value matches the context",
            Self::Delivery => "some delivery actions were unsuccessful",
            Self::Credentials => "credentials unavailable",
            Self::Connection => "node unreachable",
        }
    }
}

/// Structured failure reported by the remote operation interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error_type}: {message}")]
pub struct RemoteError {
    /// Short category reported by the remote side (e.g. `HTTP 404`)
    pub error_type: String,
    /// Detailed message
    pub message: String,
}

impl RemoteError {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
        }
    }
}

/// A remote failure attributed to the task that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub node: String,
    pub service: String,
    pub task: TaskKind,
    pub error: RemoteError,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node '{}', service '{}': {} failed: {}",
            self.node, self.service, self.task, self.error
        )
    }
}

impl std::error::Error for TaskFailure {}

/// Errors that can occur while preparing or executing a delivery.
#[derive(Debug, Error)]
pub enum Error {
    /// Service type is not one of the supported runtime kinds
    #[error("Service type '{kind}' is unknown. Use one of 'xUML','node','java'")]
    UnknownServiceType { kind: String },

    /// Service declares no type
    #[error("Missing 'type' field.")]
    MissingServiceType,

    /// Service declares no repository
    #[error("Missing 'repository' field.")]
    MissingRepository,

    /// Service declares no solution
    #[error("Missing 'solution' field.")]
    MissingSolution,

    /// Deployment option name is not recognized
    #[error("Unknown option \"{option}\".")]
    UnknownOption { option: String },

    /// Deployment option has a value of the wrong type
    #[error("deployment option '{option}' must be {expected}")]
    InvalidOptionValue {
        option: String,
        expected: &'static str,
    },

    /// No guarded candidate matches the context
    #[error("no value of '{attribute}' matches the context")]
    NoMatchingValue { attribute: String },

    /// Error-level diagnostics were raised while preparing the run
    #[error("configuration errors detected, skipping execution")]
    Configuration { errors: usize },

    /// Credentials for a node could not be obtained
    #[error("credentials for node '{node}' unavailable: {message}")]
    Credentials { node: String, message: String },

    /// A node could not be connected to
    #[error("cannot connect to node '{node}': {source}")]
    Connection {
        node: String,
        #[source]
        source: RemoteError,
    },

    /// A task failed with break-on-error set; the node's batch was aborted
    #[error("delivery to node '{node}' aborted: {failure}")]
    NodeAborted {
        node: String,
        #[source]
        failure: TaskFailure,
    },

    /// Some delivery actions were unsuccessful
    #[error("some delivery actions were unsuccessful")]
    Delivery { failed: usize },

    /// Worker threads for a node could not be started
    #[error("failed to create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownServiceType { .. }
            | Error::MissingServiceType
            | Error::MissingRepository
            | Error::MissingSolution
            | Error::UnknownOption { .. }
            | Error::InvalidOptionValue { .. }
            | Error::Configuration { .. } => ErrorKind::Configuration,
            Error::NoMatchingValue { .. } => ErrorKind::Resolution,
            Error::Credentials { .. } => ErrorKind::Credentials,
            Error::Connection { .. } => ErrorKind::Connection,
            Error::NodeAborted { .. } | Error::Delivery { .. } | Error::ThreadPool(_) => {
                ErrorKind::Delivery
            }
        }
    }

    /// Whether nothing was executed because of this error.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

/// Result type for delivery operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(
            Error::Configuration { errors: 2 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(Error::Delivery { failed: 1 }.kind(), ErrorKind::Delivery);
        assert!(Error::MissingRepository.is_configuration());
        assert!(!Error::Delivery { failed: 1 }.is_configuration());
    }

    #[test]
    fn test_kind_descriptions_match_messages() {
        assert_eq!(
            Error::Configuration { errors: 1 }.to_string(),
            ErrorKind::Configuration.description()
        );
        assert_eq!(
            Error::Delivery { failed: 3 }.to_string(),
            ErrorKind::Delivery.description()
        );
    }

    #[test]
    fn test_task_failure_display() {
        let failure = TaskFailure {
            node: "bridge1".into(),
            service: "CollectorService".into(),
            task: TaskKind::Settings,
            error: RemoteError::new("HTTP 500", "internal error"),
        };
        assert_eq!(
            failure.to_string(),
            "node 'bridge1', service 'CollectorService': settings failed: HTTP 500: internal error"
        );
    }
}
