//! Remote operation interface of a Bridge node
//!
//! Implementations perform the actual calls (the binary ships an HTTP
//! client). Every operation is a blocking unit of work that either
//! succeeds or reports a structured [`RemoteError`].

use crate::error::RemoteError;
use crate::types::{AttributeMap, DeploymentOptions, ServiceKind, ServiceStatus};
use std::path::Path;
use std::sync::Arc;

/// Result of a single remote call
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Service management operations of one connected node
///
/// Calls for different services may run concurrently on the same
/// instance, so implementations must be `Send + Sync`.
pub trait RemoteOperations: Send + Sync {
    /// Upload a packaged repository and install the service it contains
    fn deploy_service(&self, repository: &Path, options: &DeploymentOptions) -> RemoteResult<()>;

    fn set_service_settings(
        &self,
        service: &str,
        kind: ServiceKind,
        settings: &AttributeMap,
    ) -> RemoteResult<()>;

    fn set_service_preferences(
        &self,
        service: &str,
        kind: ServiceKind,
        preferences: &AttributeMap,
    ) -> RemoteResult<()>;

    fn set_service_status(
        &self,
        status: ServiceStatus,
        service: &str,
        kind: ServiceKind,
    ) -> RemoteResult<()>;

    fn remove_service(&self, service: &str, kind: ServiceKind) -> RemoteResult<()>;

    /// Current settings of a service
    fn service_settings(&self, service: &str, kind: ServiceKind) -> RemoteResult<AttributeMap> {
        let _ = kind;
        Err(RemoteError::new(
            "Unsupported",
            format!("reading settings of '{service}' is not supported"),
        ))
    }

    /// Current preferences of a service
    fn service_preferences(&self, service: &str, kind: ServiceKind) -> RemoteResult<AttributeMap> {
        let _ = kind;
        Err(RemoteError::new(
            "Unsupported",
            format!("reading preferences of '{service}' is not supported"),
        ))
    }
}

impl<R: RemoteOperations + ?Sized> RemoteOperations for Arc<R> {
    fn deploy_service(&self, repository: &Path, options: &DeploymentOptions) -> RemoteResult<()> {
        (**self).deploy_service(repository, options)
    }

    fn set_service_settings(
        &self,
        service: &str,
        kind: ServiceKind,
        settings: &AttributeMap,
    ) -> RemoteResult<()> {
        (**self).set_service_settings(service, kind, settings)
    }

    fn set_service_preferences(
        &self,
        service: &str,
        kind: ServiceKind,
        preferences: &AttributeMap,
    ) -> RemoteResult<()> {
        (**self).set_service_preferences(service, kind, preferences)
    }

    fn set_service_status(
        &self,
        status: ServiceStatus,
        service: &str,
        kind: ServiceKind,
    ) -> RemoteResult<()> {
        (**self).set_service_status(status, service, kind)
    }

    fn remove_service(&self, service: &str, kind: ServiceKind) -> RemoteResult<()> {
        (**self).remove_service(service, kind)
    }

    fn service_settings(&self, service: &str, kind: ServiceKind) -> RemoteResult<AttributeMap> {
        (**self).service_settings(service, kind)
    }

    fn service_preferences(&self, service: &str, kind: ServiceKind) -> RemoteResult<AttributeMap> {
        (**self).service_preferences(service, kind)
    }
}

/// Operation a service-level command applies to one service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOperation {
    Status(ServiceStatus),
    Remove,
}

impl ServiceOperation {
    /// Apply the operation through `remote`
    ///
    /// Killing a Node.js service is rejected before any call is made.
    pub fn apply<R: RemoteOperations + ?Sized>(
        self,
        remote: &R,
        service: &str,
        kind: ServiceKind,
    ) -> RemoteResult<()> {
        match self {
            Self::Status(ServiceStatus::Kill) if kind == ServiceKind::Node => Err(RemoteError::new(
                "Logic error",
                "Kill operation is not supported for Node.js services",
            )),
            Self::Status(status) => remote.set_service_status(status, service, kind),
            Self::Remove => remote.remove_service(service, kind),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status(status) => status.as_str(),
            Self::Remove => "remove",
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::{Arc, Condvar, Mutex};
    use std::time::Duration;

    /// One-shot latch shared between threads
    #[derive(Debug, Default)]
    pub(crate) struct Gate {
        open: Mutex<bool>,
        opened: Condvar,
    }

    impl Gate {
        pub(crate) fn open(&self) {
            *self.open.lock().unwrap() = true;
            self.opened.notify_all();
        }

        /// Blocks until opened; panics after a few seconds
        pub(crate) fn wait(&self) {
            let guard = self.open.lock().unwrap();
            let (_guard, timeout) = self
                .opened
                .wait_timeout_while(guard, Duration::from_secs(5), |open| !*open)
                .unwrap();
            assert!(!timeout.timed_out(), "gate never opened");
        }
    }

    /// Records every call; fails the ones listed in `failing`
    #[derive(Debug, Default)]
    pub(crate) struct RecordingBridge {
        pub(crate) calls: Mutex<Vec<String>>,
        /// Entries like `"settings CollectorService"`
        pub(crate) failing: BTreeSet<String>,
        /// This call blocks until the gate opens
        held: Option<(String, Arc<Gate>)>,
    }

    impl RecordingBridge {
        pub(crate) fn failing(entries: &[&str]) -> Self {
            Self {
                failing: entries.iter().map(ToString::to_string).collect(),
                ..Self::default()
            }
        }

        pub(crate) fn holding(mut self, call: &str, gate: Arc<Gate>) -> Self {
            self.held = Some((call.to_string(), gate));
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> RemoteResult<()> {
            if let Some((held, gate)) = &self.held
                && *held == call
            {
                gate.wait();
            }
            let fails = self.failing.contains(&call);
            self.calls.lock().unwrap().push(call.clone());
            if fails {
                Err(RemoteError::new("HTTP 500", format!("{call} rejected")))
            } else {
                Ok(())
            }
        }
    }

    impl RemoteOperations for RecordingBridge {
        fn deploy_service(&self, repository: &Path, _: &DeploymentOptions) -> RemoteResult<()> {
            let name = repository
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.record(format!("deploy {name}"))
        }

        fn set_service_settings(&self, service: &str, _: ServiceKind, _: &AttributeMap) -> RemoteResult<()> {
            self.record(format!("settings {service}"))
        }

        fn set_service_preferences(
            &self,
            service: &str,
            _: ServiceKind,
            _: &AttributeMap,
        ) -> RemoteResult<()> {
            self.record(format!("preferences {service}"))
        }

        fn set_service_status(
            &self,
            status: ServiceStatus,
            service: &str,
            _: ServiceKind,
        ) -> RemoteResult<()> {
            self.record(format!("{status} {service}"))
        }

        fn remove_service(&self, service: &str, _: ServiceKind) -> RemoteResult<()> {
            self.record(format!("remove {service}"))
        }
    }

    #[test]
    fn test_kill_node_service_is_rejected() {
        let bridge = RecordingBridge::default();
        let err = ServiceOperation::Status(ServiceStatus::Kill)
            .apply(&bridge, "ReportService", ServiceKind::Node)
            .unwrap_err();
        assert_eq!(
            err.message,
            "Kill operation is not supported for Node.js services"
        );
        assert!(bridge.calls().is_empty());
    }

    #[test]
    fn test_operations_reach_the_bridge() {
        let bridge = RecordingBridge::default();
        ServiceOperation::Status(ServiceStatus::Stop)
            .apply(&bridge, "Svc", ServiceKind::Xuml)
            .unwrap();
        ServiceOperation::Remove
            .apply(&bridge, "Svc", ServiceKind::Java)
            .unwrap();
        assert_eq!(bridge.calls(), ["stop Svc", "remove Svc"]);
    }

    #[test]
    fn test_reading_settings_defaults_to_unsupported() {
        let bridge = RecordingBridge::default();
        let err = bridge.service_settings("Svc", ServiceKind::Xuml).unwrap_err();
        assert_eq!(err.error_type, "Unsupported");
    }
}
