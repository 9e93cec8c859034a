//! HTTP client for the Bridge REST API
//!
//! All calls are blocking and go through one [`ureq::Agent`] per node.
//! Failures are mapped to [`RemoteError`] so the delivery engine can
//! report them per task.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use delivery::{
    AttributeMap, Connection, Connector, DeploymentOptions, RemoteError, RemoteOperations,
    RemoteResult, ServiceKind, ServiceStatus,
};
use std::fs;
use std::path::Path;

/// Path segment of a service kind in REST URLs
fn kind_segment(kind: ServiceKind) -> &'static str {
    match kind {
        ServiceKind::Xuml => "xUML",
        ServiceKind::Node => "nodejs",
        ServiceKind::Java => "java",
    }
}

fn remote_error(err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::StatusCode(code) => {
            RemoteError::new(format!("HTTP {code}"), status_message(code))
        }
        other => RemoteError::new("Connection", other.to_string()),
    }
}

fn status_message(code: u16) -> &'static str {
    match code {
        400 => "the Bridge rejected the request",
        401 | 403 => "authentication failed or permission denied",
        404 => "no such service",
        409 => "conflict with the current state of the service",
        500..=599 => "the Bridge failed to process the request",
        _ => "unexpected response from the Bridge",
    }
}

/// Bridge REST client bound to one node
pub struct HttpBridge {
    agent: ureq::Agent,
    base: String,
    node: String,
    authorization: Option<String>,
}

impl HttpBridge {
    pub fn new(connection: &Connection) -> Self {
        let authorization = match (&connection.user, &connection.password) {
            (Some(user), Some(password)) => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{user}:{password}"))
            )),
            _ => None,
        };

        Self {
            agent: ureq::Agent::new_with_defaults(),
            base: format!("https://{}:{}/bridge/rest", connection.host, connection.port),
            node: connection.node.clone(),
            authorization,
        }
    }

    /// Base URL of the REST API
    pub fn base(&self) -> &str {
        &self.base
    }

    fn service_url(&self, service: &str, kind: ServiceKind) -> String {
        format!("{}/services/{}/{}", self.base, kind_segment(kind), service)
    }

    fn auth(&self) -> &str {
        self.authorization.as_deref().unwrap_or("")
    }

    fn put_json(&self, url: &str, body: &AttributeMap) -> RemoteResult<()> {
        log::debug!("[{}] PUT {url}", self.node);
        self.agent
            .put(url)
            .header("Authorization", self.auth())
            .header("Accept", "application/json")
            .send_json(body)
            .map_err(remote_error)?;
        Ok(())
    }

    fn put_empty(&self, url: &str) -> RemoteResult<()> {
        log::debug!("[{}] PUT {url}", self.node);
        self.agent
            .put(url)
            .header("Authorization", self.auth())
            .send_empty()
            .map_err(remote_error)?;
        Ok(())
    }

    fn get_json(&self, url: &str) -> RemoteResult<AttributeMap> {
        log::debug!("[{}] GET {url}", self.node);
        self.agent
            .get(url)
            .header("Authorization", self.auth())
            .header("Accept", "application/json")
            .call()
            .map_err(remote_error)?
            .body_mut()
            .read_json()
            .map_err(remote_error)
    }
}

impl RemoteOperations for HttpBridge {
    fn deploy_service(&self, repository: &Path, options: &DeploymentOptions) -> RemoteResult<()> {
        let bytes = fs::read(repository).map_err(|e| {
            RemoteError::new(
                "Repository",
                format!("cannot read {}: {e}", repository.display()),
            )
        })?;

        let url = format!("{}/services", self.base);
        log::debug!(
            "[{}] POST {url} ({} bytes from {})",
            self.node,
            bytes.len(),
            repository.display()
        );

        let mut request = self
            .agent
            .post(&url)
            .header("Authorization", self.auth())
            .header("Content-Type", "application/octet-stream")
            .query("startup", options.startup.to_string())
            .query("overwrite", options.overwrite.to_string())
            .query("overwritePrefs", options.overwrite_settings.to_string())
            .query("npmInstall", options.npm_install.to_string())
            .query("runScripts", options.npm_install_run_scripts.to_string());
        if let Some(instance_name) = &options.instance_name {
            request = request.query("instanceName", instance_name);
        }

        request.send(&bytes[..]).map_err(remote_error)?;
        Ok(())
    }

    fn set_service_settings(
        &self,
        service: &str,
        kind: ServiceKind,
        settings: &AttributeMap,
    ) -> RemoteResult<()> {
        let url = format!("{}/settings", self.service_url(service, kind));
        self.put_json(&url, settings)
    }

    fn set_service_preferences(
        &self,
        service: &str,
        kind: ServiceKind,
        preferences: &AttributeMap,
    ) -> RemoteResult<()> {
        let url = format!("{}/preferences", self.service_url(service, kind));
        self.put_json(&url, preferences)
    }

    fn set_service_status(
        &self,
        status: ServiceStatus,
        service: &str,
        kind: ServiceKind,
    ) -> RemoteResult<()> {
        let url = format!("{}/{}", self.service_url(service, kind), status.as_str());
        self.put_empty(&url)
    }

    fn remove_service(&self, service: &str, kind: ServiceKind) -> RemoteResult<()> {
        let url = self.service_url(service, kind);
        log::debug!("[{}] DELETE {url}", self.node);
        self.agent
            .delete(&url)
            .header("Authorization", self.auth())
            .call()
            .map_err(remote_error)?;
        Ok(())
    }

    fn service_settings(&self, service: &str, kind: ServiceKind) -> RemoteResult<AttributeMap> {
        self.get_json(&format!("{}/settings", self.service_url(service, kind)))
    }

    fn service_preferences(&self, service: &str, kind: ServiceKind) -> RemoteResult<AttributeMap> {
        self.get_json(&format!("{}/preferences", self.service_url(service, kind)))
    }
}

/// Opens an [`HttpBridge`] per node
pub struct HttpConnector;

impl Connector for HttpConnector {
    type Remote = HttpBridge;

    fn connect(&self, connection: &Connection) -> Result<HttpBridge, RemoteError> {
        if !connection.has_credentials() {
            return Err(RemoteError::new(
                "Credentials",
                format!("no user and password for node '{}'", connection.node),
            ));
        }
        Ok(HttpBridge::new(connection))
    }
}
