//! Core types shared by every delivery stage

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Runtime kind of a service hosted on a Bridge node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    /// Model-driven (xUML) service
    #[serde(rename = "xUML")]
    Xuml,
    /// Node.js script-hosted service
    #[serde(rename = "node")]
    Node,
    /// Java managed-runtime service
    #[serde(rename = "java")]
    Java,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 3] = [Self::Xuml, Self::Node, Self::Java];

    /// Name used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xuml => "xUML",
            Self::Node => "node",
            Self::Java => "java",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownServiceType {
                kind: s.to_string(),
            })
    }
}

/// Target status for a service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Start,
    Stop,
    Kill,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Kill => "kill",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar attribute value (setting, preference or deployment option)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Renders the value the way diagnostics quote it: strings in single quotes,
/// everything else bare.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

/// Resolved attribute name → value map
pub type AttributeMap = BTreeMap<String, Value>;

/// Options passed to the Bridge when deploying a repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentOptions {
    /// Launch the service after deployment
    pub startup: bool,
    /// Overwrite an existing service
    pub overwrite: bool,
    /// Overwrite settings and preferences too
    pub overwrite_settings: bool,
    /// Run `npm install` (Node.js services only)
    pub npm_install: bool,
    /// Run `npm install` including scripts (Node.js services only)
    pub npm_install_run_scripts: bool,
    /// Deploy under a different instance name
    pub instance_name: Option<String>,
}

impl DeploymentOptions {
    /// Build options from a resolved `deploymentOptions` attribute map
    pub fn from_attributes(attributes: &AttributeMap) -> Result<Self> {
        let mut options = Self::default();
        for (key, value) in attributes {
            if key == "instance_name" {
                let name = value.as_str().ok_or_else(|| Error::InvalidOptionValue {
                    option: key.clone(),
                    expected: "a string",
                })?;
                options.instance_name = Some(name.to_string());
                continue;
            }

            let enabled = value.as_bool().ok_or_else(|| Error::InvalidOptionValue {
                option: key.clone(),
                expected: "a boolean",
            })?;
            if !options.set_flag(key, enabled) {
                return Err(Error::UnknownOption {
                    option: key.clone(),
                });
            }
        }
        Ok(options)
    }

    /// Parse a comma separated list such as `startup,overwrite,instance_name=foo`
    pub fn parse_list(list: &str) -> Result<Self> {
        let mut options = Self::default();
        for option in list.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            let (name, argument) = match option.split_once('=') {
                Some((name, argument)) => (name, Some(argument)),
                None => (option, None),
            };

            if name == "instance_name" {
                options.instance_name = argument.map(str::to_string);
            } else if !options.set_flag(name, true) {
                return Err(Error::UnknownOption {
                    option: option.to_string(),
                });
            }
        }
        Ok(options)
    }

    fn set_flag(&mut self, name: &str, enabled: bool) -> bool {
        match name {
            "startup" => self.startup = enabled,
            "overwrite" => self.overwrite = enabled,
            "settings" | "overwrite_settings" => self.overwrite_settings = enabled,
            "npm_install" => self.npm_install = enabled,
            "npm_install_run_scripts" => {
                self.npm_install_run_scripts = enabled;
                // running scripts implies installing
                if enabled {
                    self.npm_install = true;
                }
            }
            _ => return false,
        }
        true
    }
}

/// Options for executing task lists
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Report tasks without performing them
    pub dry_run: bool,
    /// Abort the node's whole batch on the first task failure
    pub break_on_error: bool,
}
