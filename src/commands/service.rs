//! Single service commands - start/stop/kill/remove/deploy/settings/preferences

use anyhow::{Context as _, Result, anyhow};
use delivery::{
    AttributeMap, Connection, DeploymentOptions, RemoteOperations, RemoteResult,
    ServiceOperation, Value,
};

use crate::bridge::HttpBridge;
use crate::cli::{AttributeArgs, ConnectionArgs, DeployArgs, ServiceArgs};
use crate::credentials::{self, PromptCredentials};
use crate::ui;

/// Which attribute map a `settings`/`preferences` command works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeTarget {
    Settings,
    Preferences,
}

impl AttributeTarget {
    fn operation(self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::Preferences => "preferences",
        }
    }

    /// Keyword introducing one assignment on the command line
    fn keyword(self) -> &'static str {
        match self {
            Self::Settings => "set",
            Self::Preferences => "pref",
        }
    }
}

/// start, stop, kill or remove
pub fn operation(args: ServiceArgs, operation: ServiceOperation) -> Result<()> {
    let bridge = open(&args.connection)?;
    let outcome = operation.apply(&bridge, &args.service, args.kind.kind());
    report(operation.as_str(), &args.service, outcome.map(|()| None))
}

pub fn deploy(args: DeployArgs) -> Result<()> {
    let options = match args.options.as_deref() {
        Some(list) => DeploymentOptions::parse_list(list)?,
        None => DeploymentOptions::default(),
    };
    let path = std::path::absolute(&args.path)
        .with_context(|| format!("Invalid repository path {}", args.path.display()))?;

    let bridge = open(&args.connection)?;
    let outcome = bridge.deploy_service(&path, &options);
    report("deploy", &path.display().to_string(), outcome.map(|()| None))
}

/// Set the given values, or print the current ones when none are given
pub fn attributes(args: AttributeArgs, target: AttributeTarget) -> Result<()> {
    let values = parse_assignments(
        &args.assignments,
        target.keyword(),
        target == AttributeTarget::Preferences,
    );

    let bridge = open(&args.connection)?;
    let kind = args.kind.kind();
    let outcome = match (target, values) {
        (AttributeTarget::Settings, Some(values)) => bridge
            .set_service_settings(&args.service, kind, &values)
            .map(|()| None),
        (AttributeTarget::Preferences, Some(values)) => bridge
            .set_service_preferences(&args.service, kind, &values)
            .map(|()| None),
        (AttributeTarget::Settings, None) => bridge.service_settings(&args.service, kind).map(Some),
        (AttributeTarget::Preferences, None) => {
            bridge.service_preferences(&args.service, kind).map(Some)
        }
    };
    report(target.operation(), &args.service, outcome)
}

fn open(args: &ConnectionArgs) -> Result<HttpBridge> {
    let connection = Connection {
        node: args.node_name().to_string(),
        host: args.host.clone(),
        port: args.port,
        user: args.user.clone(),
        password: args.password.clone(),
    };
    let connection = credentials::complete(connection, &PromptCredentials::new())?;
    let bridge = HttpBridge::new(&connection);
    log::debug!("using {}", bridge.base());
    Ok(bridge)
}

fn report(operation: &str, target: &str, outcome: RemoteResult<Option<AttributeMap>>) -> Result<()> {
    match outcome {
        Ok(values) => {
            println!("{}", ui::status_line(operation, target, true));
            if let Some(values) = values {
                ui::attributes(&values);
            }
            Ok(())
        }
        Err(error) => {
            println!("{}", ui::status_line(operation, target, false));
            ui::remote_failure(&error.error_type, &error.message);
            Err(anyhow!("{operation} {target} failed"))
        }
    }
}

/// Collect `<keyword> NAME VALUE` triplets
///
/// Tokens that do not start a complete triplet are skipped. Returns
/// `None` when no triplet was found. With `typed`, `true` and `false`
/// become booleans.
pub fn parse_assignments(tokens: &[String], keyword: &str, typed: bool) -> Option<AttributeMap> {
    let mut values = AttributeMap::new();
    let mut rest = tokens;

    while let Some((first, tail)) = rest.split_first() {
        if first == keyword
            && let [name, value, remaining @ ..] = tail
        {
            let value = match value.as_str() {
                "true" if typed => Value::Bool(true),
                "false" if typed => Value::Bool(false),
                other => Value::from(other),
            };
            values.insert(name.clone(), value);
            rest = remaining;
        } else {
            log::warn!("ignoring argument '{first}'");
            rest = tail;
        }
    }

    if values.is_empty() { None } else { Some(values) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_no_assignments_means_read() {
        assert_eq!(parse_assignments(&[], "set", false), None);
        assert_eq!(parse_assignments(&tokens(&["set", "a"]), "set", false), None);
    }

    #[test]
    fn test_settings_stay_strings() {
        let values =
            parse_assignments(&tokens(&["set", "debug", "true", "set", "x", "1"]), "set", false)
                .unwrap();
        assert_eq!(values["debug"], Value::from("true"));
        assert_eq!(values["x"], Value::from("1"));
    }

    #[test]
    fn test_preferences_convert_booleans() {
        let values = parse_assignments(
            &tokens(&["pref", "automaticStartup", "false", "pref", "level", "Info"]),
            "pref",
            true,
        )
        .unwrap();
        assert_eq!(values["automaticStartup"], Value::Bool(false));
        assert_eq!(values["level"], Value::from("Info"));
    }

    #[test]
    fn test_garbage_is_skipped() {
        let values = parse_assignments(
            &tokens(&["junk", "set", "configFile", "other", "trailing"]),
            "set",
            false,
        )
        .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values["configFile"], Value::from("other"));
    }
}
