//! Delivery project loading
//!
//! A project is a directory with one sub-directory per entity kind:
//!
//! ```text
//! <root>/domains/<name>.toml|json
//! <root>/nodes/<name>.toml|json
//! <root>/solutions/<name>.toml|json
//! <root>/services/<name>.toml|json
//! <root>/repositories/...
//! ```
//!
//! The file stem is the entity name and file-name order is declaration
//! order.

use delivery::model::{DomainLike, NodeLike, ServiceLike, SolutionLike};
use delivery::Configuration;
use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Problems reading a project from disk
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("project directory {} does not exist", .0.display())]
    MissingProject(PathBuf),

    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("service {}: {source}", path.display())]
    Service {
        path: PathBuf,
        #[source]
        source: delivery::Error,
    },
}

/// Supported entity file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Some(Self::Toml),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }

    fn parse<T: DeserializeOwned>(self, path: &Path, content: &str) -> Result<T, LoadError> {
        let parsed = match self {
            Self::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| LoadError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }
}

/// Expand `~` and environment variables in a user supplied project path
pub fn expand_root(root: &Path) -> PathBuf {
    let raw = root.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(&raw).as_ref()),
    }
}

/// Load the whole project below `root`, taken as is
pub fn load_project(root: &Path) -> Result<Configuration, LoadError> {
    if !root.is_dir() {
        return Err(LoadError::MissingProject(root.to_path_buf()));
    }
    log::debug!("loading project from {}", root.display());

    let domains = load_entities::<DomainLike>(&root.join("domains"))?
        .into_iter()
        .map(|(name, raw)| raw.normalize(&name))
        .collect();

    let nodes = load_entities::<NodeLike>(&root.join("nodes"))?
        .into_iter()
        .map(|(name, raw)| raw.normalize(&name))
        .collect();

    let solutions = load_entities::<SolutionLike>(&root.join("solutions"))?
        .into_iter()
        .map(|(name, raw)| raw.normalize(&name))
        .collect();

    let services = entity_files(&root.join("services"))?
        .into_iter()
        .map(|(name, path, format)| {
            let raw: ServiceLike = read_entity(&path, format)?;
            raw.normalize(&name, root)
                .map_err(|source| LoadError::Service { path, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let configuration = Configuration {
        domains,
        nodes,
        solutions,
        services,
    };
    log::info!(
        "loaded {} domains, {} nodes, {} solutions, {} services",
        configuration.domains.len(),
        configuration.nodes.len(),
        configuration.solutions.len(),
        configuration.services.len()
    );
    Ok(configuration)
}

fn load_entities<T: DeserializeOwned>(dir: &Path) -> Result<Vec<(String, T)>, LoadError> {
    entity_files(dir)?
        .into_iter()
        .map(|(name, path, format)| Ok((name, read_entity(&path, format)?)))
        .collect()
}

fn read_entity<T: DeserializeOwned>(path: &Path, format: Format) -> Result<T, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    format.parse(path, &content)
}

/// Entity files of a directory sorted by file name; a missing directory is empty
fn entity_files(dir: &Path) -> Result<Vec<(String, PathBuf, Format)>, LoadError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("{} not found, nothing to load", dir.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(LoadError::Read {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| LoadError::Read {
                path: dir.to_path_buf(),
                source,
            })?
            .path();

        let Some(format) = Format::of(&path) else {
            log::trace!("skipping {}", path.display());
            continue;
        };
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            log::warn!("skipping {}: file name is not valid UTF-8", path.display());
            continue;
        };
        if path.is_file() {
            files.push((name.to_string(), path.clone(), format));
        }
    }

    files.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));
    Ok(files)
}
