//! `pack` - build a repository archive from a service directory

use anyhow::{Context as _, Result, bail};
use serde::Deserialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

use crate::cli::PackArgs;
use crate::ui;

/// Never packed
const EXCLUDED: &[&str] = &[".git", ".DS_Store"];

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    name: Option<String>,
    version: Option<String>,
}

pub fn run(args: PackArgs) -> Result<()> {
    let directory = std::path::absolute(&args.directory)
        .with_context(|| format!("Invalid directory {}", args.directory.display()))?;
    if !directory.is_dir() {
        bail!("{} is not a directory", directory.display());
    }

    let output = match &args.output {
        Some(output) => std::path::absolute(output)
            .with_context(|| format!("Invalid repository path {}", output.display()))?,
        None => default_output(&directory),
    };

    let target = directory.display().to_string();
    match pack(&directory, &output, args.git, args.shrinkwrap) {
        Ok(files) => {
            println!("{}", ui::status_line("pack", &target, true));
            ui::kv("Repository", &output.display().to_string());
            if let Some(files) = files {
                ui::kv("Files", &files.to_string());
            }
            Ok(())
        }
        Err(e) => {
            println!("{}", ui::status_line("pack", &target, false));
            ui::remote_failure("Pack", &format!("{e:#}"));
            Err(e)
        }
    }
}

/// Returns the number of archived files, `None` when `git archive` built it
fn pack(directory: &Path, output: &Path, git: bool, shrinkwrap: bool) -> Result<Option<usize>> {
    if shrinkwrap {
        run_in(directory, "npm", &["shrinkwrap"])?;
    }

    if git {
        let output = output.to_string_lossy();
        run_in(
            directory,
            "git",
            &["archive", "--format=zip", &format!("--output={output}"), "HEAD"],
        )?;
        return Ok(None);
    }

    archive_directory(directory, output).map(Some)
}

fn run_in(directory: &Path, program: &str, args: &[&str]) -> Result<()> {
    log::debug!("{program} {} (in {})", args.join(" "), directory.display());
    let output = Command::new(program)
        .args(args)
        .current_dir(directory)
        .output()
        .with_context(|| format!("Failed to run {program}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{program} {} failed: {}", args.join(" "), stderr.trim());
    }
    Ok(())
}

/// `<name>-<version>.zip` from package.json, else `<directory name>.zip`,
/// next to the directory
pub fn default_output(directory: &Path) -> PathBuf {
    let package = fs::read_to_string(directory.join("package.json"))
        .ok()
        .and_then(|content| serde_json::from_str::<PackageJson>(&content).ok())
        .unwrap_or_default();

    let stem = match (package.name, package.version) {
        (Some(name), Some(version)) => {
            format!("{}-{version}", name.trim_start_matches('@').replace('/', "-"))
        }
        (Some(name), None) => name.trim_start_matches('@').replace('/', "-"),
        _ => directory
            .file_name()
            .map_or_else(|| "repository".to_string(), |n| n.to_string_lossy().into_owned()),
    };

    directory
        .parent()
        .unwrap_or(directory)
        .join(format!("{stem}.zip"))
}

/// Zip every file below `directory`, paths relative to it
pub fn archive_directory(directory: &Path, output: &Path) -> Result<usize> {
    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let walker = WalkDir::new(directory)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| EXCLUDED.contains(&name))
        });

    let mut files = 0;
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", directory.display()))?;
        if !entry.file_type().is_file() || entry.path() == output {
            continue;
        }

        let relative = entry.path().strip_prefix(directory)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        log::trace!("adding {name}");

        zip.start_file(name, options)?;
        let mut source = File::open(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        io::copy(&mut source, &mut zip)?;
        files += 1;
    }

    zip.finish()?;
    log::info!("packed {files} files into {}", output.display());
    Ok(files)
}
