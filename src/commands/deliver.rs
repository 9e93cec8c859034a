//! `deliver` - push a project's services to the nodes of one domain

use anyhow::{Context as _, Result};
use colored::Colorize;
use delivery::{DeliveryFilter, DeliveryReport, Diagnostics, ExecuteOptions};

use crate::Context;
use crate::bridge::HttpConnector;
use crate::cli::DeliverArgs;
use crate::config;
use crate::credentials::PromptCredentials;
use crate::progress::ConsoleReporter;
use crate::ui;

pub fn run(ctx: &Context, args: DeliverArgs) -> Result<()> {
    let root = config::expand_root(&args.project);
    let configuration = config::load_project(&root)
        .with_context(|| format!("Failed to load delivery project {}", root.display()))?;

    let selection = selection(&args);
    let diagnostics = Diagnostics::new();
    let prepared = delivery::prepare(&configuration, &selection, &diagnostics);

    for diagnostic in diagnostics.snapshot() {
        ui::diagnostic(&diagnostic);
    }
    let task_lists = prepared?;

    if task_lists.iter().all(delivery::TaskList::is_empty) {
        ui::warn(&format!(
            "Nothing to deliver to domain '{}' with the given filters",
            selection.domain
        ));
        return Ok(());
    }

    let title = if args.dry_run {
        format!("Delivery to '{}' (dry run)", selection.domain)
    } else {
        format!("Delivery to '{}'", selection.domain)
    };
    ui::header(&title);
    if !ctx.quiet {
        ui::kv("Project", &root.display().to_string());
        ui::kv("Nodes", &task_lists.len().to_string());
        ui::kv(
            "Tasks",
            &task_lists
                .iter()
                .map(delivery::TaskList::total_tasks)
                .sum::<usize>()
                .to_string(),
        );
    }

    let options = ExecuteOptions {
        dry_run: args.dry_run,
        break_on_error: args.break_on_error,
    };
    let reporter = ConsoleReporter::new(ctx.quiet);
    let report = delivery::deliver(
        &task_lists,
        &HttpConnector,
        &PromptCredentials::new(),
        options,
        &reporter,
    );

    print_summary(&report, args.dry_run);
    report.into_result()?;
    Ok(())
}

fn selection(args: &DeliverArgs) -> DeliveryFilter {
    DeliveryFilter {
        domain: args.domain.clone(),
        nodes: args.nodes.iter().cloned().collect(),
        labels: args.labels.iter().cloned().collect(),
        solutions: args.solutions.iter().cloned().collect(),
        services: args.services.iter().cloned().collect(),
    }
}

fn print_summary(report: &DeliveryReport, dry_run: bool) {
    println!();
    for node in &report.nodes {
        if let Some(error) = &node.error {
            ui::error(&format!("{}: {error}", node.node));
        }
    }
    for failure in report.failures() {
        ui::error(&failure.to_string());
    }
    for node in &report.skipped {
        ui::dim(&format!("{node}: skipped"));
    }

    let failed = report.failed();
    if failed == 0 && report.skipped.is_empty() {
        let what = if dry_run { "planned" } else { "delivered" };
        ui::success(&format!(
            "{} node(s) {what}",
            report.nodes.len().to_string().bold()
        ));
    } else {
        ui::warn(&format!(
            "{} failure(s), {} node(s) skipped",
            failed.to_string().red(),
            report.skipped.len()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_selection_from_args() {
        let args = DeliverArgs {
            domain: "production".into(),
            project: PathBuf::from("."),
            nodes: vec!["prod1".into(), "prod1".into()],
            labels: vec![],
            solutions: vec!["monitoring".into()],
            services: vec![],
            dry_run: true,
            break_on_error: false,
        };
        let selection = selection(&args);
        assert_eq!(selection.domain, "production");
        assert_eq!(selection.nodes.len(), 1);
        assert!(selection.labels.is_empty());
        assert!(selection.solutions.contains("monitoring"));
    }
}
