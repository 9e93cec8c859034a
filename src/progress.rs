//! Console progress for delivery runs
//!
//! One spinner per node while its services are worked on. Task results
//! are printed above the spinner as they arrive.

use colored::Colorize;
use delivery::{DeliveryReporter, Node, RemoteError, Task, TaskKind};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Create a spinner with a message
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Reports delivery events on the terminal
pub struct ConsoleReporter {
    quiet: bool,
    current: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            current: Mutex::new(None),
        }
    }

    fn with_spinner(&self, f: impl FnOnce(&ProgressBar)) {
        let current = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(pb) = current.as_ref() {
            f(pb);
        }
    }

    fn line(&self, line: String) {
        let mut printed = false;
        self.with_spinner(|pb| {
            pb.println(&line);
            printed = true;
        });
        if !printed {
            println!("{line}");
        }
    }
}

impl DeliveryReporter for ConsoleReporter {
    fn on_node_start(&self, node: &Node, services: usize) {
        println!();
        println!(
            "{} {} {}",
            "▸".cyan(),
            node.name.bold(),
            format!("({}:{}, {services} services)", node.host, node.port).dimmed()
        );

        let pb = if self.quiet {
            ProgressBar::hidden()
        } else {
            spinner(&format!("Delivering to {}...", node.name))
        };
        *self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(pb);
    }

    fn on_task_planned(&self, _node: &str, service: &str, task: &Task) {
        self.line(format!(
            "  {} {service}: {}",
            "[dry-run]".yellow(),
            task.describe()
        ));
    }

    fn on_task_start(&self, _node: &str, service: &str, task: &Task) {
        self.with_spinner(|pb| pb.set_message(format!("{service}: {}", task.kind())));
    }

    fn on_task_complete(
        &self,
        _node: &str,
        service: &str,
        task: TaskKind,
        result: Result<(), &RemoteError>,
    ) {
        match result {
            Ok(()) => self.line(format!("  {} {service}: {task}", "✓".green())),
            Err(error) => self.line(format!(
                "  {} {service}: {task} failed - {error}",
                "✗".red()
            )),
        }
    }

    fn on_node_complete(&self, node: &Node, failed: usize) {
        let pb = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        if failed > 0 {
            println!(
                "  {} {} of the services on {} failed",
                "⚠".yellow(),
                failed,
                node.name
            );
        }
    }
}
