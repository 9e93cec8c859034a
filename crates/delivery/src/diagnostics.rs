//! Append-only diagnostics sink shared by all stages of a run

use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Warn => f.write_str("warn"),
            Level::Error => f.write_str("error"),
        }
    }
}

/// A single warning or error raised while preparing a delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

impl Diagnostic {
    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            level: Level::Warn,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

/// Thread-safe, append-only collection of diagnostics
///
/// Entries keep insertion order. Nothing is ever removed.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic
    pub fn push(&self, diagnostic: Diagnostic) {
        match diagnostic.level {
            Level::Warn => log::debug!("warn: {}", diagnostic.message),
            Level::Error => log::debug!("error: {}", diagnostic.message),
        }
        match self.entries.lock() {
            Ok(mut locked) => locked.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.push(Diagnostic::warn(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(Diagnostic::error(message));
    }

    /// Copy of all diagnostics recorded so far
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(locked) => locked.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of error-level diagnostics
    pub fn error_count(&self) -> usize {
        self.snapshot().iter().filter(|d| d.is_error()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        match self.entries.into_inner() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
