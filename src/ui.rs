use colored::Colorize;
use delivery::{AttributeMap, Diagnostic, Level};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Delivery output
// ============================================================================

/// Print a diagnostic with the symbol of its level
pub fn diagnostic(diagnostic: &Diagnostic) {
    match diagnostic.level {
        Level::Warn => warn(&diagnostic.message),
        Level::Error => error(&diagnostic.message),
    }
}

/// Print all values of a settings or preferences map
pub fn attributes(values: &AttributeMap) {
    if values.is_empty() {
        dim("(none)");
        return;
    }
    for (key, value) in values {
        kv(key, &value.to_string());
    }
}

/// `<operation> <target>: SUCCESS|FAILED`
pub fn status_line(operation: &str, target: &str, success: bool) -> String {
    let status = if success {
        "SUCCESS".green()
    } else {
        "FAILED".red()
    };
    format!("{operation} {target}: {status}")
}

/// Print the details of a failed remote call
pub fn remote_failure(error_type: &str, message: &str) {
    eprintln!("Type: {error_type}");
    eprintln!("Message: {message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        colored::control::set_override(false);
        assert_eq!(status_line("start", "Svc", true), "start Svc: SUCCESS");
        assert_eq!(
            status_line("deploy", "/tmp/Svc.rep", false),
            "deploy /tmp/Svc.rep: FAILED"
        );
    }
}
