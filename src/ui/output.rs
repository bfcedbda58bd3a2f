//! Output functions for consistent step logs
//!
//! Inside GitHub Actions everything is written as workflow commands so the
//! runner can fold groups, mask secrets and annotate warnings. Locally the
//! same calls print styled plain text.

use super::context::UiContext;
use console::style;

/// Escape the message part of a workflow command
fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Format a workflow command line, e.g. `::warning::message`
pub fn format_command(command: &str, message: &str) -> String {
    format!("::{}::{}", command, escape_data(message))
}

/// Print an informational line
pub fn info(_ctx: &UiContext, message: &str) {
    println!("{}", message);
}

/// Print a warning annotation
pub fn warning(ctx: &UiContext, message: &str) {
    if ctx.is_actions() {
        println!("{}", format_command("warning", message));
    } else if ctx.use_styled_output() {
        println!("{} {}", style("Warning:").yellow().bold(), message);
    } else {
        println!("Warning: {}", message);
    }
}

/// Print an error annotation, marking the step as failed in Actions
pub fn error(ctx: &UiContext, message: &str) {
    if ctx.is_actions() {
        println!("{}", format_command("error", message));
    } else if ctx.use_styled_output() {
        eprintln!("{} {}", style("Error:").red().bold(), message);
    } else {
        eprintln!("Error: {}", message);
    }
}

/// Register a secret so the runner redacts it from all later output
pub fn mask(ctx: &UiContext, secret: &str) {
    if !ctx.is_actions() {
        return;
    }
    // The runner masks per line, so multi-line values are registered line by line
    for line in secret.lines().filter(|l| !l.trim().is_empty()) {
        println!("{}", format_command("add-mask", line));
    }
}

/// Collapsible log section, closed when the guard drops
pub struct Group {
    actions: bool,
}

/// Open a log group
pub fn group(ctx: &UiContext, title: &str) -> Group {
    if ctx.is_actions() {
        println!("{}", format_command("group", title));
    } else if ctx.use_styled_output() {
        println!("{} {}", style("==>").cyan().bold(), style(title).bold());
    } else {
        println!("==> {}", title);
    }
    Group {
        actions: ctx.is_actions(),
    }
}

impl Drop for Group {
    fn drop(&mut self) {
        if self.actions {
            println!("::endgroup::");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_plain_message() {
        assert_eq!(format_command("warning", "cache down"), "::warning::cache down");
    }

    #[test]
    fn command_escapes_newlines_and_percent() {
        assert_eq!(
            format_command("error", "50% done\r\nnext"),
            "::error::50%25 done%0D%0Anext"
        );
    }

    #[test]
    fn group_guard_in_plain_mode() {
        let ctx = UiContext::plain();
        let guard = group(&ctx, "Building");
        assert!(!guard.actions);
    }
}
