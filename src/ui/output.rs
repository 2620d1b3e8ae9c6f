//! Status lines for command results
//!
//! Every line carries a [`Status`]. Interactive sessions render it through
//! cliclack's log symbols; plain sessions prefix a `[TAG]`.

use super::context::UiContext;
use console::{style, StyledObject};

/// Outcome a line reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Status {
    /// Prefix used in plain output
    pub fn tag(self) -> &'static str {
        match self {
            Status::Ok => "[OK]",
            Status::Warn => "[WARN]",
            Status::Fail => "[FAIL]",
            Status::Info => "[INFO]",
        }
    }

    pub(crate) fn paint<D>(self, text: D) -> StyledObject<D> {
        match self {
            Status::Ok => style(text).green(),
            Status::Warn => style(text).yellow(),
            Status::Fail => style(text).red(),
            Status::Info => style(text).cyan(),
        }
    }
}

/// `message (detail)`, or just `message`
fn with_detail(message: &str, detail: Option<&str>, dim: bool) -> String {
    match detail {
        Some(detail) if dim => format!("{} ({})", message, style(detail).dim()),
        Some(detail) => format!("{} ({})", message, detail),
        None => message.to_string(),
    }
}

/// One result line, with optional detail in parentheses
pub fn step(ctx: &UiContext, status: Status, message: &str, detail: Option<&str>) {
    if !ctx.is_interactive() {
        let text = with_detail(message, detail, false);
        println!("  {} {}", status.paint(status.tag()), text);
        return;
    }

    let text = with_detail(message, detail, true);
    let _ = match status {
        Status::Ok => cliclack::log::success(text),
        Status::Warn => cliclack::log::warning(text),
        Status::Fail => cliclack::log::error(text),
        Status::Info => cliclack::log::info(text),
    };
}

/// Bold heading separating groups of fields
pub fn heading(ctx: &UiContext, title: &str) {
    println!();
    if ctx.is_interactive() {
        let _ = cliclack::log::info(style(title).bold());
    } else {
        println!("{}", style(title).bold());
    }
}

/// `key: value`; a status colors the value (or tags the line when plain)
pub fn field(ctx: &UiContext, key: &str, value: &str, status: Option<Status>) {
    match (ctx.is_interactive(), status) {
        (true, Some(status)) => println!("  {}: {}", style(key).dim(), status.paint(value)),
        (true, None) => println!("  {}: {}", style(key).dim(), value),
        (false, Some(status)) => println!("  {} {}: {}", status.paint(status.tag()), key, value),
        (false, None) => println!("  {}: {}", key, value),
    }
}

/// Closing line of a command
pub fn finish(ctx: &UiContext, status: Status, message: &str) {
    if ctx.is_interactive() {
        let _ = cliclack::outro(status.paint(message).bold());
    } else {
        println!();
        println!("{} {}", status.paint(status.tag()), message);
    }
}

/// Dimmed aside
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        let _ = cliclack::log::remark(message);
    } else {
        println!("  {}", style(message).dim());
    }
}
