//! Spinner with CI fallback

use super::context::UiContext;
use super::output::Status;
use console::style;

/// Spinner shown while a render is in flight
///
/// In plain mode it prints one line at start and one at stop.
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
    /// Print nothing at all
    silent: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.is_interactive(),
            silent: false,
        }
    }

    /// A spinner that swallows every message
    pub fn hidden() -> Self {
        Self {
            spinner: None,
            interactive: false,
            silent: true,
        }
    }

    pub fn start(&mut self, message: &str) {
        if self.silent {
            return;
        }

        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if self.silent {
            return;
        }

        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else {
            self.print_final(Status::Ok, message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if self.silent {
            return;
        }

        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else {
            self.print_final(Status::Fail, message);
        }
    }

    /// Stop with warning message
    pub fn stop_warn(&mut self, message: &str) {
        if self.silent {
            return;
        }

        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else {
            self.print_final(Status::Warn, message);
        }
    }

    /// Closing line when no spinner is running
    fn print_final(&self, status: Status, message: &str) {
        let marker = if self.interactive {
            match status {
                Status::Ok => "✓",
                Status::Fail => "✗",
                Status::Warn | Status::Info => "!",
            }
        } else {
            status.tag()
        };
        println!("{} {}", status.paint(marker), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_spinner_prints_lines() {
        let ctx = UiContext::plain();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Rendering...");
        spinner.stop("Done");
    }

    #[test]
    fn hidden_spinner_is_silent() {
        let mut spinner = TaskSpinner::hidden();
        spinner.start("Rendering...");
        spinner.stop_warn("Nothing to render");
        spinner.stop_error("Failed");
    }
}
