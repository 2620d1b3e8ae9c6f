//! Where CLI output goes: a live terminal or a log

use std::io::IsTerminal;

/// Environment variables whose presence marks a CI runner
const CI_MARKERS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "JENKINS_URL",
    "BUILDKITE",
    "TF_BUILD",
];

/// Output capabilities of the current invocation
///
/// Interactive means spinners, cliclack step lines and prompts. Otherwise
/// every line is plain text with a `[TAG]` prefix, suitable for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiContext {
    interactive: bool,
    /// `--yes` was given: prompts approve themselves
    auto_yes: bool,
}

impl UiContext {
    /// Interactive only with a terminal on both ends and no CI runner
    pub fn detect() -> Self {
        let tty = std::io::stdout().is_terminal() && std::io::stdin().is_terminal();
        let dumb = std::env::var("TERM").is_ok_and(|term| term == "dumb");
        let ci = running_in_ci(|name| std::env::var_os(name).is_some());

        Self {
            interactive: tty && !dumb && !ci,
            auto_yes: false,
        }
    }

    /// Plain log lines, never prompting
    pub fn plain() -> Self {
        Self {
            interactive: false,
            auto_yes: false,
        }
    }

    pub fn with_auto_yes(self, auto_yes: bool) -> Self {
        Self { auto_yes, ..self }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }
}

/// Whether any CI marker is set, according to `is_set`
fn running_in_ci(is_set: impl Fn(&str) -> bool) -> bool {
    CI_MARKERS.iter().any(|name| is_set(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_context_never_prompts() {
        let ctx = UiContext::plain();
        assert!(!ctx.is_interactive());
        assert!(!ctx.auto_yes());
        assert!(ctx.with_auto_yes(true).auto_yes());
    }

    #[test]
    fn ci_markers() {
        assert!(!running_in_ci(|_| false));
        assert!(running_in_ci(|name| name == "GITLAB_CI"));
        assert!(!running_in_ci(|name| name == "CONTINUOUS"));
    }
}
