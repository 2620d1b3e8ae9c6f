//! Terminal output for the CLI
//!
//! Uses `cliclack` for spinners and step lines in a terminal, with plain
//! `[OK]`/`[WARN]` lines when stdout is piped or running under CI.
//!
//! # Example
//!
//! ```rust,ignore
//! use menushot::ui::{self, Status, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Rendering command menu...");
//! // ... render ...
//! spinner.stop("Rendered 2 images");
//!
//! ui::step(&ctx, Status::Ok, "Cache", Some("hit"));
//! ```

mod confirm;
mod context;
mod output;
mod progress;
mod theme;

pub use confirm::confirm;
pub use context::UiContext;
pub use output::{field, finish, heading, remark, step, Status};
pub use progress::TaskSpinner;
pub use theme::{init_theme, MenushotTheme};
