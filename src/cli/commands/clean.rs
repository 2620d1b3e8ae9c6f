//! Clean command - sweep leftover temporary files

use crate::config::Config;
use crate::error::MenushotResult;
use crate::renderer::purge_temp_files;
use crate::ui::{self, Status, UiContext};

/// Execute the clean command
pub async fn execute(config: &Config) -> MenushotResult<()> {
    let ctx = UiContext::detect();
    let removed = purge_temp_files(&config.paths.data_dir).await;

    if removed == 0 {
        ui::step(&ctx, Status::Info, "No temporary files found", None);
    } else {
        ui::step(
            &ctx,
            Status::Ok,
            &format!("Removed {} temporary file(s)", removed),
            Some(&config.paths.data_dir.display().to_string()),
        );
    }

    Ok(())
}
