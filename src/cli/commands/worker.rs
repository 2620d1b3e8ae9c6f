//! Worker command - one compile task over stdin/stdout

use crate::error::{MenushotError, MenushotResult};
use crate::worker::serve;

/// Execute the hidden worker command
///
/// Runs before any config is loaded; everything the task needs travels in
/// the task itself.
pub async fn execute() -> MenushotResult<()> {
    tokio::task::spawn_blocking(|| serve(std::io::stdin().lock(), std::io::stdout().lock()))
        .await
        .map_err(|e| MenushotError::Internal(format!("worker task failed: {}", e)))?
}
