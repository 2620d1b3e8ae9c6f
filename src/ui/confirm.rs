//! Confirmation prompt with CI fallback

use super::context::UiContext;
use crate::error::{MenushotError, MenushotResult};

/// Ask for confirmation; auto-yes approves, non-interactive returns `default`
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> MenushotResult<bool> {
    if ctx.auto_yes() {
        println!("  {} (auto-approved)", message);
        return Ok(true);
    }

    if !ctx.is_interactive() {
        return Ok(default);
    }

    // cliclack blocks on stdin
    let message = message.to_string();
    let answer = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message).initial_value(default).interact()
    })
    .await
    .map_err(|e| MenushotError::Internal(format!("prompt task failed: {}", e)))?;

    answer.map_err(|e| MenushotError::io("reading confirmation", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn auto_yes_approves() {
        let ctx = UiContext::plain().with_auto_yes(true);
        assert!(confirm(&ctx, "Clear?", false).await.unwrap());
    }

    #[tokio::test]
    async fn plain_context_uses_default() {
        let ctx = UiContext::plain();
        assert!(confirm(&ctx, "Clear?", true).await.unwrap());
        assert!(!confirm(&ctx, "Clear?", false).await.unwrap());
    }
}
