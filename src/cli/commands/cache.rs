//! Cache command - inspect and clear static renders

use crate::catalog::RenderMode;
use crate::cli::args::{CacheAction, CacheArgs};
use crate::config::Config;
use crate::error::MenushotResult;
use crate::renderer::{CacheEntryStatus, Renderer};
use crate::ui::{self, Status, UiContext};

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> MenushotResult<()> {
    let renderer = Renderer::with_process_worker(config)?;

    match args.action {
        CacheAction::Status => show_status(&renderer).await,
        CacheAction::Clear { mode, yes } => clear(&renderer, mode, yes).await,
    }
}

async fn show_status(renderer: &Renderer) -> MenushotResult<()> {
    let ctx = UiContext::detect();
    ui::field(&ctx, "Data dir", &renderer.data_dir().display().to_string(), None);

    for mode in RenderMode::all() {
        let status = renderer.inspect(*mode).await?;
        print_entry(&ctx, &status);
    }

    Ok(())
}

fn print_entry(ctx: &UiContext, status: &CacheEntryStatus) {
    ui::heading(ctx, &format!("{} ({})", status.mode.default_title(), status.mode));

    let Some(ref record) = status.record else {
        ui::step(ctx, Status::Warn, "No cached render", Some("run `menushot render`"));
        return;
    };

    let short_hash: String = record.content_hash.chars().take(12).collect();
    let health = |ok: bool| Some(if ok { Status::Ok } else { Status::Warn });
    ui::field(ctx, "Content", &short_hash, None);
    ui::field(
        ctx,
        "Config",
        if status.config_current { "current" } else { "stale" },
        health(status.config_current),
    );
    ui::field(
        ctx,
        "Images",
        &status.images.len().to_string(),
        health(!status.images.is_empty()),
    );
}

async fn clear(renderer: &Renderer, mode: Option<RenderMode>, yes: bool) -> MenushotResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let modes: Vec<RenderMode> = match mode {
        Some(m) => vec![m],
        None => RenderMode::all().to_vec(),
    };

    let names: Vec<&str> = modes.iter().map(RenderMode::as_str).collect();
    let prompt = format!("Remove cached renders for {}?", names.join(", "));
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::remark(&ctx, "Nothing removed (pass --yes to skip this prompt)");
        return Ok(());
    }

    let mut removed = 0;
    for mode in modes {
        removed += renderer.clear(mode).await;
    }

    ui::step(&ctx, Status::Ok, &format!("Removed {} cache file(s)", removed), None);
    Ok(())
}
