//! Render command - catalog to delivered images

use crate::catalog::{CatalogSnapshot, RenderMode};
use crate::cli::args::RenderArgs;
use crate::config::{Config, ConfigManager};
use crate::error::{MenushotError, MenushotResult};
use crate::layout::LayoutBalancer;
use crate::renderer::{cleanup_files, purge_temp_files, RenderArtifact, Renderer};
use crate::ui::{self, Status, TaskSpinner, UiContext};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Execute the render command
pub async fn execute(args: RenderArgs, config: &Config) -> MenushotResult<()> {
    let ctx = UiContext::detect();
    ConfigManager::ensure_data_dir(config).await?;

    let snapshot = CatalogSnapshot::load(&args.catalog).await?;
    debug!("Loaded {} containers from {}", snapshot.len(), args.catalog.display());

    let query = args.query.clone().filter(|q| !q.is_empty());
    let title = args
        .title
        .clone()
        .unwrap_or_else(|| menu_title(args.mode, query.as_deref()));

    let provider = catalog_provider(
        snapshot,
        query.clone(),
        title,
        args.mode,
        config.rendering.giant_threshold,
        config.delivery.prefixes.clone(),
    );
    let renderer = Renderer::with_process_worker(config)?;

    let mut spinner = if config.delivery.send_hint {
        TaskSpinner::new(&ctx)
    } else {
        TaskSpinner::hidden()
    };
    spinner.start(&format!("Rendering {} menu...", args.mode));

    let result = tokio::select! {
        result = renderer.render(provider, args.mode, query.as_deref()) => result,
        _ = tokio::signal::ctrl_c() => {
            // Dropping the render kills its worker; sweep what it left behind
            spinner.stop_warn("Interrupted");
            let removed = purge_temp_files(renderer.data_dir()).await;
            debug!("Removed {} temp files after interrupt", removed);
            return Err(MenushotError::Interrupted);
        }
    };

    let artifact = match result {
        Ok(artifact) => artifact,
        Err(e) if e.is_empty_result() => {
            spinner.stop_warn("Nothing to render");
            let message = match query {
                Some(q) => format!("No entries match \"{}\"", q),
                None => "The catalog has nothing to show for this menu".to_string(),
            };
            ui::finish(&ctx, Status::Warn, &message);
            return Ok(());
        }
        Err(e) => {
            spinner.stop_error("Render failed");
            return Err(e);
        }
    };

    let source = if artifact.from_cache { "cached" } else { "compiled" };
    spinner.stop(&format!(
        "{} image(s) ready ({})",
        artifact.images.len(),
        source
    ));

    deliver(&ctx, &artifact, args.output.as_deref(), config).await
}

/// Title shown on the rendered page
pub fn menu_title(mode: RenderMode, query: Option<&str>) -> String {
    match query {
        Some(q) => format!("Search results: \"{}\"", q),
        None => mode.default_title().to_string(),
    }
}

/// Build the data provider for one request
///
/// The provider owns its snapshot and runs on the blocking pool.
pub fn catalog_provider(
    snapshot: CatalogSnapshot,
    query: Option<String>,
    title: String,
    mode: RenderMode,
    giant_threshold: u32,
    prefixes: Vec<String>,
) -> impl FnOnce(&Path) -> MenushotResult<usize> + Send + 'static {
    move |path: &Path| {
        let entries = snapshot.select(query.as_deref());
        if entries.is_empty() {
            return Ok(0);
        }

        LayoutBalancer::new(giant_threshold).write_layout(entries, path, title, mode, prefixes)
    }
}

async fn deliver(
    ctx: &UiContext,
    artifact: &RenderArtifact,
    output: Option<&Path>,
    config: &Config,
) -> MenushotResult<()> {
    let Some(output) = output else {
        for image in &artifact.images {
            println!("{}", image.display());
        }
        if !artifact.temp_files.is_empty() {
            ui::remark(ctx, "Temporary files stay until `menushot clean`");
        }
        return Ok(());
    };

    let delivered = copy_images(&artifact.images, output).await?;
    for path in &delivered {
        println!("{}", path.display());
    }

    if !artifact.temp_files.is_empty() {
        cleanup_files(artifact.temp_files.clone(), config.delivery.cleanup_delay()).await;
    }

    ui::finish(ctx, Status::Ok, &format!("Delivered to {}", output.display()));
    Ok(())
}

/// Copy images into `dir`, keeping their file names
async fn copy_images(images: &[PathBuf], dir: &Path) -> MenushotResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| MenushotError::io(format!("creating directory {}", dir.display()), e))?;

    let mut delivered = Vec::with_capacity(images.len());
    for image in images {
        let name = image
            .file_name()
            .ok_or_else(|| MenushotError::Internal(format!("image without file name: {}", image.display())))?;
        let target = dir.join(name);
        fs::copy(image, &target)
            .await
            .map_err(|e| MenushotError::io(format!("copying {}", image.display()), e))?;
        delivered.push(target);
    }

    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ContainerEntry, DisplayNode};
    use tempfile::TempDir;

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot::new(vec![
            ContainerEntry::new("git_tools", vec![DisplayNode::leaf("git.log", "show history")]),
            ContainerEntry::new("weather", vec![DisplayNode::leaf("forecast", "")]),
        ])
    }

    #[test]
    fn titles() {
        assert_eq!(menu_title(RenderMode::Event, None), "Event Listeners");
        assert_eq!(
            menu_title(RenderMode::Command, Some("git")),
            "Search results: \"git\""
        );
    }

    #[test]
    fn provider_writes_filtered_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("layout.json");
        let provider = catalog_provider(
            snapshot(),
            Some("GIT".into()),
            "t".into(),
            RenderMode::Command,
            1200,
            vec!["/".into()],
        );

        assert_eq!(provider(&path).unwrap(), 1);
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["plugin_count"], 1);
        assert_eq!(json["prefixes"][0], "/");
    }

    #[test]
    fn provider_reports_empty_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("layout.json");
        let provider = catalog_provider(
            snapshot(),
            Some("nothing-like-this".into()),
            "t".into(),
            RenderMode::Command,
            1200,
            Vec::new(),
        );

        assert_eq!(provider(&path).unwrap(), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn copy_images_keeps_names() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let image = src.path().join("cache_menu_command.webp");
        std::fs::write(&image, b"webp").unwrap();

        let delivered = copy_images(&[image], &out.path().join("menus")).await.unwrap();

        assert_eq!(
            delivered,
            vec![out.path().join("menus").join("cache_menu_command.webp")]
        );
        assert!(delivered[0].exists());
    }
}
