//! Render cache coordination
//!
//! Turns a data provider into delivery images, reusing static renders when
//! nothing that affects them has changed.
//!
//! # Targets
//!
//! | Target | When | Files | Locking |
//! |--------|------|-------|---------|
//! | Static | no query | `{basename}.{json,png,hash,webp}` per mode | one lock per mode |
//! | Ephemeral | query given | `temp_{uuid}.*` | none |
//!
//! A static render is reused only when the catalog fingerprint, the config
//! snapshot and the stored images all check out. The record is written after
//! a successful compile and deleted after any failure, so an interrupted
//! compile can never be mistaken for a hit.

pub mod cleanup;
pub mod record;

pub use cleanup::{cleanup_files, purge_temp_files, schedule_cleanup};
pub use record::CacheRecord;

use crate::catalog::RenderMode;
use crate::config::{Config, RenderingConfig};
use crate::error::{MenushotError, MenushotResult};
use crate::hashing::content_hash;
use crate::postprocess::verify_image;
use crate::worker::{ProcessExecutor, RenderTask, TaskExecutor};
use cleanup::{remove_quietly, TEMP_PREFIX};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Images ready for delivery
#[derive(Debug, Clone, PartialEq)]
pub struct RenderArtifact {
    /// Delivery images in page order
    pub images: Vec<PathBuf>,
    /// Files the caller deletes after delivery (ephemeral renders only)
    pub temp_files: Vec<PathBuf>,
    /// Whether the images came from the static cache
    pub from_cache: bool,
}

/// Where one render reads and writes
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPaths {
    pub json: PathBuf,
    pub png: PathBuf,
    /// Cache record; absent for ephemeral targets
    pub record: Option<PathBuf>,
    pub is_temp: bool,
    pub req_id: String,
    /// Stem of the delivery images
    pub stem: String,
}

/// What is currently stored for one static mode
#[derive(Debug, Clone)]
pub struct CacheEntryStatus {
    pub mode: RenderMode,
    pub record: Option<CacheRecord>,
    pub images: Vec<PathBuf>,
    /// Whether the record was built with the current config snapshot
    pub config_current: bool,
}

/// Coordinates data providers, the static cache and the render worker
pub struct Renderer {
    data_dir: PathBuf,
    template_path: PathBuf,
    font_dirs: Vec<PathBuf>,
    compiler: PathBuf,
    rendering: RenderingConfig,
    executor: Arc<dyn TaskExecutor>,
    locks: HashMap<RenderMode, Mutex<()>>,
}

impl Renderer {
    /// Create a renderer with an explicit executor
    pub fn new(config: &Config, executor: Arc<dyn TaskExecutor>) -> Self {
        let locks = RenderMode::all()
            .iter()
            .map(|mode| (*mode, Mutex::new(())))
            .collect();

        Self {
            data_dir: config.paths.data_dir.clone(),
            template_path: config.paths.template.clone(),
            font_dirs: config.paths.font_dirs.clone(),
            compiler: config.compiler.binary.clone(),
            rendering: config.rendering.clone(),
            executor,
            locks,
        }
    }

    /// Create a renderer compiling in worker processes of this binary
    pub fn with_process_worker(config: &Config) -> MenushotResult<Self> {
        let executor =
            ProcessExecutor::current_exe()?.with_timeout(config.rendering.compile_timeout());
        Ok(Self::new(config, Arc::new(executor)))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Render a catalog into delivery images
    ///
    /// `provider` writes the layout JSON to the path it is given and returns
    /// the number of items written. It runs on the blocking pool under the
    /// analysis timeout. A query makes the render ephemeral.
    pub async fn render<F>(
        &self,
        provider: F,
        mode: RenderMode,
        query: Option<&str>,
    ) -> MenushotResult<RenderArtifact>
    where
        F: FnOnce(&Path) -> MenushotResult<usize> + Send + 'static,
    {
        let query = query.filter(|q| !q.is_empty());
        let paths = self.resolve_paths(mode, query);

        let _guard = if paths.is_temp {
            None
        } else {
            Some(self.lock_for(mode).lock().await)
        };

        let result = self.render_target(provider, mode, query, &paths).await;

        if let Err(ref e) = result {
            if e.rolls_back_cache() {
                error!("Render of {} failed: {}", mode, e);
                self.rollback(&paths).await;
            }
        }

        result
    }

    /// Compute file locations for a request
    pub fn resolve_paths(&self, mode: RenderMode, query: Option<&str>) -> TargetPaths {
        match query {
            Some(_) => {
                let req_id = Uuid::new_v4().to_string();
                let stem = format!("{}{}", TEMP_PREFIX, req_id);
                TargetPaths {
                    json: self.data_dir.join(format!("{}.json", stem)),
                    png: self.data_dir.join(format!("{}.png", stem)),
                    record: None,
                    is_temp: true,
                    req_id,
                    stem,
                }
            }
            None => {
                let base = mode.cache_basename();
                TargetPaths {
                    json: self.data_dir.join(format!("{}.json", base)),
                    png: self.data_dir.join(format!("{}.png", base)),
                    record: Some(self.data_dir.join(format!("{}.hash", base))),
                    is_temp: false,
                    req_id: "static".to_string(),
                    stem: base.to_string(),
                }
            }
        }
    }

    fn lock_for(&self, mode: RenderMode) -> &Mutex<()> {
        // Every mode gets a lock in `new`
        &self.locks[&mode]
    }

    async fn render_target<F>(
        &self,
        provider: F,
        mode: RenderMode,
        query: Option<&str>,
        paths: &TargetPaths,
    ) -> MenushotResult<RenderArtifact>
    where
        F: FnOnce(&Path) -> MenushotResult<usize> + Send + 'static,
    {
        let count = self.run_provider(provider, paths).await?;
        debug!("Provider wrote {} items for {}", count, mode);

        if !paths.is_temp && paths.json.exists() && !self.needs_compile(paths).await {
            let images = find_images(&self.data_dir, &paths.stem).await;
            info!("Cache hit for {} ({} images)", mode, images.len());
            return Ok(RenderArtifact {
                images,
                temp_files: Vec::new(),
                from_cache: true,
            });
        }

        let json_str = fs::read_to_string(&paths.json).await.map_err(|e| {
            MenushotError::io(format!("reading layout {}", paths.json.display()), e)
        })?;

        let task = RenderTask {
            compiler: self.compiler.clone(),
            template_path: self.template_path.clone(),
            font_paths: self.font_dirs.clone(),
            json_str,
            output_png_path: paths.png.clone(),
            output_dir: self.data_dir.clone(),
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            query: query.map(str::to_string),
            is_temp: paths.is_temp,
            req_id: paths.req_id.clone(),
            webp_limit: self.rendering.webp_limit,
            split_height: self.rendering.split_height,
            ppi: self.rendering.ppi,
        };
        let fingerprint = content_hash(&task.json_str);

        info!("Compiling {} menu (request {})", mode, paths.req_id);
        let images = self.executor.execute(task).await?.into_result()?;
        if images.is_empty() {
            return Err(MenushotError::NoImageGenerated);
        }

        if let Some(ref record_path) = paths.record {
            remove_stale_images(&self.data_dir, &paths.stem, &images).await;
            CacheRecord::new(fingerprint, self.rendering.snapshot().to_map())
                .save(record_path)
                .await?;
        }

        let temp_files = if paths.is_temp {
            let mut files = vec![paths.json.clone(), paths.png.clone()];
            files.extend(images.iter().cloned());
            files
        } else {
            Vec::new()
        };

        Ok(RenderArtifact {
            images,
            temp_files,
            from_cache: false,
        })
    }

    /// Run the provider against a private staging file
    ///
    /// The layout only reaches `paths.json` once the provider returns a
    /// non-empty result in time. A provider that overruns keeps running on
    /// the blocking pool; whatever it writes later is discarded.
    async fn run_provider<F>(&self, provider: F, paths: &TargetPaths) -> MenushotResult<usize>
    where
        F: FnOnce(&Path) -> MenushotResult<usize> + Send + 'static,
    {
        let staging = self
            .data_dir
            .join(format!("{}{}.partial.json", TEMP_PREFIX, Uuid::new_v4().simple()));
        let limit = self.rendering.analysis_timeout();
        let mut handle = {
            let staging = staging.clone();
            tokio::task::spawn_blocking(move || provider(&staging))
        };

        let count = match tokio::time::timeout(limit, &mut handle).await {
            Err(_) => {
                warn!("Catalog provider exceeded {:?}", limit);
                tokio::spawn(discard_late_output(handle, staging));
                return Err(MenushotError::ProviderTimeout {
                    secs: limit.as_secs_f64(),
                });
            }
            Ok(Err(join_err)) => {
                remove_quietly(&staging).await;
                return Err(MenushotError::Provider(format!(
                    "catalog provider aborted: {}",
                    join_err
                )));
            }
            Ok(Ok(Err(e))) => {
                remove_quietly(&staging).await;
                return Err(e);
            }
            Ok(Ok(Ok(count))) => count,
        };

        if count == 0 {
            remove_quietly(&staging).await;
            return Err(MenushotError::EmptyResult);
        }

        if let Err(e) = fs::rename(&staging, &paths.json).await {
            remove_quietly(&staging).await;
            return Err(MenushotError::io(
                format!("publishing layout {}", paths.json.display()),
                e,
            ));
        }

        Ok(count)
    }

    /// Decide whether a static target must be recompiled
    ///
    /// Any problem reading the cache state counts as a miss.
    async fn needs_compile(&self, paths: &TargetPaths) -> bool {
        match self.check_cache(paths).await {
            Ok(needed) => needed,
            Err(e) => {
                warn!("Cache check failed, forcing recompile: {}", e);
                true
            }
        }
    }

    async fn check_cache(&self, paths: &TargetPaths) -> MenushotResult<bool> {
        let Some(ref record_path) = paths.record else {
            return Ok(true);
        };

        let content = fs::read_to_string(&paths.json).await.map_err(|e| {
            MenushotError::io(format!("reading layout {}", paths.json.display()), e)
        })?;
        let current_hash = content_hash(&content);

        let Some(record) = CacheRecord::load(record_path).await? else {
            debug!("No cache record at {}", record_path.display());
            return Ok(true);
        };

        let current_config = self.rendering.snapshot().to_map();
        let content_ok = record.content_matches(&current_hash);
        let config_ok = record.config_matches(&current_config);
        if !content_ok || !config_ok {
            debug!(
                "Cache stale for {}: content_match={} config_match={}",
                paths.stem, content_ok, config_ok
            );
            return Ok(true);
        }

        let images_ok = self.images_valid(paths).await;
        if !images_ok {
            debug!("Cached images for {} missing or corrupt", paths.stem);
        }
        Ok(!images_ok)
    }

    async fn images_valid(&self, paths: &TargetPaths) -> bool {
        let images = find_images(&self.data_dir, &paths.stem).await;
        if images.is_empty() {
            return false;
        }

        let mut to_check = vec![paths.png.clone()];
        to_check.extend(images);

        tokio::task::spawn_blocking(move || to_check.iter().all(|p| verify_image(p)))
            .await
            .unwrap_or(false)
    }

    /// Undo a failed render
    ///
    /// Ephemeral targets lose every intermediate; static targets lose only
    /// their record so the next request recompiles.
    async fn rollback(&self, paths: &TargetPaths) {
        if paths.is_temp {
            remove_quietly(&paths.json).await;
            remove_quietly(&paths.png).await;
            for image in find_images(&self.data_dir, &paths.stem).await {
                remove_quietly(&image).await;
            }
        } else if let Some(ref record_path) = paths.record {
            if remove_quietly(record_path).await {
                debug!("Invalidated cache record {}", record_path.display());
            }
        }
    }

    /// Describe the stored cache for one static mode
    pub async fn inspect(&self, mode: RenderMode) -> MenushotResult<CacheEntryStatus> {
        let paths = self.resolve_paths(mode, None);
        let record = match paths.record {
            Some(ref p) => CacheRecord::load(p).await?,
            None => None,
        };
        let config_current = record
            .as_ref()
            .is_some_and(|r| r.config_matches(&self.rendering.snapshot().to_map()));

        Ok(CacheEntryStatus {
            mode,
            record,
            images: find_images(&self.data_dir, &paths.stem).await,
            config_current,
        })
    }

    /// Remove every file of one static cache; returns the number deleted
    pub async fn clear(&self, mode: RenderMode) -> usize {
        let _guard = self.lock_for(mode).lock().await;
        let paths = self.resolve_paths(mode, None);

        let mut files = vec![paths.json, paths.png];
        files.extend(paths.record);
        files.extend(find_images(&self.data_dir, &paths.stem).await);

        let mut removed = 0;
        for file in &files {
            if remove_quietly(file).await {
                removed += 1;
            }
        }
        removed
    }
}

/// Wait out an abandoned provider and delete what it staged
async fn discard_late_output(
    handle: tokio::task::JoinHandle<MenushotResult<usize>>,
    staging: PathBuf,
) {
    let _ = handle.await;
    if remove_quietly(&staging).await {
        debug!("Discarded late layout {}", staging.display());
    }
}

/// Split part index of `name` for `stem`, e.g. `menu_part12.webp` -> 12
fn part_index(name: &str, stem: &str) -> Option<u32> {
    name.strip_prefix(stem)?
        .strip_prefix("_part")?
        .strip_suffix(".webp")?
        .parse()
        .ok()
}

/// Delivery images stored for `stem`, in page order
///
/// A single `{stem}.webp` wins over split parts.
pub async fn find_images(dir: &Path, stem: &str) -> Vec<PathBuf> {
    let single = dir.join(format!("{}.webp", stem));
    if single.exists() {
        return vec![single];
    }

    let mut parts = Vec::new();
    if let Ok(mut entries) = fs::read_dir(dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(index) = entry.file_name().to_str().and_then(|n| part_index(n, stem)) {
                parts.push((index, entry.path()));
            }
        }
    }

    parts.sort_by_key(|(index, _)| *index);
    parts.into_iter().map(|(_, path)| path).collect()
}

/// Delete images for `stem` left over from an earlier, differently split render
async fn remove_stale_images(dir: &Path, stem: &str, keep: &[PathBuf]) {
    let mut candidates = vec![dir.join(format!("{}.webp", stem))];
    if let Ok(mut entries) = fs::read_dir(dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_part = entry
                .file_name()
                .to_str()
                .is_some_and(|n| part_index(n, stem).is_some());
            if is_part {
                candidates.push(entry.path());
            }
        }
    }

    for path in candidates {
        if !keep.contains(&path) {
            remove_quietly(&path).await;
        }
    }
}
