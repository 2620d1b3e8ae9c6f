//! Isolated compile-and-postprocess unit
//!
//! A [`RenderTask`] carries everything by value. [`execute_render_task`] runs
//! the external compiler, converts its raster with
//! [`crate::postprocess::process_to_webp`], then trims the heap whether or
//! not it succeeded. Failures come back as a [`WorkerOutcome::Failed`] value
//! so nothing unwinds across the process boundary.
//!
//! # Protocol
//!
//! The `menushot worker` subcommand reads one JSON task on stdin and writes
//! one JSON outcome on stdout:
//!
//! ```text
//! {"status":"ok","images":["/data/cache_menu_command.webp"]}
//! {"status":"failed","error":"...","trace":"..."}
//! ```

pub mod compiler;
pub mod isolation;

pub use compiler::{CompileInputs, Compiler, TypstCli};
pub use isolation::{InlineExecutor, ProcessExecutor, TaskExecutor};

use crate::error::{MenushotError, MenushotResult};
use crate::postprocess::process_to_webp;
use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::io::{Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use tracing::{debug, error};

/// Compile job descriptor, owned entirely by the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderTask {
    /// Typesetting compiler executable
    pub compiler: PathBuf,
    pub template_path: PathBuf,
    pub font_paths: Vec<PathBuf>,
    /// Layout payload handed to the template as a string input
    pub json_str: String,
    pub output_png_path: PathBuf,
    pub output_dir: PathBuf,
    /// Display timestamp printed in the footer
    pub timestamp: String,
    /// Search query to highlight, if any
    pub query: Option<String>,
    pub is_temp: bool,
    pub req_id: String,
    pub webp_limit: u32,
    pub split_height: u32,
    pub ppi: f32,
}

impl RenderTask {
    /// Stem for the delivery artifacts
    pub fn artifact_stem(&self) -> String {
        if self.is_temp {
            format!("temp_{}", self.req_id)
        } else {
            self.output_png_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.req_id.clone())
        }
    }

    fn inputs(&self) -> CompileInputs {
        CompileInputs {
            json_string: self.json_str.clone(),
            timestamp: self.timestamp.clone(),
            query_regex: self.query.as_deref().map(regex::escape),
        }
    }
}

/// Result of one worker run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkerOutcome {
    /// Delivery artifacts, in page order
    #[serde(rename = "ok")]
    Completed { images: Vec<PathBuf> },
    Failed { error: String, trace: String },
}

impl WorkerOutcome {
    fn failed(error: String) -> Self {
        Self::Failed {
            error,
            trace: Backtrace::force_capture().to_string(),
        }
    }

    /// Convert into the coordinator's result type
    pub fn into_result(self) -> MenushotResult<Vec<PathBuf>> {
        match self {
            Self::Completed { images } => Ok(images),
            Self::Failed { error, trace } => {
                error!("Render worker failed: {}\n{}", error, trace);
                Err(MenushotError::CompileFailure(error))
            }
        }
    }
}

/// Run a task to completion; never panics, always trims memory
pub fn execute_render_task(task: &RenderTask, compiler: &dyn Compiler) -> WorkerOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| run_task(task, compiler)));
    release_memory();

    match result {
        Ok(Ok(images)) => WorkerOutcome::Completed { images },
        Ok(Err(e)) => WorkerOutcome::failed(error_chain(&e)),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            WorkerOutcome::failed(format!("worker panicked: {}", message))
        }
    }
}

fn run_task(task: &RenderTask, compiler: &dyn Compiler) -> MenushotResult<Vec<PathBuf>> {
    debug!(
        "Compiling {} -> {}",
        task.template_path.display(),
        task.output_png_path.display()
    );

    compiler.compile(
        &task.template_path,
        &task.output_png_path,
        &task.font_paths,
        task.ppi,
        &task.inputs(),
    )?;

    process_to_webp(
        &task.output_png_path,
        &task.output_dir,
        &task.artifact_stem(),
        task.webp_limit,
        task.split_height,
    )
}

fn error_chain(err: &MenushotError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Hand freed heap pages back to the OS
///
/// Uses glibc's `malloc_trim`; a no-op on other platforms.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
pub fn release_memory() {
    // SAFETY: malloc_trim only walks allocator state and has no preconditions.
    unsafe {
        libc::malloc_trim(0);
    }
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
pub fn release_memory() {}

/// Worker process entry: one task in, one outcome out
///
/// Only protocol errors (unreadable task, closed stdout) are returned; render
/// failures are reported inside the outcome.
pub fn serve<R: Read, W: Write>(mut input: R, mut output: W) -> MenushotResult<()> {
    let mut raw = String::new();
    input
        .read_to_string(&mut raw)
        .map_err(|e| MenushotError::io("reading render task from stdin", e))?;

    let outcome = match serde_json::from_str::<RenderTask>(&raw) {
        Ok(task) => {
            let compiler = TypstCli::new(task.compiler.clone());
            execute_render_task(&task, &compiler)
        }
        Err(e) => WorkerOutcome::failed(format!("invalid render task: {}", e)),
    };

    serde_json::to_writer(&mut output, &outcome)?;
    output
        .flush()
        .map_err(|e| MenushotError::io("writing worker outcome", e))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Compiler double that paints a plain page of the requested height
    pub(crate) struct FakeCompiler {
        pub height: u32,
        pub calls: AtomicUsize,
        pub last_inputs: Mutex<Option<CompileInputs>>,
    }

    impl FakeCompiler {
        pub(crate) fn new(height: u32) -> Self {
            Self {
                height,
                calls: AtomicUsize::new(0),
                last_inputs: Mutex::new(None),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Compiler for FakeCompiler {
        fn compile(
            &self,
            _template: &Path,
            output: &Path,
            _font_paths: &[PathBuf],
            _ppi: f32,
            inputs: &CompileInputs,
        ) -> MenushotResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_inputs.lock().unwrap() = Some(inputs.clone());
            RgbaImage::from_pixel(6, self.height, Rgba([255, 255, 255, 255]))
                .save(output)
                .map_err(|e| MenushotError::CompileFailure(e.to_string()))
        }
    }

    struct FailingCompiler;

    impl Compiler for FailingCompiler {
        fn compile(
            &self,
            _template: &Path,
            _output: &Path,
            _font_paths: &[PathBuf],
            _ppi: f32,
            _inputs: &CompileInputs,
        ) -> MenushotResult<()> {
            Err(MenushotError::CompileFailure("unknown font family".into()))
        }
    }

    struct PanickingCompiler;

    impl Compiler for PanickingCompiler {
        fn compile(
            &self,
            _template: &Path,
            _output: &Path,
            _font_paths: &[PathBuf],
            _ppi: f32,
            _inputs: &CompileInputs,
        ) -> MenushotResult<()> {
            panic!("layout engine exploded")
        }
    }

    pub(crate) fn task_in(dir: &Path, is_temp: bool) -> RenderTask {
        let req_id = if is_temp { "abc123" } else { "static" };
        let png = if is_temp {
            dir.join("temp_abc123.png")
        } else {
            dir.join("cache_menu_command.png")
        };
        RenderTask {
            compiler: PathBuf::from("typst"),
            template_path: dir.join("base.typ"),
            font_paths: vec![dir.join("fonts")],
            json_str: r#"{"title":"Menu"}"#.to_string(),
            output_png_path: png,
            output_dir: dir.to_path_buf(),
            timestamp: "2026-01-01 00:00:00".to_string(),
            query: None,
            is_temp,
            req_id: req_id.to_string(),
            webp_limit: 1000,
            split_height: 400,
            ppi: 144.0,
        }
    }

    #[test]
    fn static_task_uses_png_stem() {
        let dir = TempDir::new().unwrap();
        let compiler = FakeCompiler::new(50);

        let outcome = execute_render_task(&task_in(dir.path(), false), &compiler);

        assert_eq!(
            outcome,
            WorkerOutcome::Completed {
                images: vec![dir.path().join("cache_menu_command.webp")]
            }
        );
    }

    #[test]
    fn temp_task_uses_request_id_stem() {
        let dir = TempDir::new().unwrap();
        let compiler = FakeCompiler::new(900);
        let mut task = task_in(dir.path(), true);
        task.webp_limit = 500;

        let images = execute_render_task(&task, &compiler).into_result().unwrap();

        assert_eq!(
            images,
            vec![
                dir.path().join("temp_abc123_part1.webp"),
                dir.path().join("temp_abc123_part2.webp"),
                dir.path().join("temp_abc123_part3.webp"),
            ]
        );
    }

    #[test]
    fn query_is_escaped_for_highlighting() {
        let dir = TempDir::new().unwrap();
        let compiler = FakeCompiler::new(10);
        let mut task = task_in(dir.path(), true);
        task.query = Some("a.b(c)".to_string());

        execute_render_task(&task, &compiler);

        let inputs = compiler.last_inputs.lock().unwrap().clone().unwrap();
        assert_eq!(inputs.query_regex.as_deref(), Some(r"a\.b\(c\)"));
        assert_eq!(inputs.timestamp, "2026-01-01 00:00:00");
    }

    #[test]
    fn compiler_error_becomes_failed_outcome() {
        let dir = TempDir::new().unwrap();

        let outcome = execute_render_task(&task_in(dir.path(), false), &FailingCompiler);

        match outcome {
            WorkerOutcome::Failed { error, trace } => {
                assert!(error.contains("unknown font family"));
                assert!(!trace.is_empty());
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn panic_is_contained() {
        let dir = TempDir::new().unwrap();

        let outcome = execute_render_task(&task_in(dir.path(), false), &PanickingCompiler);

        let err = outcome.into_result().unwrap_err();
        assert!(err.to_string().contains("layout engine exploded"));
    }

    #[test]
    fn outcome_wire_format() {
        let ok = WorkerOutcome::Completed {
            images: vec![PathBuf::from("/d/a.webp")],
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["images"][0], "/d/a.webp");

        let failed: WorkerOutcome =
            serde_json::from_str(r#"{"status":"failed","error":"e","trace":"t"}"#).unwrap();
        assert!(matches!(failed, WorkerOutcome::Failed { .. }));
    }

    #[test]
    fn serve_reports_bad_task_in_band() {
        let mut out = Vec::new();
        serve(&b"not json"[..], &mut out).unwrap();

        let outcome: WorkerOutcome = serde_json::from_slice(&out).unwrap();
        match outcome {
            WorkerOutcome::Failed { error, .. } => assert!(error.contains("invalid render task")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn serve_reports_missing_compiler_in_band() {
        let dir = TempDir::new().unwrap();
        let mut task = task_in(dir.path(), false);
        task.compiler = dir.path().join("no-such-typst");
        let input = serde_json::to_vec(&task).unwrap();

        let mut out = Vec::new();
        serve(&input[..], &mut out).unwrap();

        let outcome: WorkerOutcome = serde_json::from_slice(&out).unwrap();
        assert!(matches!(outcome, WorkerOutcome::Failed { .. }));
    }
}
