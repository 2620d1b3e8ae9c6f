//! External typesetting compiler
//!
//! The compiler is opaque and blocking. [`TypstCli`] drives the `typst`
//! executable; tests substitute their own [`Compiler`].

use crate::error::{MenushotError, MenushotResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Named inputs exposed to the template as `sys.inputs`
#[derive(Debug, Clone, PartialEq)]
pub struct CompileInputs {
    /// Layout payload; staged as a file, never passed on the command line
    pub json_string: String,
    pub timestamp: String,
    /// Regex-escaped search query for match highlighting
    pub query_regex: Option<String>,
}

impl CompileInputs {
    /// Small string inputs, in the order they are passed to the compiler
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![("timestamp", self.timestamp.as_str())];
        if let Some(ref regex) = self.query_regex {
            pairs.push(("query_regex", regex.as_str()));
        }
        pairs
    }
}

/// A blocking compiler producing one PNG page
pub trait Compiler: Send + Sync {
    fn compile(
        &self,
        template: &Path,
        output: &Path,
        font_paths: &[PathBuf],
        ppi: f32,
        inputs: &CompileInputs,
    ) -> MenushotResult<()>;
}

/// Where the layout payload is staged for one compilation
#[derive(Debug, Clone, PartialEq)]
pub struct StagedLayout {
    /// Absolute template path
    pub template: PathBuf,
    /// Payload file next to the output raster
    pub file: PathBuf,
    /// Project root covering both the template and the payload
    pub root: PathBuf,
    /// Payload path as the template sees it, rooted at `root`
    pub input_path: String,
}

impl StagedLayout {
    /// Stage next to `output` as `{stem}.input.json`
    pub fn plan(template: &Path, output: &Path) -> MenushotResult<Self> {
        let template = std::path::absolute(template)
            .map_err(|e| MenushotError::io(format!("resolving {}", template.display()), e))?;
        let file = std::path::absolute(output.with_extension("input.json"))
            .map_err(|e| MenushotError::io(format!("resolving {}", output.display()), e))?;

        let root = template
            .ancestors()
            .find(|dir| file.starts_with(dir))
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                MenushotError::CompileFailure(format!(
                    "{} and {} share no common root",
                    template.display(),
                    file.display()
                ))
            })?;

        let relative: Vec<String> = file
            .strip_prefix(&root)
            .map_err(|e| MenushotError::Internal(e.to_string()))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        Ok(Self {
            input_path: format!("/{}", relative.join("/")),
            template,
            file,
            root,
        })
    }
}

/// Compiler backed by the `typst` command line
///
/// The template reads the layout with `json(sys.inputs.json_path)`.
#[derive(Debug, Clone)]
pub struct TypstCli {
    binary: PathBuf,
}

impl TypstCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Build the full argument list for one compilation
    pub fn args(
        staged: &StagedLayout,
        output: &Path,
        font_paths: &[PathBuf],
        ppi: f32,
        inputs: &CompileInputs,
    ) -> Vec<String> {
        let mut args = vec![
            "compile".to_string(),
            staged.template.display().to_string(),
            output.display().to_string(),
            "--root".to_string(),
            staged.root.display().to_string(),
            "--format".to_string(),
            "png".to_string(),
            "--ppi".to_string(),
            ppi.to_string(),
        ];

        for dir in font_paths {
            args.push("--font-path".to_string());
            args.push(dir.display().to_string());
        }

        args.push("--input".to_string());
        args.push(format!("json_path={}", staged.input_path));
        for (key, value) in inputs.pairs() {
            args.push("--input".to_string());
            args.push(format!("{}={}", key, value));
        }

        args
    }

    fn run(&self, args: &[String]) -> MenushotResult<()> {
        let result = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                MenushotError::CompileFailure(format!(
                    "could not run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if result.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&result.stderr);
            Err(MenushotError::CompileFailure(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                result.status,
                stderr.trim()
            )))
        }
    }
}

impl Compiler for TypstCli {
    fn compile(
        &self,
        template: &Path,
        output: &Path,
        font_paths: &[PathBuf],
        ppi: f32,
        inputs: &CompileInputs,
    ) -> MenushotResult<()> {
        let staged = StagedLayout::plan(template, output)?;
        std::fs::write(&staged.file, &inputs.json_string).map_err(|e| {
            MenushotError::io(format!("staging layout {}", staged.file.display()), e)
        })?;

        let args = Self::args(&staged, output, font_paths, ppi, inputs);
        debug!(
            "Executing: {} compile {} ({} byte layout, {} font dirs)",
            self.binary.display(),
            staged.template.display(),
            inputs.json_string.len(),
            font_paths.len()
        );

        let result = self.run(&args);
        if let Err(e) = std::fs::remove_file(&staged.file) {
            warn!("Failed to remove {}: {}", staged.file.display(), e);
        }
        result
    }
}
