//! Error types for Menushot
//!
//! All modules use `MenushotResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Menushot operations
pub type MenushotResult<T> = Result<T, MenushotError>;

/// All errors that can occur in Menushot
#[derive(Error, Debug)]
pub enum MenushotError {
    // Data provider errors
    #[error("Catalog analysis timed out after {secs}s, the catalog may be too large")]
    ProviderTimeout { secs: f64 },

    #[error("Nothing to display")]
    EmptyResult,

    #[error("Catalog provider failed: {0}")]
    Provider(String),

    // Compile errors
    #[error("Compilation failed: {0}")]
    CompileFailure(String),

    #[error("Compilation timed out after {secs}s")]
    CompileTimeout { secs: f64 },

    #[error("Failed to start render worker {program}: {source}")]
    WorkerSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Post-processing errors
    #[error("Rendering produced no image files")]
    NoImageGenerated,

    #[error("Image processing failed: {0}")]
    PostProcess(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Interrupted")]
    Interrupted,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MenushotError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this is the "nothing to show" condition rather than a failure
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Self::EmptyResult)
    }

    /// Whether this error invalidates the static cache record
    ///
    /// Provider timeouts and empty catalogs abort before any cache file is
    /// touched, so the record stays as it was.
    pub fn rolls_back_cache(&self) -> bool {
        !matches!(self, Self::ProviderTimeout { .. } | Self::EmptyResult)
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::WorkerSpawn { .. } => Some("Check that the menushot binary is still installed"),
            Self::CompileFailure(_) => Some("Check [compiler] binary and [paths] template/font_dirs"),
            Self::CompileTimeout { .. } => {
                Some("Raise rendering.timeout_compile_secs or unset it to disable the bound")
            }
            Self::ProviderTimeout { .. } => Some("Raise rendering.timeout_analysis_secs"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = MenushotError::ProviderTimeout { secs: 30.0 };
        assert!(err.to_string().contains("timed out after 30s"));
    }

    #[test]
    fn empty_result_is_distinguished() {
        assert!(MenushotError::EmptyResult.is_empty_result());
        assert!(!MenushotError::NoImageGenerated.is_empty_result());
        assert!(!MenushotError::CompileFailure("boom".into()).is_empty_result());
    }

    #[test]
    fn rollback_policy() {
        assert!(MenushotError::NoImageGenerated.rolls_back_cache());
        assert!(MenushotError::PostProcess("bad".into()).rolls_back_cache());
        assert!(!MenushotError::EmptyResult.rolls_back_cache());
        assert!(!MenushotError::ProviderTimeout { secs: 1.0 }.rolls_back_cache());
    }

    #[test]
    fn error_hint() {
        let err = MenushotError::ProviderTimeout { secs: 1.0 };
        assert_eq!(err.hint(), Some("Raise rendering.timeout_analysis_secs"));
        assert_eq!(MenushotError::EmptyResult.hint(), None);
    }
}
