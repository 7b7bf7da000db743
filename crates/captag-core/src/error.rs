//! Error types for captag.
//!
//! Configuration errors are fatal and raised before any image is touched.
//! Pipeline errors are per-image: the batch loop logs them and moves on.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for captag operations.
#[derive(Error, Debug)]
pub enum CaptagError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Tag catalog could not be read
    #[error("Failed to read tag catalog {path}: {message}")]
    CatalogRead { path: PathBuf, message: String },

    /// Tag catalog header is not `tag_id|id, name, category`
    #[error("Unexpected tag catalog header in {path}: {header:?}")]
    CatalogHeader { path: PathBuf, header: Vec<String> },

    /// Tag replacement list is malformed
    #[error("Tag replacement must be in the format `source,target`: {0:?}")]
    TagReplacement(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A required model artifact is missing on disk
    #[error("Model file not found: {path}. Run `captag models download` first.")]
    ModelNotFound { path: PathBuf },

    /// Model loading or session-level failure
    #[error("Model error: {message}")]
    Model { message: String },

    /// Tagger inference failed
    #[error("Tagging failed for {path}: {message}")]
    Tagging { path: PathBuf, message: String },

    /// Caption model call failed
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        status_code: Option<u16>,
    },

    /// Reading or writing a caption file failed
    #[error("Caption file error for {path}: {source}")]
    CaptionFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for captag results.
pub type Result<T> = std::result::Result<T, CaptagError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
