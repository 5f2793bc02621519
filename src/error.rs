//! Error types for the media watermark library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the media watermark library
#[derive(Error, Debug)]
pub enum Error {
    /// Settings file exists but could not be read or parsed
    #[error("Failed to load settings from {}: {source}", .path.display())]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Settings file could not be written
    #[error("Failed to write settings to {}: {source}", .path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A known setting was given a value of the wrong shape
    #[error("Invalid value for setting '{key}': {value}")]
    InvalidSetting { key: String, value: String },

    /// Font or watermark image failure
    #[error("Render error: {0}")]
    Render(String),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// External tool could not be started
    #[error("External tool not found: {}", .0.display())]
    ToolNotFound(PathBuf),

    /// External tool exited with a nonzero status
    #[error("{tool} exited with code {}: {stderr}", .code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    ExternalTool {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// External tool exceeded its time budget and was killed
    #[error("{tool} did not finish within {seconds}s")]
    ToolTimeout { tool: String, seconds: u64 },

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Input is neither a supported video nor a PDF
    #[error("Unsupported media type: {}", .0.display())]
    UnsupportedMedia(PathBuf),
}

impl Error {
    /// Short machine-readable reason code, stable across message wording changes.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::ConfigLoad { .. } => "config_load",
            Error::ConfigWrite { .. } => "config_write",
            Error::InvalidSetting { .. } => "invalid_setting",
            Error::Render(_) | Error::Image(_) => "render",
            Error::ToolNotFound(_) => "tool_not_found",
            Error::ExternalTool { .. } => "external_tool",
            Error::ToolTimeout { .. } => "tool_timeout",
            Error::Pdf(_) | Error::EmptyPdf(_) => "pdf",
            Error::Io(_) => "io",
            Error::FileNotFound(_) => "file_not_found",
            Error::UnsupportedMedia(_) => "unsupported_media",
        }
    }
}
