//! Error types for todopaper.
//!
//! This module defines the error types used throughout the engine crate.
//! Each variant of [`EngineError`] maps to one way a render cycle can end
//! early; none of them stop the scheduler.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::watcher::WatcherError;

/// Errors that can occur during engine operations.
///
/// # Examples
///
/// ```ignore
/// use todopaper_engine::error::EngineError;
///
/// fn check(todos: &[TodoItem]) -> Result<(), EngineError> {
///     if todos.is_empty() {
///         return Err(EngineError::NothingToRender);
///     }
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum EngineError {
    /// The to-do file does not exist. Callers treat this as "no todos".
    #[error("to-do file not found: {0}")]
    NotFound(PathBuf),

    /// The base image could not be opened. Aborts the current render only.
    #[error("asset missing: {path}: {reason}")]
    AssetMissing { path: PathBuf, reason: String },

    /// An external weather or timetable fetch failed or timed out.
    ///
    /// Fetch failures never end a render. The pipeline logs them in this
    /// form and draws placeholder text instead.
    #[error("fetch failed: {0}")]
    FetchFailed(#[from] FetchError),

    /// All text blocks are empty; the previous wallpaper is kept.
    #[error("nothing to render")]
    NothingToRender,

    /// Applying the wallpaper failed. The image stays on disk.
    #[error("wallpaper sink failed: {0}")]
    SinkFailed(String),

    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding or decoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The to-do file could not be watched.
    #[error("file watch error: {0}")]
    Watch(#[from] WatcherError),
}

/// Errors raised by the external weather and timetable collaborators.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request failed or timed out.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error status.
    #[error("server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// A JSON-RPC call returned an error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// A required setting is missing.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// The response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
