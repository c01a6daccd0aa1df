//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`PoseError`] covers all failure modes including:
//! - Asset loading and parsing errors (OBJ, morph targets, rigs, weights)
//! - Shape solving failures (invalid parameters, degenerate skeletons)
//! - Pose transport errors (network, HTTP status, malformed payloads)
//! - Persisted state (de)serialization errors
//! - Preview image decoding for batch export
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, PoseError>`.
//!
//! ```rust,ignore
//! use pose_studio::errors::{PoseError, Result};
//!
//! fn solve() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the pose studio.
///
/// Each variant names the subsystem that failed so that callers can decide
/// whether the failure is recoverable (transport) or must be surfaced to the
/// user (solve failure).
#[derive(Error, Debug)]
pub enum PoseError {
    // ========================================================================
    // Asset Loading Errors
    // ========================================================================
    /// The requested asset was not found.
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// An asset file could not be parsed.
    #[error("Failed to parse {kind} asset '{path}' (line {line}): {message}")]
    AssetParse {
        /// Asset kind (`obj`, `target`, `rig`, `weights`)
        kind: &'static str,
        /// Source path or label
        path: String,
        /// 1-based line number, 0 when not line oriented
        line: usize,
        /// Human readable reason
        message: String,
    },

    /// An index inside an asset points outside the data it refers to.
    #[error("Asset index out of bounds: {context} (index: {index}, len: {len})")]
    AssetIndexOutOfBounds {
        /// Description of what was being accessed
        context: String,
        /// The invalid index
        index: usize,
        /// Length of the indexed collection
        len: usize,
    },

    // ========================================================================
    // Solve Errors
    // ========================================================================
    /// Shape parameters are malformed or outside their documented range.
    #[error("Invalid shape parameter '{name}': {value}")]
    InvalidShape {
        /// Parameter name as it appears on the wire
        name: &'static str,
        /// Offending value
        value: f32,
    },

    /// The skeleton cannot be built (empty rig, no root, cyclic parents).
    #[error("Degenerate skeleton: {0}")]
    DegenerateSkeleton(String),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Network-level failure (connection refused, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP response error with status code.
    #[error("HTTP response error: status {status}")]
    HttpResponseError {
        /// HTTP status code
        status: u16,
    },

    /// The server answered with `status: "error"`.
    #[error("Server rejected pose request: {0}")]
    Rejected(String),

    /// The transport side of the response channel was dropped.
    #[error("Pose client is disposed")]
    Disposed,

    // ========================================================================
    // Format & Parsing Errors
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Base64 decoding error.
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    /// A data URL did not have the expected `data:<mime>;base64,` shape.
    #[error("Data URI error: {0}")]
    DataUriError(String),

    // ========================================================================
    // Image Errors
    // ========================================================================
    /// Preview image decoding or encoding error.
    #[error("Image error: {0}")]
    ImageError(String),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for PoseError {
    fn from(err: image::ImageError) -> Self {
        PoseError::ImageError(err.to_string())
    }
}

impl PoseError {
    pub(crate) fn parse(kind: &'static str, path: &str, line: usize, message: impl Into<String>) -> Self {
        Self::AssetParse {
            kind,
            path: path.to_string(),
            line,
            message: message.into(),
        }
    }

    /// Returns `true` for failures that are worth retrying on the next user
    /// action (network and HTTP errors).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::HttpResponseError { .. })
    }
}

/// Alias for `Result<T, PoseError>`.
pub type Result<T> = std::result::Result<T, PoseError>;
