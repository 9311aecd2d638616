//! Error Types
//!
//! This module defines the error types used throughout Strata.
//!
//! # Overview
//!
//! The main error type [`StrataError`] covers all failure modes including:
//! - Bucket storage allocation failures (fatal for the frame)
//! - Invalid resolutions and layer counts
//! - Shader template failures (recoverable during reloads)
//! - Configuration parsing and I/O errors
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, StrataError>`.
//!
//! ```rust,ignore
//! use strata_core::errors::{StrataError, Result};
//!
//! fn allocate() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for Strata.
#[derive(Error, Debug)]
pub enum StrataError {
    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// Bucket or target storage could not be allocated.
    #[error("Failed to allocate {what}: {requested} entries")]
    AllocationFailed {
        /// Which resource was being allocated
        what: &'static str,
        /// Number of entries requested
        requested: usize,
    },

    /// A zero-sized resolution was requested.
    #[error("Invalid resolution {width}x{height}")]
    InvalidResolution {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },

    /// The per-pixel layer count is outside the supported range.
    #[error("Invalid layer count {requested}: must be in 1..={max}")]
    InvalidLayerCount {
        /// Requested number of layers
        requested: usize,
        /// Largest supported number of layers
        max: usize,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Gather or resolve was invoked before `create`.
    #[error("OIT storage has not been created")]
    NotCreated,

    /// A target handed to a pass does not match the current resolution.
    #[error("Target size mismatch: expected {expected:?}, got {actual:?}")]
    TargetSizeMismatch {
        /// Resolution of the bucket storage
        expected: (u32, u32),
        /// Resolution of the supplied target
        actual: (u32, u32),
    },

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// A shader template failed to load or render.
    #[error("Shader template error in '{template}': {message}")]
    ShaderTemplate {
        /// Template name
        template: String,
        /// Message reported by the template engine
        message: String,
    },

    // ========================================================================
    // Configuration & I/O Errors
    // ========================================================================
    /// Configuration JSON could not be parsed.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Alias for `Result<T, StrataError>`.
pub type Result<T> = std::result::Result<T, StrataError>;
