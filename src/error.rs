//! # Error Types
//!
//! This module defines error types used throughout the laurea library.

use thiserror::Error;

/// Main error type for laurea operations
#[derive(Debug, Error)]
pub enum LaureaError {
    /// Malformed element data on add/update
    #[error("Invalid element: {0}")]
    Validation(String),

    /// Batch generation started with an empty design
    #[error("The design has no elements")]
    EmptyDesign,

    /// Batch generation started with an empty dataset
    #[error("The dataset has no rows")]
    NoData,

    /// Dataset import / parsing error
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Rasterization or page-encoding failure
    #[error("Render error: {0}")]
    Render(String),

    /// Point balance too low to cover the batch; checked before rendering starts
    #[error("Insufficient points: the batch costs {required} but only {available} are available")]
    InsufficientPoints { required: u64, available: u64 },

    /// Generation was cancelled between rows
    #[error("Generation cancelled")]
    Cancelled,

    /// Archive packaging error
    #[error("Archive error: {0}")]
    Archive(String),

    /// Image fetching / decoding error
    #[error("Image error: {0}")]
    Image(String),

    /// HTTP server error
    #[error("Server error: {0}")]
    Server(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
