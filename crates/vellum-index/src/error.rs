//! Error types for vellum-index.

use thiserror::Error;

/// Result type for vellum-index operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vellum-index operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Collection already exists.
    #[error("Collection '{0}' already exists")]
    CollectionExists(String),

    /// Collection not found.
    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    /// Vector not found.
    #[error("Vector '{0}' not found")]
    VectorNotFound(String),

    /// Dimension mismatch between a vector and its collection.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensions the collection was created with.
        expected: usize,
        /// Dimensions of the offending vector.
        actual: usize,
    },

    /// Invalid vector (empty, NaN, Inf).
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// Persistence error (I/O, serialization).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
