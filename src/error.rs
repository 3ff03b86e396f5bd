//! Error types for AtlasMob
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using MobError
pub type Result<T> = std::result::Result<T, MobError>;

/// Unified error type for AtlasMob operations
#[derive(Debug, Error)]
pub enum MobError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Reference Errors
    // -------------------------------------------------------------------------
    /// Reference bytes could not be decoded (too short, not UTF-8, bad path)
    #[error("Invalid MOB reference: {0}")]
    Encoding(String),

    /// The referenced MOB file, or the entry inside it, does not exist
    #[error("MOB target not found: {0}")]
    TargetNotFound(String),

    // -------------------------------------------------------------------------
    // MOB File Errors
    // -------------------------------------------------------------------------
    /// Target path already holds a different file
    #[error("Commit conflict: {target} already exists with different content")]
    CommitConflict { target: PathBuf },

    /// Cell appended out of ascending key order
    #[error("Write order violation: {0}")]
    WriteOrderViolation(String),

    /// On-disk data disagrees with what was recorded for it
    #[error("Corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MobError {
    /// True for misses that a lenient read path may degrade to an empty value
    pub fn is_not_found(&self) -> bool {
        match self {
            MobError::TargetNotFound(_) => true,
            MobError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<bincode::Error> for MobError {
    fn from(e: bincode::Error) -> Self {
        MobError::Serialization(e.to_string())
    }
}
