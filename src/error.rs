//! Error types for the VFIO classifier
//!
//! Provides structured error types for group-path handling, group member
//! inspection, and configuration loading.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unified error type for the classifier
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Group Errors
    // =========================================================================
    #[error("Invalid IOMMU group path: {}", .path.display())]
    InvalidGroupPath { path: PathBuf },

    #[error("Failed to list IOMMU group devices at {}: {source}", .path.display())]
    GroupListing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Member Errors
    // =========================================================================
    #[error("Failed to read class for {}, error: {source}", .path.display())]
    ClassCodeRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Class code resolution for mediated devices is not yet supported ({})", .path.display())]
    MediatedUnsupported { path: PathBuf },

    #[error("Malformed device identifier {}: {reason}", .path.display())]
    MalformedIdentifier { path: PathBuf, reason: String },

    #[error("Unrecognized device identifier format: {}", .path.display())]
    UnrecognizedIdentifier { path: PathBuf },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl Error {
    /// Check if this error aborts a group scan outright.
    ///
    /// Member-level errors are recorded and the scan moves on; everything
    /// else ends the call.
    pub fn is_fatal(&self) -> bool {
        self.member_path().is_none()
    }

    /// Path of the group member this error was recorded for, if any
    pub fn member_path(&self) -> Option<&Path> {
        match self {
            Error::ClassCodeRead { path, .. }
            | Error::MediatedUnsupported { path }
            | Error::MalformedIdentifier { path, .. }
            | Error::UnrecognizedIdentifier { path } => Some(path.as_path()),
            _ => None,
        }
    }
}

/// Result type alias for the classifier
pub type Result<T> = std::result::Result<T, Error>;
