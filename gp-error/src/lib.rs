//! Unified error handling for gprov
//!
//! This crate provides a single error type used across all gprov components.
//! It uses thiserror for ergonomic error definitions with proper Display and Error trait impls.

use std::io;
use std::path::PathBuf;

/// Result type alias using GprovError
pub type Result<T> = std::result::Result<T, GprovError>;

/// Unified error type for all gprov operations
#[derive(thiserror::Error, Debug)]
pub enum GprovError {
    // ============================================================================
    // I/O and Document Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Registry Errors
    // ============================================================================
    #[error("Registry document error: {0}")]
    Registry(String),

    #[error("Duplicate code name in registry: {0}")]
    DuplicateCodeName(String),

    #[error("Invalid match pattern {pattern:?} for {code_name}: {reason}")]
    BadPattern {
        code_name: String,
        pattern: String,
        reason: String,
    },

    #[error("Unknown code name: {0}")]
    UnknownCodeName(String),

    // ============================================================================
    // Identification Errors
    // ============================================================================
    #[error("Fallback identification failed: {0}")]
    FallbackFailed(String),

    #[error("Platform not identified")]
    NotIdentified,

    // ============================================================================
    // Specification Errors
    // ============================================================================
    #[error("Specification error: {0}")]
    Spec(String),

    #[error("Invalid identity field key {key:?}: {reason}")]
    BadFieldKey {
        key: String,
        reason: String,
    },

    #[error("Storage alternatives have uneven disk counts: {counts:?}")]
    UnevenAlternatives {
        counts: Vec<usize>,
    },

    #[error("Storage alternative {index} is empty")]
    EmptyAlternative {
        index: usize,
    },

    #[error("No main-storage alternatives defined")]
    NoAlternatives,

    #[error("Recovery media too small: {size_mb} MB (floor {floor_mb} MB)")]
    RecoveryTooSmall {
        size_mb: u64,
        floor_mb: u64,
    },

    // ============================================================================
    // Detection Errors
    // ============================================================================
    #[error("Detector failed for {domain}: {reason}")]
    DetectorFailed {
        domain: String,
        reason: String,
    },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Generic(String),
}

impl GprovError {
    /// Create a registry error from a string
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a specification error from a string
    pub fn spec(msg: impl Into<String>) -> Self {
        Self::Spec(msg.into())
    }

    /// Create a detector error
    pub fn detector(domain: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DetectorFailed {
            domain: domain.into(),
            reason: reason.into(),
        }
    }
}

// Allow converting from String to GprovError
impl From<String> for GprovError {
    fn from(s: String) -> Self {
        Self::Generic(s)
    }
}

// Allow converting from &str to GprovError
impl From<&str> for GprovError {
    fn from(s: &str) -> Self {
        Self::Generic(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_conversions_yield_generic() {
        let err: GprovError = "detection backend offline".into();
        assert!(matches!(err, GprovError::Generic(_)));
        assert_eq!(err.to_string(), "detection backend offline");

        let err = GprovError::from("bad state".to_string());
        assert!(matches!(err, GprovError::Generic(_)));
    }

    #[test]
    fn test_detector_helper_formats_domain() {
        let err = GprovError::detector("storage", "lsblk returned no devices");
        assert_eq!(
            err.to_string(),
            "Detector failed for storage: lsblk returned no devices"
        );
    }
}
