//! Error types for the warden control plane
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in warden
#[derive(Debug, Error)]
pub enum WardenError {
    /// Manual trigger referenced an unknown control loop
    #[error("Loop not found: {0}")]
    LoopNotFound(String),

    /// A loop with this id is already registered
    #[error("Duplicate loop: {0}")]
    DuplicateLoop(String),

    /// Loop specification rejected at registration
    #[error("Invalid spec: {0}")]
    InvalidSpec(String),

    /// Registry lifecycle misuse (started twice, triggered after stop, ...)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// External engine call failed (consensus, shard, resource, network)
    #[error("Engine error: {0}")]
    Engine(String),

    /// Ledger append failed; the audit record was not persisted
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Encrypting audit details failed; the record must not be written
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Configuration file missing, unparsable, or failed validation
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for warden operations
pub type Result<T> = std::result::Result<T, WardenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_not_found_error() {
        let err = WardenError::LoopNotFound("shard-scaling".to_string());
        assert_eq!(err.to_string(), "Loop not found: shard-scaling");
    }

    #[test]
    fn test_duplicate_loop_error() {
        let err = WardenError::DuplicateLoop("key-rotation".to_string());
        assert_eq!(err.to_string(), "Duplicate loop: key-rotation");
    }

    #[test]
    fn test_invalid_spec_error() {
        let err = WardenError::InvalidSpec("poll interval must be > 0".to_string());
        assert_eq!(err.to_string(), "Invalid spec: poll interval must be > 0");
    }

    #[test]
    fn test_engine_error() {
        let err = WardenError::Engine("rotate_key timed out".to_string());
        assert_eq!(err.to_string(), "Engine error: rotate_key timed out");
    }

    #[test]
    fn test_ledger_error() {
        let err = WardenError::Ledger("append refused".to_string());
        assert_eq!(err.to_string(), "Ledger error: append refused");
    }

    #[test]
    fn test_encryption_error() {
        let err = WardenError::Encryption("key unavailable".to_string());
        assert_eq!(err.to_string(), "Encryption error: key unavailable");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: WardenError = io_err.into();
        assert!(matches!(err, WardenError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: WardenError = json_err.into();
        assert!(matches!(err, WardenError::Json(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(WardenError::InvalidState("test".to_string()))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}
