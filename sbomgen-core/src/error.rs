//! Error types for core domain validation

use thiserror::Error;

/// Errors raised while validating domain objects
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A configuration payload failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration discriminator does not match the request type
    #[error("configuration type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Request type recorded on the request
        expected: String,
        /// Type carried by the configuration payload
        actual: String,
    },
}
