//! Engine error types
//!
//! Re-exports codesmith-error and provides engine-specific conveniences.

// Re-export the core error types
pub use codesmith_error::{Error, ErrorKind, ErrorStatus, Result};

// =============================================================================
// Engine-specific error constructors
// =============================================================================

/// Create a TokenMissing error
pub fn token_missing(var: impl Into<String>) -> Error {
    Error::token_missing(var)
}

/// Create an InferenceFailed error
pub fn inference_failed(reason: impl Into<String>) -> Error {
    Error::inference_failed(reason)
}

/// Create a NetworkFailed error
pub fn network_failed(reason: impl Into<String>) -> Error {
    Error::new(ErrorKind::NetworkFailed, reason)
}

/// Create a RateLimited error
pub fn rate_limited() -> Error {
    Error::new(ErrorKind::RateLimited, "inference endpoint rate limit exceeded")
}

/// Create an AuthFailed error
pub fn auth_failed() -> Error {
    Error::new(ErrorKind::AuthFailed, "inference endpoint rejected the token")
}

/// Create a ParseFailed error
pub fn parse_error(message: impl Into<String>) -> Error {
    Error::parse_failed(message)
}

/// Create a SandboxTimeout error
pub fn sandbox_timeout(secs: u64) -> Error {
    Error::sandbox_timeout(secs)
}

/// Create a SandboxLaunchFailed error
pub fn sandbox_launch_failed(reason: impl Into<String>) -> Error {
    Error::sandbox_launch_failed(reason)
}

/// Create an IoError error
pub fn io_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::IoFailed, message)
}

/// Create a SerializationError error
pub fn serialization_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::SerializationFailed, message)
}

/// Create a StorageFailed error
pub fn storage_failed(reason: impl Into<String>) -> Error {
    Error::new(ErrorKind::StorageFailed, reason)
}

/// Create an InvalidArgument error
pub fn invalid_argument(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidArgument, message)
}
