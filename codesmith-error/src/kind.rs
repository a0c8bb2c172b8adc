//! Error kinds for codesmith operations

use std::fmt;

/// The kind of error that occurred.
///
/// This enum categorizes errors to help users write clear error handling logic.
/// Users can match on ErrorKind to decide how to handle specific error cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// The requested feature or operation is not supported
    Unsupported,

    /// Invalid configuration or parameters
    ConfigInvalid,

    // =========================================================================
    // Inference errors
    // =========================================================================
    /// The API token environment variable is not set
    TokenMissing,

    /// The endpoint rejected the provided credentials
    AuthFailed,

    /// The inference call failed
    InferenceFailed,

    /// Network error reaching the inference endpoint
    NetworkFailed,

    /// Rate limit exceeded
    RateLimited,

    // =========================================================================
    // Plan/Audit errors
    // =========================================================================
    /// Failed to parse input
    ParseFailed,

    /// The audit stage rejected the plan
    AuditFailed,

    // =========================================================================
    // Sandbox errors
    // =========================================================================
    /// The child process could not be launched
    SandboxLaunchFailed,

    /// The child process exceeded the wall-clock timeout
    SandboxTimeout,

    /// The child process exited with a non-zero code
    SandboxFailed,

    // =========================================================================
    // Storage/IO errors
    // =========================================================================
    /// Storage operation failed
    StorageFailed,

    /// Serialization/deserialization failed
    SerializationFailed,

    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    // =========================================================================
    // Misc
    // =========================================================================
    /// Invalid argument passed to function
    InvalidArgument,

    /// Feature or operation not yet implemented
    NotImplemented,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::ConfigInvalid => "ConfigInvalid",

            // Inference
            ErrorKind::TokenMissing => "TokenMissing",
            ErrorKind::AuthFailed => "AuthFailed",
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",
            ErrorKind::RateLimited => "RateLimited",

            // Plan/Audit
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::AuditFailed => "AuditFailed",

            // Sandbox
            ErrorKind::SandboxLaunchFailed => "SandboxLaunchFailed",
            ErrorKind::SandboxTimeout => "SandboxTimeout",
            ErrorKind::SandboxFailed => "SandboxFailed",

            // Storage/IO
            ErrorKind::StorageFailed => "StorageFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",

            // Misc
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::NotImplemented => "NotImplemented",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::InferenceFailed
                | ErrorKind::NetworkFailed
                | ErrorKind::RateLimited
                | ErrorKind::SandboxTimeout
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
