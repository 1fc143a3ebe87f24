use std::fmt;

/// Result type for DDPG operations
pub type Result<T> = std::result::Result<T, DdpgError>;

/// Main error type for the crate
#[derive(Debug, Clone, PartialEq)]
pub enum DdpgError {
    /// Replay buffer holds fewer transitions than a sample asked for
    InsufficientData {
        requested: usize,
        available: usize,
    },

    /// Invalid dimensions for operations
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// IO errors (file operations)
    IoError(String),

    /// Serialization/deserialization errors
    SerializationError(String),
}

impl fmt::Display for DdpgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DdpgError::InsufficientData { requested, available } => {
                write!(f, "Insufficient data: requested {} transitions, buffer holds {}", requested, available)
            }
            DdpgError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            DdpgError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            DdpgError::IoError(msg) => write!(f, "IO error: {}", msg),
            DdpgError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for DdpgError {}

impl From<std::io::Error> for DdpgError {
    fn from(err: std::io::Error) -> Self {
        DdpgError::IoError(err.to_string())
    }
}

impl From<bincode::Error> for DdpgError {
    fn from(err: bincode::Error) -> Self {
        DdpgError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for DdpgError {
    fn from(err: serde_json::Error) -> Self {
        DdpgError::SerializationError(err.to_string())
    }
}

// Helper functions for common error patterns
impl DdpgError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        DdpgError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        DdpgError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
