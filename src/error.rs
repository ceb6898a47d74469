use std::fmt;

/// Result type for snakeq operations
pub type Result<T> = std::result::Result<T, SnakeQError>;

/// Main error type for the snakeq library
#[derive(Debug, Clone)]
pub enum SnakeQError {
    /// Checkpoint or tensor dimensions disagree with the constructed architecture
    ShapeMismatch {
        expected: String,
        actual: String,
    },

    /// Transplant enumerated a different number of weighted layers on each side
    LayerCountMismatch {
        source: usize,
        target: usize,
    },

    /// Transplant encountered a weighted layer kind it cannot convert
    UnsupportedLayerKind(String),

    /// Interchange export failed; carries the underlying cause
    ExportFailure(Box<SnakeQError>),

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// IO errors (file operations)
    IoError(String),

    /// Serialization/deserialization errors
    SerializationError(String),

    /// Numerical computation errors
    NumericalError(String),

    /// Empty buffer or container
    EmptyBuffer(String),
}

impl fmt::Display for SnakeQError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnakeQError::ShapeMismatch { expected, actual } => {
                write!(f, "Shape mismatch: expected {}, got {}", expected, actual)
            }
            SnakeQError::LayerCountMismatch { source, target } => {
                write!(
                    f,
                    "Layer count mismatch: source has {} weighted layers, target has {}",
                    source, target
                )
            }
            SnakeQError::UnsupportedLayerKind(kind) => {
                write!(f, "Unsupported layer kind: {}", kind)
            }
            SnakeQError::ExportFailure(cause) => write!(f, "Export failed: {}", cause),
            SnakeQError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            SnakeQError::IoError(msg) => write!(f, "IO error: {}", msg),
            SnakeQError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            SnakeQError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            SnakeQError::EmptyBuffer(msg) => write!(f, "Empty buffer: {}", msg),
        }
    }
}

impl std::error::Error for SnakeQError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnakeQError::ExportFailure(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for SnakeQError {
    fn from(err: std::io::Error) -> Self {
        SnakeQError::IoError(err.to_string())
    }
}

// Conversion from bincode::Error
impl From<bincode::Error> for SnakeQError {
    fn from(err: bincode::Error) -> Self {
        SnakeQError::SerializationError(err.to_string())
    }
}

// Helper functions for common error patterns
impl SnakeQError {
    pub fn shape_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        SnakeQError::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        SnakeQError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn export_failure(cause: SnakeQError) -> Self {
        SnakeQError::ExportFailure(Box::new(cause))
    }
}
