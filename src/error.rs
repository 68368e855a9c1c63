use std::fmt;

/// Result type for qdrive operations
pub type Result<T> = std::result::Result<T, QDriveError>;

/// Main error type for the qdrive library
#[derive(Debug, Clone, PartialEq)]
pub enum QDriveError {
    /// Input vector has the wrong length
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Layer width sequences (or layer counts) differ
    ArchitectureMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A single layer's weights or biases have the wrong shape
    ShapeMismatch {
        layer: usize,
        parameter: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Asked for more samples than the buffer holds
    InsufficientSamples {
        requested: usize,
        available: usize,
    },

    /// Invalid action
    InvalidAction {
        action: usize,
        max_actions: usize,
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

impl fmt::Display for QDriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QDriveError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            QDriveError::ArchitectureMismatch { expected, actual } => {
                write!(f, "Architecture mismatch: expected {:?}, got {:?}", expected, actual)
            }
            QDriveError::ShapeMismatch { layer, parameter, expected, actual } => {
                write!(
                    f,
                    "Shape mismatch at layer {} ({}): expected {:?}, got {:?}",
                    layer, parameter, expected, actual
                )
            }
            QDriveError::InsufficientSamples { requested, available } => {
                write!(f, "Cannot sample {} experiences, buffer holds {}", requested, available)
            }
            QDriveError::InvalidAction { action, max_actions } => {
                write!(f, "Invalid action {}: must be less than {}", action, max_actions)
            }
            QDriveError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            QDriveError::IoError(msg) => write!(f, "IO error: {}", msg),
            QDriveError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for QDriveError {}

// Conversion from std::io::Error
impl From<std::io::Error> for QDriveError {
    fn from(err: std::io::Error) -> Self {
        QDriveError::IoError(err.to_string())
    }
}

// Conversion from bincode::Error
impl From<bincode::Error> for QDriveError {
    fn from(err: bincode::Error) -> Self {
        QDriveError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for QDriveError {
    fn from(err: serde_json::Error) -> Self {
        QDriveError::SerializationError(err.to_string())
    }
}

// Helper functions for common error patterns
impl QDriveError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        QDriveError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        QDriveError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn shape_mismatch(layer: usize, parameter: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        QDriveError::ShapeMismatch {
            layer,
            parameter,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_names_layer() {
        let err = QDriveError::shape_mismatch(2, "weights", &[3, 4], &[4, 3]);
        let msg = err.to_string();
        assert!(msg.contains("layer 2"));
        assert!(msg.contains("weights"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: QDriveError = io.into();
        assert!(matches!(err, QDriveError::IoError(_)));
    }
}
