// Error types for the VibeCheck core

use thiserror::Error;

/// Main error type for the VibeCheck core.
///
/// The stabilizer and trigger never fail on their own; every variant wraps
/// a failure reported by an external collaborator.
#[derive(Debug, Error)]
pub enum VibeCheckError {
    #[error("Face detection failed: {0}")]
    FaceDetection(String),

    #[error("Emotion classification failed: {0}")]
    Classification(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for VibeCheck operations.
pub type Result<T> = std::result::Result<T, VibeCheckError>;
