//! Error handling for audiolab
//!
//! Every error belongs to one of four kinds (validation, not-found, capacity,
//! processing) and carries recovery suggestions for the caller.

use thiserror::Error;

/// Result type alias for audiolab operations
pub type Result<T> = std::result::Result<T, LabError>;

/// Coarse error classification surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad request: parameters, trim window, format, corrupt input
    Validation,
    /// Unknown or expired asset
    NotFound,
    /// Registry full, upload too large, job queue saturated
    Capacity,
    /// Unexpected failure while transforming or encoding
    Processing,
}

/// Main error type for audiolab operations
#[derive(Error, Debug)]
pub enum LabError {
    // Validation Errors
    #[error("Invalid parameter '{param}': got {value}, expected {expected}")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Invalid trim window: {reason}")]
    InvalidTrimWindow { reason: String },

    #[error("Invalid audio buffer: {reason}")]
    InvalidBuffer { reason: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Corrupt audio input: {reason}")]
    CorruptInput {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Lookup Errors
    #[error("Asset not found or no longer available: {id}")]
    AssetNotFound { id: String },

    // Capacity Errors
    #[error("Upload too large: {size_bytes} bytes (limit {limit_bytes} bytes)")]
    UploadTooLarge { size_bytes: usize, limit_bytes: usize },

    #[error("Registry full: {reason}")]
    RegistryFull { reason: String },

    #[error("Too many concurrent jobs: no slot freed within {waited_ms} ms")]
    QueueSaturated { waited_ms: u64 },

    #[error("Effect '{effect}' would add {extra_secs:.1} s of audio (limit {limit_secs} s)")]
    OutputTooLong {
        effect: String,
        extra_secs: f64,
        limit_secs: f64,
    },

    // Processing Errors
    #[error("Processing error: {reason}")]
    ProcessingError { reason: String },

    #[error("Effect '{effect}' produced invalid audio (NaN/Inf)")]
    NonFiniteOutput { effect: String },

    #[error("Encoding failed: {reason}")]
    EncodeError { reason: String },

    #[error("Rendering failed: {reason}")]
    RenderError { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LabError {
    /// Build an `InvalidParameter` error
    pub fn invalid_param(param: &str, value: impl ToString, expected: &str) -> Self {
        LabError::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Build a `ProcessingError`
    pub fn processing(reason: impl Into<String>) -> Self {
        LabError::ProcessingError {
            reason: reason.into(),
        }
    }

    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LabError::InvalidParameter { .. }
            | LabError::InvalidRequest { .. }
            | LabError::InvalidTrimWindow { .. }
            | LabError::InvalidBuffer { .. }
            | LabError::UnsupportedFormat { .. }
            | LabError::CorruptInput { .. }
            | LabError::InvalidConfig { .. }
            | LabError::Serialization(_) => ErrorKind::Validation,
            LabError::AssetNotFound { .. } => ErrorKind::NotFound,
            LabError::UploadTooLarge { .. }
            | LabError::RegistryFull { .. }
            | LabError::QueueSaturated { .. }
            | LabError::OutputTooLong { .. } => ErrorKind::Capacity,
            LabError::ProcessingError { .. }
            | LabError::NonFiniteOutput { .. }
            | LabError::EncodeError { .. }
            | LabError::RenderError { .. }
            | LabError::Io(_) => ErrorKind::Processing,
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            LabError::InvalidParameter { .. } => "INVALID_PARAMETER",
            LabError::InvalidRequest { .. } => "INVALID_REQUEST",
            LabError::InvalidTrimWindow { .. } => "INVALID_TRIM_WINDOW",
            LabError::InvalidBuffer { .. } => "INVALID_BUFFER",
            LabError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            LabError::CorruptInput { .. } => "CORRUPT_INPUT",
            LabError::InvalidConfig { .. } => "INVALID_CONFIG",
            LabError::AssetNotFound { .. } => "ASSET_NOT_FOUND",
            LabError::UploadTooLarge { .. } => "UPLOAD_TOO_LARGE",
            LabError::RegistryFull { .. } => "REGISTRY_FULL",
            LabError::QueueSaturated { .. } => "QUEUE_SATURATED",
            LabError::OutputTooLong { .. } => "OUTPUT_TOO_LONG",
            LabError::ProcessingError { .. } => "PROCESSING_ERROR",
            LabError::NonFiniteOutput { .. } => "NON_FINITE_OUTPUT",
            LabError::EncodeError { .. } => "ENCODE_ERROR",
            LabError::RenderError { .. } => "RENDER_ERROR",
            LabError::Io(_) => "IO_ERROR",
            LabError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LabError::InvalidParameter { .. } => vec![
                "Check the parameter against the ranges listed by 'audiolab-cli effects'",
            ],
            LabError::InvalidTrimWindow { .. } => vec![
                "Make sure start is before end",
                "Both bounds must lie within the clip duration",
            ],
            LabError::UnsupportedFormat { .. } => vec![
                "Supported uploads: MP3, WAV, OGG, FLAC, M4A",
                "Convert the file to WAV and try again",
            ],
            LabError::CorruptInput { .. } => vec![
                "Check if the file plays in another application",
                "The file may be corrupted - try re-exporting from source",
            ],
            LabError::AssetNotFound { .. } => vec![
                "Uploaded and processed files expire after a while",
                "Upload the file again",
            ],
            LabError::UploadTooLarge { .. } => vec![
                "Upload a shorter clip",
                "Trim the audio before uploading",
            ],
            LabError::RegistryFull { .. } | LabError::QueueSaturated { .. } => vec![
                "The server is busy - wait a moment and try again",
            ],
            LabError::OutputTooLong { .. } => vec![
                "Shorten the echo delay or lower the decay",
            ],
            LabError::NonFiniteOutput { .. } => vec![
                "The effect settings may be too extreme",
                "Try reducing the effect intensity",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = LabError::AssetNotFound {
            id: "abc".to_string(),
        };
        assert_eq!(err.error_code(), "ASSET_NOT_FOUND");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            LabError::invalid_param("semitones", 13.0, "-12 to +12").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LabError::UploadTooLarge {
                size_bytes: 10,
                limit_bytes: 5
            }
            .kind(),
            ErrorKind::Capacity
        );
        assert_eq!(LabError::processing("boom").kind(), ErrorKind::Processing);
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = LabError::InvalidTrimWindow {
            reason: "end before start".to_string(),
        };
        assert!(!err.recovery_suggestions().is_empty());
        assert!(err.to_string().contains("end before start"));
    }
}
