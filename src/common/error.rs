//! Error handling primitives shared across the crate.
//!
//! Every failure ends up in front of a human (HTML page, JSON body or CLI), so
//! the variants carry enough context to render a readable message.

use std::path::PathBuf;

use thiserror::Error;

/// Stable error codes surfaced in JSON responses and process exit paths.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// Artifact, scaler or feature list could not be located or decoded.
    ArtifactLoad = 1,
    /// Feature vector does not match the classifier arity.
    SchemaMismatch = 2,
    /// The classifier failed to produce a usable output.
    Inference = 3,
    /// Form or CLI input failed validation.
    InvalidInput = 4,
    /// Catch-all for IO failures outside of artifact loading.
    Internal = 5,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ArtifactLoad => "artifact_load",
            ErrorCode::SchemaMismatch => "schema_mismatch",
            ErrorCode::Inference => "inference",
            ErrorCode::InvalidInput => "invalid_input",
            ErrorCode::Internal => "internal",
        }
    }
}

/// Canonical error type for the crate.
#[derive(Debug, Error)]
pub enum EligibilityError {
    #[error("failed to load artifact {}: {reason}", path.display())]
    ArtifactLoad { path: PathBuf, reason: String },

    #[error("the model expects {expected} features, but {got} were provided")]
    SchemaMismatch { expected: usize, got: usize },

    #[error("prediction failed: {0}")]
    Inference(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type EligibilityResult<T> = Result<T, EligibilityError>;

impl EligibilityError {
    /// Artifact load helper.
    pub fn artifact(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ArtifactLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Validation helper.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Inference helper.
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ArtifactLoad { .. } => ErrorCode::ArtifactLoad,
            Self::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            Self::Inference(_) => ErrorCode::Inference,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::Io(_) => ErrorCode::Internal,
        }
    }

    /// Artifact failures halt the session; everything else only aborts the
    /// current prediction.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ArtifactLoad { .. })
    }

    /// HTTP status used when the error is reported by the form server.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::SchemaMismatch { .. } => 422,
            Self::ArtifactLoad { .. } | Self::Inference(_) | Self::Io(_) => 500,
        }
    }
}
