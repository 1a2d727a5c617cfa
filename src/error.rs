use thiserror::Error;

use crate::models::BackendKind;

/// Failures an analysis can end in.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    /// Missing or rejected credential / endpoint. The deployment must be fixed.
    #[error("{0}")]
    Configuration(String),

    /// Transport failure or non-success HTTP status. Re-submitting may help.
    #[error("{0}")]
    Backend(String),

    /// A success response whose body does not match the expected schema.
    #[error("{0}")]
    MalformedResponse(String),

    /// The image was rejected before any upload.
    #[error("{0}")]
    InvalidImage(String),

    #[error("an analysis is already in progress")]
    Busy,
}

impl AnalysisError {
    /// Extra guidance shown under the error message, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AnalysisError::MalformedResponse(_) | AnalysisError::Backend(_) => {
                Some("Please try again later or with a different image.")
            }
            AnalysisError::Configuration(_) => {
                Some("Check the skinsight configuration file or environment.")
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        AnalysisError::Backend(err.to_string())
    }
}

/// Where in the pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOrigin {
    Backend(BackendKind),
    Pipeline,
}

/// An [`AnalysisError`] tagged with its origin, rendered as the single
/// user-visible message for a failed analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFailure {
    pub origin: FailureOrigin,
    pub error: AnalysisError,
}

impl std::fmt::Display for AnalysisFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.origin {
            FailureOrigin::Backend(kind) => {
                write!(f, "Failed to analyze image with {}: {}", kind, self.error)
            }
            FailureOrigin::Pipeline => write!(f, "Error: {}", self.error),
        }
    }
}

impl std::error::Error for AnalysisFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
