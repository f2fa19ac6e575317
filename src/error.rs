use std::time::Duration;

use thiserror::Error;

/// Rejected measurement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("Invalid input: {field} must be a positive number (got {value})")]
    InvalidInput { field: &'static str, value: String },

    #[error("Invalid input: {measurement} does not give a usable BMI")]
    OutOfRange { measurement: String },

    #[error("Invalid input: {reason}")]
    MalformedBody { reason: String },
}

/// Failure of a single advice request.
///
/// None of these are fatal: the requester stays usable for the next call.
#[derive(Debug, Error)]
pub enum AdviceError {
    #[error(transparent)]
    InvalidInput(#[from] EvaluationError),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("No response from the model.")]
    EmptyResponse,
}

impl AdviceError {
    /// Stable identifier used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AdviceError::InvalidInput(_) => "invalid_input",
            AdviceError::AuthenticationError(_) => "authentication_error",
            AdviceError::ServiceUnavailable(_) => "service_unavailable",
            AdviceError::Timeout(_) => "timeout",
            AdviceError::EmptyResponse => "empty_response",
        }
    }
}
