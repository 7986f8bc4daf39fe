use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeaseQuoteError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Vehicle not found: {0}")]
    VehicleNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for LeaseQuoteError {
    fn from(e: serde_json::Error) -> Self {
        LeaseQuoteError::SerializationError(e.to_string())
    }
}
