//! API client error types.

use thiserror::Error;

use crate::query::QueryError;

/// Result type alias for the API module.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors that can occur while talking to the ShortLink API.
#[derive(Error, Debug)]
pub enum ApiError {
  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Not authorized ({status})")]
  Unauthorized { status: u16 },

  #[error("Not found: {resource}")]
  NotFound { resource: String },

  #[error("Server returned {status}: {message}")]
  Server { status: u16, message: String },

  #[error("Invalid input: {0}")]
  InvalidInput(String),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

impl ApiError {
  pub fn is_unauthorized(&self) -> bool {
    matches!(self, ApiError::Unauthorized { .. })
  }
}

impl From<ApiError> for QueryError {
  fn from(error: ApiError) -> Self {
    match error {
      ApiError::Unauthorized { .. } => QueryError::Unauthorized,
      ApiError::InvalidInput(message) => QueryError::Validation(message),
      other => QueryError::Fetch(other.to_string()),
    }
  }
}
