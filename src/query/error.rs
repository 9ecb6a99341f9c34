use thiserror::Error;

/// Error stored in a cache entry and handed to every observer of its key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
  #[error("Not authorized")]
  Unauthorized,

  #[error("{0}")]
  Fetch(String),

  #[error("{0}")]
  Validation(String),

  #[error("Query was cancelled")]
  Cancelled,
}

impl QueryError {
  pub fn is_unauthorized(&self) -> bool {
    matches!(self, QueryError::Unauthorized)
  }
}
