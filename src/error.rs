use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the grid engine.
///
/// `UnsupportedColumnType` and `SchemaNotFound` are schema defects and abort the table view.
/// The remaining variants are recoverable and stay scoped to the dialog or row that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
  #[error("table not found: {0}")]
  SchemaNotFound(String),

  #[error("column {table}.{column} has unsupported type '{declared}'")]
  UnsupportedColumnType { table: String, column: String, declared: String },

  #[error("table {0} has no primary key, rows can't be edited or deleted")]
  NoPrimaryKey(String),

  #[error("{column}: {message}")]
  Validation { column: String, message: String },

  #[error("network failure: {0}")]
  Network(String),

  #[error("{0}")]
  Backend(String),
}

impl GridError {
  pub fn validation(column: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Validation { column: column.into(), message: message.into() }
  }

  /// Schema defects can't be fixed by retrying.
  pub fn is_fatal(&self) -> bool {
    matches!(self, Self::SchemaNotFound(_) | Self::UnsupportedColumnType { .. })
  }
}

/// Failures reported by a [`crate::gateway::Gateway`] call.
///
/// Serializable so it can ride inside an [`crate::action::Action`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GatewayError {
  #[error("network failure: {0}")]
  Network(String),

  #[error("{0}")]
  Backend(String),
}

impl GatewayError {
  /// The text shown to the operator; backend messages are passed through verbatim.
  pub fn message(&self) -> &str {
    match self {
      Self::Network(message) | Self::Backend(message) => message,
    }
  }
}

impl From<GatewayError> for GridError {
  fn from(err: GatewayError) -> Self {
    match err {
      GatewayError::Network(message) => GridError::Network(message),
      GatewayError::Backend(message) => GridError::Backend(message),
    }
  }
}

impl From<reqwest::Error> for GatewayError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      GatewayError::Network(format!("invalid response body: {err}"))
    } else {
      GatewayError::Network(err.to_string())
    }
  }
}
