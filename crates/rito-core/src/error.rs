//! Error types for `rito-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid AT URI: {0:?}")]
  InvalidAtUri(String),

  #[error("{operation} of {uri} carries no record")]
  MissingRecord { operation: String, uri: String },

  #[error("malformed record {uri}: {source}")]
  MalformedRecord {
    uri:    String,
    #[source]
    source: serde_json::Error,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
