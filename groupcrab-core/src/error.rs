//! Error types for plan construction, record handling and accumulator decoding.

use crate::types::FieldType;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the aggregation engine.
///
/// Construction-time variants are fatal to pipeline setup and should not be
/// retried. `Codec` is raised while decoding accumulator state; the state is
/// unrecoverable at that point.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The aggregate name matched neither a built-in nor a registered UDAF.
    #[error("aggregator [{name}] is not supported")]
    UnsupportedAggregate { name: String },

    /// The function exists but cannot aggregate the bound source type.
    #[error("aggregator [{function}] does not accept input of type {field_type}")]
    UnsupportedInputType {
        function: String,
        field_type: FieldType,
    },

    /// The call shape is invalid for the function (e.g. wrong argument count).
    #[error("invalid aggregate call {name}: {reason}")]
    InvalidAggregateCall { name: String, reason: String },

    /// A positional reference points past the end of a schema or value list.
    #[error("field index {index} out of range for {len} fields")]
    FieldIndexOutOfRange { index: usize, len: usize },

    /// Values do not conform to the schema they are built against.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The window field of a record does not hold a timestamp.
    #[error("field {index} does not hold an event timestamp")]
    InvalidTimestamp { index: usize },

    /// A job description is internally inconsistent.
    #[error("invalid aggregation config: {0}")]
    InvalidConfig(String),

    /// Accumulator bytes are truncated, corrupted or encoded for another call list.
    #[error("accumulator codec error: {0}")]
    Codec(String),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Codec(err.to_string())
    }
}
