//! Mapper error types.

use thiserror::Error;

/// Errors that can occur while converting between records and wire payloads.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapperError {
    /// The wire value has a different shape than the field expects.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Description of the expected kind.
        expected: String,
        /// Description of the value that was received.
        found: String,
    },

    /// A timestamp field received a malformed or non-string value.
    #[error("invalid timestamp {value}: {reason}")]
    Format {
        /// The offending value, rendered as JSON.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// A string did not name any known variant of an enumerated field.
    #[error("unknown variant {value:?}, expected one of {expected:?}")]
    UnknownVariant {
        /// The received string.
        value: String,
        /// Accepted values.
        expected: &'static [&'static str],
    },

    /// A duration string could not be parsed.
    #[error("invalid duration {0:?}")]
    InvalidDuration(String),

    /// Decoding a record failed on one of its fields.
    #[error("cannot decode {record}.{field}: {source}")]
    Decode {
        /// Record being decoded.
        record: &'static str,
        /// Wire name of the failing field.
        field: &'static str,
        /// First mismatch encountered.
        #[source]
        source: Box<MapperError>,
    },
}

impl MapperError {
    /// Builds a [`MapperError::TypeMismatch`] for `value`.
    pub fn mismatch(expected: impl ToString, value: &serde_json::Value) -> Self {
        MapperError::TypeMismatch {
            expected: expected.to_string(),
            found: describe(value).to_string(),
        }
    }

    /// Returns the innermost error, skipping nested [`MapperError::Decode`] wrappers.
    pub fn root_cause(&self) -> &MapperError {
        match self {
            MapperError::Decode { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Short name of a wire value's variant, used in error messages.
pub(crate) fn describe(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_f64() => "float",
        serde_json::Value::Number(_) => "integer",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "sequence",
        serde_json::Value::Object(_) => "mapping",
    }
}
