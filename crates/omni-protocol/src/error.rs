//! Protocol error types.

use thiserror::Error;

/// Errors that abandon a single sentence or command.
///
/// Discarded sentences (too short, unknown type, unknown device) are not
/// errors; they surface as `Ok(None)` from the decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A field the message type requires is missing.
    #[error("{type_code}: missing field {index} (sentence has {len} fields)")]
    MissingField {
        /// Type code of the sentence being decoded.
        type_code: String,
        /// Index that was read.
        index: usize,
        /// Number of fields in the sentence.
        len: usize,
    },

    /// A numeric field holds non-numeric text.
    #[error("invalid number in field {index}: {value:?}")]
    InvalidNumber {
        /// Index of the offending field.
        index: usize,
        /// Raw field text.
        value: String,
    },

    /// A time-of-day field is not `HHMMSS`.
    #[error("invalid time of day: {0:?}")]
    InvalidTime(String),

    /// A platform command lacks the payload its kind needs.
    #[error("command is missing its {0} value")]
    MissingCommandData(&'static str),

    /// The command's target device has no protocol identity.
    #[error("no unique id for device {0}")]
    UnknownDevice(u64),
}

impl ProtocolError {
    /// Create an invalid number error for a field.
    pub fn invalid_number(index: usize, value: impl Into<String>) -> Self {
        ProtocolError::InvalidNumber {
            index,
            value: value.into(),
        }
    }

    /// Whether the error came from sentence content rather than a command.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::MissingField { .. }
                | ProtocolError::InvalidNumber { .. }
                | ProtocolError::InvalidTime(_)
        )
    }
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::invalid_number(5, "4x2");
        assert!(err.to_string().contains("field 5"));
        assert!(err.to_string().contains("4x2"));

        let err = ProtocolError::MissingField {
            type_code: "H0".to_string(),
            index: 9,
            len: 8,
        };
        assert_eq!(err.to_string(), "H0: missing field 9 (sentence has 8 fields)");
    }

    #[test]
    fn test_decode_error_classification() {
        assert!(ProtocolError::InvalidTime("1516".into()).is_decode_error());
        assert!(!ProtocolError::UnknownDevice(7).is_decode_error());
        assert!(!ProtocolError::MissingCommandData("frequency").is_decode_error());
    }
}
