use std::error::Error as StdError;

use thiserror::Error;

/// Error type native entry points may return.
pub type BoxError = Box<dyn StdError + 'static>;

/// Failures raised by invoking objects and by executing loaded units.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// General runtime failure, optionally chained to the error that caused it.
    #[error("{message}")]
    Failure {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },
    /// A fixed-arity handle was called with the wrong number of arguments.
    #[error("arguments doesn't match parameters count {got} {expected}")]
    ArityMismatch { got: usize, expected: usize },
    /// The default handle of a non-function object was invoked.
    #[error("can not be invoked")]
    NotInvocable,
}

impl RuntimeError {
    pub fn failure(message: impl Into<String>) -> Self {
        RuntimeError::Failure {
            message: message.into(),
            cause: None,
        }
    }

    /// Classifies an error coming out of a native entry point.
    ///
    /// Runtime errors pass through unchanged; anything else becomes a
    /// `Failure` carrying the original message with the original error as
    /// its source.
    pub fn from_native(err: BoxError) -> Self {
        match err.downcast::<RuntimeError>() {
            Ok(runtime) => *runtime,
            Err(other) => RuntimeError::Failure {
                message: other.to_string(),
                cause: Some(other),
            },
        }
    }
}

/// Failures raised while decoding a payload or binding it into a session.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("payload is truncated")]
    Truncated,
    #[error("payload does not start with the unit magic")]
    BadMagic,
    #[error("unsupported payload format version {0}")]
    UnsupportedVersion(u16),
    #[error("payload checksum mismatch")]
    ChecksumMismatch,
    #[error("invalid constant tag {0}")]
    InvalidConstantTag(u8),
    #[error("payload contains invalid utf-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("{0} unexpected bytes after the unit body")]
    TrailingBytes(usize),
    #[error("malformed code in unit `{unit}` at {offset}: {reason}")]
    MalformedCode {
        unit: String,
        offset: usize,
        reason: String,
    },
    #[error("unit `{0}` is already loaded in this session")]
    DuplicateUnit(String),
    #[error("unit `{id}` takes {found} parameters but the dictionary declares {expected}")]
    SignatureMismatch {
        id: String,
        expected: usize,
        found: usize,
    },
}
