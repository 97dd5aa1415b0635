//! Error types for duetto-core.

use thiserror::Error;

/// Error type for duetto-core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Parameter {0} is already registered")]
    DuplicateParameter(usize),

    #[error("Parameter index gap: expected {expected}, got {got}")]
    ParameterGap { expected: usize, got: usize },

    #[error("Parameter index {index} out of range (registry holds {count})")]
    ParameterOutOfRange { index: usize, count: usize },

    #[error("Payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("State: {0}")]
    State(#[from] StateError),
}

/// Errors raised while decoding a persisted state blob.
///
/// Decoding never mutates the registry, so any of these leaves the previous
/// state untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("State truncated: needed {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("Bad state magic")]
    BadMagic,

    #[error("Unsupported state layout version {0}")]
    UnsupportedVersion(u16),

    #[error("State holds {stored} parameters but the registry only has {registered}")]
    TooManyParameters { stored: usize, registered: usize },

    #[error("Parameter {index} has invalid normalized value {value}")]
    InvalidValue { index: usize, value: f64 },

    #[error("Trailing bytes after state trailer: {0}")]
    TrailingBytes(usize),

    #[error("Plugin rejected custom state: {0}")]
    Custom(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
