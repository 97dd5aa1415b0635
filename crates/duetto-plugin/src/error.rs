//! Error types for the plugin boundary.

use crate::processor::ProcessorState;
use thiserror::Error;

/// Envelope encoding/decoding failures.
///
/// Always reported locally to the receiving side; a malformed message is
/// dropped, never propagated across the thread or process boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Unknown opcode '{0}'")]
    UnknownOpcode(String),

    #[error("Invalid opcode or field name '{0}': must be 1-8 ASCII characters")]
    InvalidName(String),

    #[error("Message '{opcode}' is missing field '{field}'")]
    MissingField { opcode: String, field: &'static str },

    #[error("Field '{field}' of message '{opcode}' has the wrong type (expected {expected})")]
    WrongFieldType {
        opcode: String,
        field: &'static str,
        expected: &'static str,
    },

    #[error("Field '{field}' of message '{opcode}' is out of range")]
    OutOfRange { opcode: String, field: &'static str },

    #[error("Payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Frame decode failed: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum PluginError {
    #[error(transparent)]
    Core(#[from] duetto_core::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Queue '{0}' is full, message dropped")]
    QueueFull(&'static str),

    #[error("'{operation}' is not valid while the processor is {state}")]
    InvalidLifecycle {
        operation: &'static str,
        state: ProcessorState,
    },

    #[error("Unsupported sample format {0:?}")]
    UnsupportedSampleFormat(duetto_core::SampleFormat),

    #[error("Bus arrangement rejected: {0}")]
    BusMismatch(String),

    #[error("Invalid process setup: {0}")]
    InvalidSetup(String),

    #[error("Host call failed: {0}")]
    Host(String),

    #[error("Editor error: {0}")]
    Editor(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

impl From<duetto_core::StateError> for PluginError {
    fn from(err: duetto_core::StateError) -> Self {
        PluginError::Core(err.into())
    }
}

pub type Result<T> = std::result::Result<T, PluginError>;
