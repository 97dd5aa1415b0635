//! Centralized error type for the duetto umbrella crate.
//!
//! Wraps the subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] duetto_core::Error),

    #[error("Plugin: {0}")]
    Plugin(#[from] duetto_plugin::PluginError),

    #[error("Protocol: {0}")]
    Protocol(#[from] duetto_plugin::ProtocolError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<duetto_core::StateError> for Error {
    fn from(err: duetto_core::StateError) -> Self {
        Error::Core(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
