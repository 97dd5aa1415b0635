//! Format-independent data model for the duetto plugin boundary.
//!
//! # Primary API
//!
//! - [`ParameterRegistry`]: ordered, host-visible parameters and their units
//! - [`ParameterRange`] / [`ParameterScale`]: normalized ↔ real conversion
//! - [`write_state`] / [`DecodedState`]: persisted state blob
//! - [`MidiMessage`] / [`SysExData`]: fixed-size events for the bridge queues
//! - [`PluginConfig`] / [`HostInfo`]: configuration passed by reference

pub mod error;
pub use error::{Error, Result, StateError};

pub mod config;
pub use config::{AudioIo, HostInfo, PluginConfig, SampleFormat};

pub(crate) mod lockfree;
pub use lockfree::AtomicDouble;

pub mod midi;
pub use midi::{MidiMessage, SysExBytes, SysExData, MIDI_WIRE_SIZE, SYSEX_MAX_SIZE};

pub mod parameter;
pub use parameter::{ParameterRange, ParameterScale};

pub mod registry;
pub use registry::{
    Parameter, ParameterDescriptor, ParameterFlags, ParameterRegistry, UnitId, UnitInfo,
};

pub mod state;
pub use state::{state_size, write_state, DecodedState, STATE_HEADER_SIZE, STATE_MAGIC, STATE_VERSION};
