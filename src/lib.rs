//! # Duetto - editor/processor bridge for audio plugins
//!
//! A plugin's UI thread and audio thread talk through a pair of bounded
//! lock-free queues; a host sees both as one component.
//!
//! ## Architecture
//!
//! Duetto is an umbrella crate that coordinates:
//! - **duetto-core** - Parameter registry, value ranges, MIDI/SysEx types, state layout
//! - **duetto-plugin** - Message bridge, editor delegate, processor lifecycle, host component,
//!   split-process relay
//!
//! ## Quick Start
//!
//! ```ignore
//! use duetto::prelude::*;
//!
//! struct Gain;
//!
//! impl Plugin for Gain {
//!     fn declare_parameters(&mut self, registry: &mut ParameterRegistry) -> duetto::core::Result<()> {
//!         registry.push(ParameterDescriptor::new("Gain", ParameterRange::linear(-60.0, 12.0, 0.0)).label("dB"))?;
//!         Ok(())
//!     }
//!
//!     fn process(&mut self, audio: &mut AudioBlock<'_>, ctx: &mut ProcessContext<'_>) {
//!         // ...
//!     }
//! }
//!
//! let mut component = PluginComponent::new(Gain, PluginConfig::new("Gain"), host);
//! component.initialize(&HostContext::new(HostInfo::new("My DAW")));
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Everything
//! - `relay` - Split-process relay over Unix sockets (tokio)

mod error;
pub use error::{Error, Result};

/// Re-export of duetto-core for direct access
pub use duetto_core as core;

/// Re-export of duetto-plugin for direct access
pub use duetto_plugin as plugin;

// Data model
pub use duetto_core::{
    AudioIo, HostInfo, MidiMessage, Parameter, ParameterDescriptor, ParameterFlags,
    ParameterRange, ParameterRegistry, ParameterScale, PluginConfig, SampleFormat, StateError,
    SysExData, UnitId, UnitInfo,
};

// Bridge and host boundary
pub use duetto_plugin::{
    declare_registry, AudioBlock, AudioBuffer, BridgeStats, Control, ControlTag, Editor,
    EditorDelegate,
    EditorEndpoint, EditorMessage, Envelope, HostAdapter, HostComponent, HostContext, HostEvent,
    HostNotifier, ParameterChanges, ParameterQueue, Payload, Plugin, PluginComponent,
    PluginError, PluginProcessor, ProcessBlock, ProcessContext, ProcessSetup, ProcessorEndpoint,
    ProcessorMessage, ProcessorState, ProtocolError, RestartReason, ResultCode,
    SpeakerArrangement, WindowHandle,
};

#[cfg(all(unix, feature = "relay"))]
pub use duetto_plugin::{EnvelopeTransport, RelayHandle};

/// Convenience prelude for common imports
pub mod prelude {
    // Writing a plugin
    pub use crate::{
        AudioBlock, AudioBuffer, Plugin, ProcessContext, ProcessSetup, UnitId,
    };

    // Parameters
    pub use crate::{ParameterDescriptor, ParameterRange, ParameterRegistry, ParameterScale};

    // Configuration
    pub use crate::{HostInfo, PluginConfig, SampleFormat};

    // Hosting
    pub use crate::{HostComponent, HostContext, HostNotifier, PluginComponent, ResultCode};

    // Editor
    pub use crate::{Control, ControlTag, Editor, WindowHandle};

    // Events
    pub use crate::{MidiMessage, SysExData};
}
