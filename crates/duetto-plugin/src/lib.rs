//! Editor/processor bridge and host boundary for duetto plugins
//!
//! A plugin runs on two threads the host owns: the UI thread (editor) and
//! the audio thread (processor). This crate connects them without locks or
//! audio-thread allocation, and presents the pair to the host as one
//! component.
//!
//! ## Pieces
//!
//! - **Bridge**: two bounded single-producer/single-consumer queues carrying
//!   fixed-size [`EditorMessage`]s and [`ProcessorMessage`]s
//! - **[`EditorDelegate`]**: routes processor messages to UI controls by tag,
//!   parameter, or MIDI interest, and reports UI gestures to the host
//! - **[`PluginProcessor`]**: lifecycle state machine and the block loop
//! - **[`PluginComponent`]**: the host-facing [`HostComponent`]
//! - **Relay** (Unix only): carries the bridge over a socket as
//!   bincode-framed [`Envelope`]s when editor and processor are split
//!   across processes
//!
//! ## Usage
//!
//! ```ignore
//! use duetto_plugin::{HostComponent, HostContext, PluginComponent, ProcessSetup};
//!
//! let mut component = PluginComponent::new(MyPlugin::default(), config, host);
//! component.initialize(&HostContext::new(HostInfo::new("My DAW")));
//! component.setup_processing(ProcessSetup::new(48000.0, 256));
//! component.set_active(true);
//!
//! // UI thread, every timer tick
//! component.idle();
//! ```

pub mod error;
pub use error::{PluginError, ProtocolError, Result};

pub mod protocol;
pub use protocol::{
    ControlTag, EditorMessage, Envelope, FieldValue, Payload, ProcessorMessage, NO_TAG,
    PAYLOAD_MAX_SIZE,
};

mod queue;
pub use queue::MessageQueue;

pub mod bridge;
pub use bridge::{BridgeStats, EditorEndpoint, Endpoint, ProcessorEndpoint};

mod host;
pub use host::{HostAdapter, HostEvent, HostNotifier, NullHost, RestartReason};

mod plugin;
pub use plugin::{
    AudioBlock, AudioBuffer, AudioBuffer32, AudioBuffer64, EventList, EventOutput, OutputEvents,
    ParameterChanges, ParameterPoint, ParameterQueue, Plugin, ProcessContext, ProcessSetup,
    SpeakerArrangement, UiSender,
};

mod editor;
pub use editor::{Control, Editor, EditorDelegate, WindowHandle};

mod processor;
pub use processor::{
    declare_registry, HostContext, PluginProcessor, ProcessBlock, ProcessorState,
    BYPASS_PARAM_NAME,
};

mod component;
pub use component::{BusDirection, HostComponent, MediaType, PluginComponent, ResultCode};

#[cfg(all(unix, feature = "relay"))]
pub mod transport;
#[cfg(all(unix, feature = "relay"))]
pub use transport::{EnvelopeListener, EnvelopeTransport};

#[cfg(all(unix, feature = "relay"))]
mod relay;
#[cfg(all(unix, feature = "relay"))]
pub use relay::{RelayHandle, RelayStats};
