//! Audio-thread side of the plugin: lifecycle state machine and the block loop.

use crate::bridge::ProcessorEndpoint;
use crate::error::{PluginError, Result};
use crate::host::{HostAdapter, HostEvent};
use crate::plugin::{
    push_bounded, AudioBlock, EventOutput, OutputEvents, ParameterChanges, Plugin,
    ProcessContext, ProcessSetup, SpeakerArrangement, UiSender,
};
use crate::protocol::{ControlTag, EditorMessage, ProcessorMessage};
use duetto_core::{
    write_state, DecodedState, HostInfo, MidiMessage, ParameterDescriptor, ParameterFlags,
    ParameterRange, ParameterRegistry, PluginConfig, SampleFormat, StateError, SysExData,
};
use std::fmt;
use std::sync::Arc;

/// Extra event slots on top of the bridge capacity, for host-delivered events.
const HOST_EVENT_CAPACITY: usize = 512;

/// Name of the bypass parameter added for effects.
pub const BYPASS_PARAM_NAME: &str = "Bypass";

/// Build the parameter table a plugin shows the host: the plugin's own
/// parameters, then a bypass toggle unless `config` is an instrument. Every
/// value starts at its default.
///
/// An editor running in another process builds its copy the same way.
pub fn declare_registry<P: Plugin>(
    plugin: &mut P,
    config: &PluginConfig,
) -> duetto_core::Result<ParameterRegistry> {
    let mut registry = ParameterRegistry::new();
    plugin.declare_parameters(&mut registry)?;
    if !config.is_instrument() {
        let flags = ParameterFlags {
            bypass: true,
            ..Default::default()
        };
        registry.push(
            ParameterDescriptor::new(BYPASS_PARAM_NAME, ParameterRange::toggle(0.0, 1.0, false))
                .flags(flags),
        )?;
    }
    registry.reset_to_defaults();
    Ok(registry)
}

/// Lifecycle of a [`PluginProcessor`].
///
/// `Uninitialized → Initialized → Active ⇄ Inactive → Terminated`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorState {
    Uninitialized,
    Initialized,
    Active,
    Inactive,
    Terminated,
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessorState::Uninitialized => "uninitialized",
            ProcessorState::Initialized => "initialized",
            ProcessorState::Active => "active",
            ProcessorState::Inactive => "inactive",
            ProcessorState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Everything the host hands over during initialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostContext {
    pub host: HostInfo,
    /// Sample format the host intends to use. Checked against the config.
    pub sample_format: SampleFormat,
}

impl HostContext {
    pub fn new(host: HostInfo) -> Self {
        Self {
            host,
            sample_format: SampleFormat::Float32,
        }
    }
}

/// One host `process` call.
pub struct ProcessBlock<'a> {
    pub audio: AudioBlock<'a>,
    pub midi_in: &'a [MidiMessage],
    pub sysex_in: &'a [SysExData],
    pub param_changes: &'a ParameterChanges,
    /// Where emitted events go, if the host takes any.
    pub output_events: Option<&'a mut dyn EventOutput>,
}

impl<'a> ProcessBlock<'a> {
    pub fn new(audio: AudioBlock<'a>, param_changes: &'a ParameterChanges) -> Self {
        Self {
            audio,
            midi_in: &[],
            sysex_in: &[],
            param_changes,
            output_events: None,
        }
    }

    pub fn midi(mut self, events: &'a [MidiMessage]) -> Self {
        self.midi_in = events;
        self
    }

    pub fn sysex(mut self, events: &'a [SysExData]) -> Self {
        self.sysex_in = events;
        self
    }

    pub fn output(mut self, output: &'a mut dyn EventOutput) -> Self {
        self.output_events = Some(output);
        self
    }
}

/// Scratch buffers sized at activation so the block loop never allocates.
#[derive(Default)]
struct EventBuffers {
    midi_in: Vec<MidiMessage>,
    sysex_in: Vec<SysExData>,
    midi_out: Vec<MidiMessage>,
    sysex_out: Vec<SysExData>,
}

impl EventBuffers {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            midi_in: Vec::with_capacity(capacity),
            sysex_in: Vec::with_capacity(capacity),
            midi_out: Vec::with_capacity(capacity),
            sysex_out: Vec::with_capacity(capacity),
        }
    }

    fn clear(&mut self) {
        self.midi_in.clear();
        self.sysex_in.clear();
        self.midi_out.clear();
        self.sysex_out.clear();
    }
}

/// Drives a [`Plugin`] through the host lifecycle and runs the block loop.
pub struct PluginProcessor<P: Plugin> {
    plugin: P,
    config: Arc<PluginConfig>,
    registry: Arc<ParameterRegistry>,
    bypass: Option<usize>,
    endpoint: ProcessorEndpoint,
    host: HostAdapter,
    host_info: HostInfo,
    state: ProcessorState,
    setup: Option<ProcessSetup>,
    inputs: Vec<SpeakerArrangement>,
    outputs: Vec<SpeakerArrangement>,
    latency: u32,
    events: EventBuffers,
    dropped_events: u64,
}

impl<P: Plugin> PluginProcessor<P> {
    pub fn new(
        plugin: P,
        config: Arc<PluginConfig>,
        endpoint: ProcessorEndpoint,
        host: HostAdapter,
    ) -> Self {
        let latency = config.latency_samples;
        Self {
            plugin,
            config,
            registry: Arc::new(ParameterRegistry::new()),
            bypass: None,
            endpoint,
            host,
            host_info: HostInfo::default(),
            state: ProcessorState::Uninitialized,
            setup: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            latency,
            events: EventBuffers::default(),
            dropped_events: 0,
        }
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    pub fn plugin_mut(&mut self) -> &mut P {
        &mut self.plugin
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Shared parameter registry. Empty until initialization.
    pub fn registry(&self) -> &Arc<ParameterRegistry> {
        &self.registry
    }

    /// Index of the host bypass parameter; `None` for instruments.
    pub fn bypass_index(&self) -> Option<usize> {
        self.bypass
    }

    pub fn is_bypassed(&self) -> bool {
        bypassed(&self.registry, self.bypass)
    }

    pub fn host_info(&self) -> &HostInfo {
        &self.host_info
    }

    pub fn setup(&self) -> Option<&ProcessSetup> {
        self.setup.as_ref()
    }

    pub fn bus_arrangements(&self) -> (&[SpeakerArrangement], &[SpeakerArrangement]) {
        (&self.inputs, &self.outputs)
    }

    /// Events dropped because a pre-sized buffer was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    fn invalid(&self, operation: &'static str) -> PluginError {
        PluginError::InvalidLifecycle {
            operation,
            state: self.state,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Register parameters and the default bus layout, and record the host.
    ///
    /// On failure the processor stays uninitialized.
    pub fn initialize(&mut self, context: &HostContext) -> Result<()> {
        if self.state != ProcessorState::Uninitialized {
            return Err(self.invalid("initialize"));
        }

        self.config.validate()?;
        if !self.config.supports(context.sample_format) {
            return Err(PluginError::UnsupportedSampleFormat(context.sample_format));
        }

        let registry = declare_registry(&mut self.plugin, &self.config)?;
        self.bypass = registry.bypass_index();
        self.registry = Arc::new(registry);

        self.host_info = context.host.clone();
        self.plugin.on_host_identified(&self.host_info);

        self.inputs = match self.config.audio_io.inputs {
            0 => Vec::new(),
            n => vec![SpeakerArrangement::from_channels(n)],
        };
        self.outputs = match self.config.audio_io.outputs {
            0 => Vec::new(),
            n => vec![SpeakerArrangement::from_channels(n)],
        };

        self.state = ProcessorState::Initialized;
        tracing::info!(
            plugin = %self.config.name,
            host = %self.host_info.name,
            params = self.registry.len(),
            "Processor initialized"
        );
        Ok(())
    }

    pub fn set_bus_arrangements(
        &mut self,
        inputs: &[SpeakerArrangement],
        outputs: &[SpeakerArrangement],
    ) -> Result<()> {
        match self.state {
            ProcessorState::Initialized | ProcessorState::Inactive => {}
            _ => return Err(self.invalid("set_bus_arrangements")),
        }
        if !self.plugin.accepts_bus_arrangement(&self.config, inputs, outputs) {
            return Err(PluginError::BusMismatch(format!(
                "{} input / {} output buses not supported by {}",
                inputs.len(),
                outputs.len(),
                self.config.name
            )));
        }
        self.inputs = inputs.to_vec();
        self.outputs = outputs.to_vec();
        Ok(())
    }

    pub fn can_process_sample_size(&self, format: SampleFormat) -> bool {
        self.config.supports(format)
    }

    pub fn setup_processing(&mut self, setup: ProcessSetup) -> Result<()> {
        match self.state {
            ProcessorState::Initialized | ProcessorState::Inactive => {}
            _ => return Err(self.invalid("setup_processing")),
        }
        if !self.can_process_sample_size(setup.sample_format) {
            return Err(PluginError::UnsupportedSampleFormat(setup.sample_format));
        }
        if !(setup.sample_rate.is_finite() && setup.sample_rate > 0.0) {
            return Err(PluginError::InvalidSetup(format!(
                "sample rate {}",
                setup.sample_rate
            )));
        }
        if setup.max_block_size == 0 {
            return Err(PluginError::InvalidSetup("max block size 0".into()));
        }
        tracing::debug!(
            sample_rate = setup.sample_rate,
            max_block_size = setup.max_block_size,
            format = ?setup.sample_format,
            "Processing set up"
        );
        self.setup = Some(setup);
        Ok(())
    }

    /// Activate or deactivate. Setting the current state again is a no-op.
    pub fn set_active(&mut self, active: bool) -> Result<()> {
        match (self.state, active) {
            (ProcessorState::Active, true) => Ok(()),
            (ProcessorState::Initialized | ProcessorState::Inactive, false) => Ok(()),
            (ProcessorState::Initialized | ProcessorState::Inactive, true) => {
                let setup = self
                    .setup
                    .ok_or_else(|| PluginError::InvalidSetup("setup_processing not called".into()))?;
                self.events =
                    EventBuffers::with_capacity(self.config.queue_capacity + HOST_EVENT_CAPACITY);
                self.plugin.on_reset(&setup);
                self.plugin.on_activate(true);
                self.state = ProcessorState::Active;
                tracing::debug!("Processor activated");
                Ok(())
            }
            (ProcessorState::Active, false) => {
                self.plugin.on_activate(false);
                self.events = EventBuffers::default();
                self.state = ProcessorState::Inactive;
                tracing::debug!("Processor deactivated");
                Ok(())
            }
            _ => Err(self.invalid("set_active")),
        }
    }

    /// Deactivate if needed, then tear down. Idempotent.
    pub fn terminate(&mut self) {
        match self.state {
            ProcessorState::Terminated => return,
            ProcessorState::Active => {
                let _ = self.set_active(false);
            }
            _ => {}
        }
        if self.state != ProcessorState::Uninitialized {
            self.plugin.on_terminate();
        }
        self.state = ProcessorState::Terminated;
        tracing::info!(plugin = %self.config.name, "Processor terminated");
    }

    // ========================================================================
    // Block loop
    // ========================================================================

    /// Run one block.
    ///
    /// 1. Drain every message queued by the editor and apply it.
    /// 2. Apply host automation (last point of each queue) and reflect it to the editor.
    /// 3. Run the DSP, or copy inputs to outputs while bypassed.
    /// 4. Forward emitted MIDI/SysEx to the host and the editor.
    ///
    /// Never blocks, locks, or allocates.
    pub fn process(&mut self, block: &mut ProcessBlock<'_>) -> Result<()> {
        if self.state != ProcessorState::Active {
            return Err(self.invalid("process"));
        }
        let Some(setup) = self.setup else {
            return Err(self.invalid("process"));
        };
        if block.audio.sample_format() != setup.sample_format {
            return Err(PluginError::UnsupportedSampleFormat(block.audio.sample_format()));
        }

        let Self {
            plugin,
            registry,
            bypass,
            endpoint,
            events,
            dropped_events,
            ..
        } = self;
        let registry: &ParameterRegistry = registry;
        let bypass = *bypass;
        events.clear();
        let ui = UiSender::new(endpoint);

        // Host events first, then the editor's, matching arrival order.
        for msg in block.midi_in {
            if !push_bounded(&mut events.midi_in, *msg) {
                *dropped_events += 1;
            }
        }
        for msg in block.sysex_in {
            if !push_bounded(&mut events.sysex_in, msg.clone()) {
                *dropped_events += 1;
            }
        }

        endpoint.drain(|msg| match msg {
            EditorMessage::ControlValueChanged {
                param_index: Some(index),
                normalized,
                ..
            } => {
                // Already stored when the editor shares this registry; a
                // remote editor's edits land here first.
                if let Ok(value) = registry.set_normalized(index, normalized) {
                    if Some(index) != bypass {
                        plugin.on_param_change(index, value);
                    }
                    ui.send_param_value(index, value);
                }
            }
            EditorMessage::ControlValueChanged {
                control_tag,
                param_index: None,
                normalized,
            } => plugin.on_control_value(control_tag, normalized),
            EditorMessage::ControlMessage {
                control_tag,
                message_tag,
                payload,
            } => {
                plugin.on_message(message_tag, control_tag, payload.as_slice(), &ui);
            }
            EditorMessage::ArbitraryMessage {
                message_tag,
                payload,
            } => {
                plugin.on_message(message_tag, ControlTag::NONE, payload.as_slice(), &ui);
            }
            EditorMessage::MidiFromUi(msg) => {
                if !push_bounded(&mut events.midi_in, msg) {
                    *dropped_events += 1;
                }
            }
            EditorMessage::SysExFromUi(msg) => {
                if !push_bounded(&mut events.sysex_in, msg) {
                    *dropped_events += 1;
                }
            }
        });

        for queue in &block.param_changes.queues {
            let Some(value) = queue.last_value() else {
                continue;
            };
            if let Ok(stored) = registry.set_normalized(queue.param_index, value) {
                if Some(queue.param_index) != bypass {
                    plugin.on_param_change(queue.param_index, stored);
                }
                ui.send_param_value(queue.param_index, stored);
            }
        }

        let EventBuffers {
            midi_in,
            sysex_in,
            midi_out,
            sysex_out,
        } = events;
        if bypassed(registry, bypass) {
            block.audio.pass_through();
        } else {
            let mut ctx = ProcessContext {
                midi_in,
                sysex_in,
                param_changes: block.param_changes,
                params: registry,
                setup: &setup,
                output: OutputEvents::new(midi_out, sysex_out),
                ui,
            };
            plugin.process(&mut block.audio, &mut ctx);
        }

        for msg in midi_out.iter() {
            if let Some(out) = block.output_events.as_deref_mut() {
                out.push_midi(*msg);
            }
            endpoint.send(ProcessorMessage::MidiFromProcessor(*msg));
        }
        for msg in sysex_out.drain(..) {
            if let Some(out) = block.output_events.as_deref_mut() {
                out.push_sysex(&msg);
            }
            endpoint.send(ProcessorMessage::SysExFromProcessor(msg));
        }

        Ok(())
    }

    // ========================================================================
    // Latency / state
    // ========================================================================

    pub fn latency(&self) -> u32 {
        self.latency
    }

    /// Report a new latency to the host. No host call if it is unchanged.
    pub fn set_latency(&mut self, samples: u32) {
        if samples == self.latency {
            return;
        }
        self.latency = samples;
        self.host.notify(HostEvent::LatencyChanged);
    }

    /// Tell the host that parameter names or ranges changed.
    pub fn notify_parameter_details_changed(&self) -> bool {
        self.host.notify(HostEvent::ParameterDetailsChanged)
    }

    /// Serialize every parameter value plus the plugin's own trailer.
    pub fn get_state(&self, out: &mut Vec<u8>) -> Result<()> {
        if self.state == ProcessorState::Uninitialized || self.state == ProcessorState::Terminated {
            return Err(self.invalid("get_state"));
        }
        let mut trailer = Vec::new();
        self.plugin.save_custom_state(&mut trailer);
        write_state(&self.registry, &trailer, out);
        Ok(())
    }

    /// Restore a blob written by [`get_state`](Self::get_state).
    ///
    /// All-or-nothing: the blob is validated in full and the plugin accepts
    /// its trailer before any parameter changes.
    pub fn set_state(&mut self, bytes: &[u8]) -> Result<()> {
        if self.state == ProcessorState::Uninitialized || self.state == ProcessorState::Terminated {
            return Err(self.invalid("set_state"));
        }
        let decoded = DecodedState::decode(bytes, self.registry.len())?;
        self.plugin
            .load_custom_state(decoded.trailer())
            .map_err(StateError::Custom)?;
        decoded.apply(&self.registry);

        for (index, param) in self.registry.iter().enumerate() {
            if Some(index) != self.bypass {
                self.plugin.on_param_change(index, param.normalized());
            }
        }
        tracing::debug!(
            stored = decoded.values().len(),
            registered = self.registry.len(),
            "State restored"
        );
        Ok(())
    }

    /// Queue every parameter value for the editor. Used when the editor
    /// lives in another process and cannot read the registry directly.
    pub fn resync_editor(&self) -> usize {
        let ui = UiSender::new(&self.endpoint);
        self.registry
            .iter()
            .enumerate()
            .filter(|(index, param)| ui.send_param_value(*index, param.normalized()))
            .count()
    }
}

fn bypassed(registry: &ParameterRegistry, bypass: Option<usize>) -> bool {
    bypass
        .and_then(|index| registry.normalized(index).ok())
        .is_some_and(|value| value >= 0.5)
}

impl<P: Plugin> Drop for PluginProcessor<P> {
    fn drop(&mut self) {
        self.terminate();
    }
}
