//! The user plugin trait and the per-block processing types.

use crate::bridge::ProcessorEndpoint;
use crate::protocol::{ControlTag, Payload, ProcessorMessage};
use duetto_core::{
    HostInfo, MidiMessage, ParameterRegistry, PluginConfig, SampleFormat, SysExData,
};

/// Processing setup negotiated with the host before activation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSetup {
    pub sample_rate: f64,
    pub max_block_size: usize,
    pub sample_format: SampleFormat,
    /// `false` for offline rendering.
    pub realtime: bool,
}

impl ProcessSetup {
    pub fn new(sample_rate: f64, max_block_size: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            sample_format: SampleFormat::Float32,
            realtime: true,
        }
    }

    pub fn sample_format(mut self, format: SampleFormat) -> Self {
        self.sample_format = format;
        self
    }

    pub fn offline(mut self) -> Self {
        self.realtime = false;
        self
    }
}

impl Default for ProcessSetup {
    fn default() -> Self {
        Self::new(44100.0, 512)
    }
}

/// Speaker bitmask for one bus. Each set bit is one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpeakerArrangement(pub u64);

impl SpeakerArrangement {
    pub const EMPTY: SpeakerArrangement = SpeakerArrangement(0);
    pub const MONO: SpeakerArrangement = SpeakerArrangement(1 << 19);
    pub const STEREO: SpeakerArrangement = SpeakerArrangement(0b11);

    pub fn from_channels(channels: usize) -> Self {
        match channels {
            0 => Self::EMPTY,
            1 => Self::MONO,
            n if n >= 64 => Self(u64::MAX),
            n => Self((1u64 << n) - 1),
        }
    }

    pub fn channel_count(self) -> usize {
        self.0.count_ones() as usize
    }
}

pub struct AudioBuffer<'a, T = f32> {
    pub inputs: &'a [&'a [T]],
    pub outputs: &'a mut [&'a mut [T]],
    pub num_samples: usize,
}

impl<T: Copy + Default> AudioBuffer<'_, T> {
    /// Copy each input channel to the output at the same position. Outputs
    /// without a matching input are silenced.
    pub fn pass_through(&mut self) {
        let frames = self.num_samples;
        for (ch, out) in self.outputs.iter_mut().enumerate() {
            let n = frames.min(out.len());
            let out = &mut out[..n];
            let copied = match self.inputs.get(ch) {
                Some(input) => {
                    let len = out.len().min(input.len());
                    out[..len].copy_from_slice(&input[..len]);
                    len
                }
                None => 0,
            };
            out[copied..].fill(T::default());
        }
    }
}

pub type AudioBuffer32<'a> = AudioBuffer<'a, f32>;
pub type AudioBuffer64<'a> = AudioBuffer<'a, f64>;

/// One block of audio at whichever precision the host negotiated.
pub enum AudioBlock<'a> {
    F32(AudioBuffer32<'a>),
    F64(AudioBuffer64<'a>),
}

impl AudioBlock<'_> {
    pub fn num_samples(&self) -> usize {
        match self {
            AudioBlock::F32(buf) => buf.num_samples,
            AudioBlock::F64(buf) => buf.num_samples,
        }
    }

    pub fn sample_format(&self) -> SampleFormat {
        match self {
            AudioBlock::F32(_) => SampleFormat::Float32,
            AudioBlock::F64(_) => SampleFormat::Float64,
        }
    }

    pub fn pass_through(&mut self) {
        match self {
            AudioBlock::F32(buf) => buf.pass_through(),
            AudioBlock::F64(buf) => buf.pass_through(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterPoint {
    pub sample_offset: i32,
    pub value: f64,
}

/// Host automation for one parameter within one block.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterQueue {
    pub param_index: usize,
    pub points: Vec<ParameterPoint>,
}

impl ParameterQueue {
    pub fn new(param_index: usize) -> Self {
        Self {
            param_index,
            points: Vec::new(),
        }
    }

    pub fn add_point(&mut self, sample_offset: i32, value: f64) {
        self.points.push(ParameterPoint {
            sample_offset,
            value,
        });
    }

    /// Value at the end of the block.
    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterChanges {
    pub queues: Vec<ParameterQueue>,
}

impl ParameterChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_queue(&mut self, queue: ParameterQueue) {
        self.queues.push(queue);
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

/// Host-side sink for events the plugin emits.
pub trait EventOutput {
    fn push_midi(&mut self, msg: MidiMessage) -> bool;
    fn push_sysex(&mut self, msg: &SysExData) -> bool;
}

/// Pre-sized event list. Never grows past the capacity it was created with.
#[derive(Debug, Default)]
pub struct EventList {
    pub midi: Vec<MidiMessage>,
    pub sysex: Vec<SysExData>,
}

impl EventList {
    pub fn with_capacity(midi: usize, sysex: usize) -> Self {
        Self {
            midi: Vec::with_capacity(midi),
            sysex: Vec::with_capacity(sysex),
        }
    }

    pub fn clear(&mut self) {
        self.midi.clear();
        self.sysex.clear();
    }
}

impl EventOutput for EventList {
    fn push_midi(&mut self, msg: MidiMessage) -> bool {
        push_bounded(&mut self.midi, msg)
    }

    fn push_sysex(&mut self, msg: &SysExData) -> bool {
        push_bounded(&mut self.sysex, msg.clone())
    }
}

pub(crate) fn push_bounded<T>(list: &mut Vec<T>, item: T) -> bool {
    if list.len() < list.capacity() {
        list.push(item);
        true
    } else {
        false
    }
}

/// Events produced by the plugin during one block.
///
/// Backed by buffers sized at activation; sends beyond that capacity are
/// refused rather than reallocating on the audio thread.
pub struct OutputEvents<'a> {
    midi: &'a mut Vec<MidiMessage>,
    sysex: &'a mut Vec<SysExData>,
}

impl<'a> OutputEvents<'a> {
    pub(crate) fn new(midi: &'a mut Vec<MidiMessage>, sysex: &'a mut Vec<SysExData>) -> Self {
        Self { midi, sysex }
    }

    pub fn send_midi(&mut self, msg: MidiMessage) -> bool {
        push_bounded(self.midi, msg)
    }

    pub fn send_sysex(&mut self, msg: SysExData) -> bool {
        push_bounded(self.sysex, msg)
    }

    pub fn midi(&self) -> &[MidiMessage] {
        &self.midi[..]
    }

    pub fn sysex(&self) -> &[SysExData] {
        &self.sysex[..]
    }
}

/// Sends from the audio thread to the editor. Every method is lock- and
/// allocation-free and reports `false` when the message was dropped.
#[derive(Clone, Copy)]
pub struct UiSender<'a> {
    endpoint: &'a ProcessorEndpoint,
}

impl<'a> UiSender<'a> {
    pub(crate) fn new(endpoint: &'a ProcessorEndpoint) -> Self {
        Self { endpoint }
    }

    pub fn send_param_value(&self, param_index: usize, normalized: f64) -> bool {
        self.endpoint.send(ProcessorMessage::ParamValueToUi {
            param_index,
            normalized,
        })
    }

    pub fn send_control_value(&self, control_tag: ControlTag, normalized: f64) -> bool {
        self.endpoint.send(ProcessorMessage::ControlValueToUi {
            control_tag,
            normalized,
        })
    }

    pub fn send_control_msg(&self, control_tag: ControlTag, message_tag: i32, data: &[u8]) -> bool {
        match Payload::new(data) {
            Ok(payload) => self.endpoint.send(ProcessorMessage::ControlMessageToUi {
                control_tag,
                message_tag,
                payload,
            }),
            Err(_) => false,
        }
    }

    pub fn send_arbitrary_msg(&self, message_tag: i32, data: &[u8]) -> bool {
        match Payload::new(data) {
            Ok(payload) => self.endpoint.send(ProcessorMessage::ArbitraryMessageToUi {
                message_tag,
                payload,
            }),
            Err(_) => false,
        }
    }
}

/// Everything the DSP sees for one block besides the audio itself.
pub struct ProcessContext<'a> {
    /// Host events first, then events sent from the editor.
    pub midi_in: &'a [MidiMessage],
    pub sysex_in: &'a [SysExData],
    /// Sample-accurate automation. Last values are already applied to `params`.
    pub param_changes: &'a ParameterChanges,
    pub params: &'a ParameterRegistry,
    pub setup: &'a ProcessSetup,
    pub output: OutputEvents<'a>,
    pub ui: UiSender<'a>,
}

/// User plugin logic.
///
/// `process` and the `on_*` hooks run on the audio thread and must not
/// block or allocate. `declare_parameters`, `save_custom_state` and
/// `load_custom_state` run on host/persistence threads.
pub trait Plugin: Send + 'static {
    /// Register parameters in index order. Errors abort initialization.
    fn declare_parameters(&mut self, registry: &mut ParameterRegistry) -> duetto_core::Result<()>;

    fn on_host_identified(&mut self, _host: &HostInfo) {}

    /// Default: the main buses must match the configured channel counts.
    fn accepts_bus_arrangement(
        &self,
        config: &PluginConfig,
        inputs: &[SpeakerArrangement],
        outputs: &[SpeakerArrangement],
    ) -> bool {
        let main_in = inputs.first().map_or(0, |a| a.channel_count());
        let main_out = outputs.first().map_or(0, |a| a.channel_count());
        main_in == config.audio_io.inputs && main_out == config.audio_io.outputs
    }

    fn on_reset(&mut self, _setup: &ProcessSetup) {}

    fn on_activate(&mut self, _active: bool) {}

    fn on_param_change(&mut self, _param_index: usize, _normalized: f64) {}

    /// A control not bound to any parameter changed value.
    fn on_control_value(&mut self, _control_tag: ControlTag, _normalized: f64) {}

    /// Control or arbitrary message from the editor. Arbitrary messages carry
    /// [`ControlTag::NONE`]. Returns whether the message was handled.
    fn on_message(
        &mut self,
        _message_tag: i32,
        _control_tag: ControlTag,
        _data: &[u8],
        _ui: &UiSender<'_>,
    ) -> bool {
        false
    }

    fn process(&mut self, audio: &mut AudioBlock<'_>, ctx: &mut ProcessContext<'_>);

    /// Bytes appended after the parameter values in the state blob.
    fn save_custom_state(&self, _out: &mut Vec<u8>) {}

    /// Restore from the bytes written by `save_custom_state`. Must leave the
    /// plugin untouched when returning `Err`.
    fn load_custom_state(&mut self, _data: &[u8]) -> Result<(), String> {
        Ok(())
    }

    fn on_terminate(&mut self) {}
}
