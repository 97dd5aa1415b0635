//! Plugin configuration.
//!
//! Built once when the plugin is constructed and passed by reference to the
//! components that need it. [`HostInfo`] is filled in by the host during
//! initialization and handed to the plugin the same way.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Sample word size the host may ask the processor to run at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SampleFormat {
    #[default]
    Float32,
    Float64,
}

/// Audio I/O channel counts for the main buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioIo {
    pub inputs: usize,
    pub outputs: usize,
}

impl AudioIo {
    pub fn stereo() -> Self {
        Self {
            inputs: 2,
            outputs: 2,
        }
    }

    /// No audio input, stereo out.
    pub fn instrument() -> Self {
        Self {
            inputs: 0,
            outputs: 2,
        }
    }
}

/// Identity of the host application, captured once at initialization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostInfo {
    pub name: String,
    /// Hosts that cannot report a version leave this at 0.
    pub version: u32,
}

impl HostInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.name.is_empty()
    }
}

/// Static plugin configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub name: String,
    pub vendor: String,
    pub audio_io: AudioIo,
    pub midi_input: bool,
    pub midi_output: bool,
    /// Initial editor size, `None` for plugins without a UI.
    pub editor_size: Option<(u32, u32)>,
    /// Capacity of each bridge queue, in messages.
    pub queue_capacity: usize,
    pub latency_samples: u32,
    pub sample_formats: Vec<SampleFormat>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            vendor: String::new(),
            audio_io: AudioIo::stereo(),
            midi_input: false,
            midi_output: false,
            editor_size: None,
            queue_capacity: 256,
            latency_samples: 0,
            sample_formats: vec![SampleFormat::Float32, SampleFormat::Float64],
        }
    }
}

impl PluginConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn audio_io(mut self, inputs: usize, outputs: usize) -> Self {
        self.audio_io = AudioIo { inputs, outputs };
        self
    }

    pub fn midi_input(mut self, enabled: bool) -> Self {
        self.midi_input = enabled;
        self
    }

    pub fn midi_output(mut self, enabled: bool) -> Self {
        self.midi_output = enabled;
        self
    }

    pub fn editor_size(mut self, width: u32, height: u32) -> Self {
        self.editor_size = Some((width, height));
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn latency(mut self, samples: u32) -> Self {
        self.latency_samples = samples;
        self
    }

    pub fn sample_formats(mut self, formats: &[SampleFormat]) -> Self {
        self.sample_formats = formats.to_vec();
        self
    }

    pub fn has_editor(&self) -> bool {
        self.editor_size.is_some()
    }

    /// An instrument has no audio input bus.
    pub fn is_instrument(&self) -> bool {
        self.audio_io.inputs == 0
    }

    pub fn supports(&self, format: SampleFormat) -> bool {
        self.sample_formats.contains(&format)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidConfig("plugin name is empty".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfig("queue_capacity must be > 0".into()));
        }
        if self.sample_formats.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one sample format is required".into(),
            ));
        }
        if self.audio_io.outputs == 0 && !self.midi_output {
            return Err(Error::InvalidConfig(
                "plugin produces neither audio nor MIDI".into(),
            ));
        }
        Ok(())
    }
}
