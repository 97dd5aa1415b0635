//! Host-facing plugin component.
//!
//! [`PluginComponent`] owns the processor and the editor delegate and exposes
//! the host lifecycle through [`HostComponent`], reporting outcomes as
//! [`ResultCode`]s the way a plugin ABI does.

use crate::bridge::{self, EditorEndpoint};
use crate::editor::{Editor, EditorDelegate, WindowHandle};
use crate::error::{PluginError, Result};
use crate::host::{HostAdapter, HostNotifier};
use crate::plugin::{Plugin, ProcessSetup, SpeakerArrangement};
use crate::processor::{HostContext, PluginProcessor, ProcessBlock, ProcessorState};
use duetto_core::{ParameterDescriptor, PluginConfig, SampleFormat, UnitInfo};
use std::sync::Arc;

/// Outcome of a host call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok,
    False,
    InvalidArgument,
    NotInitialized,
    NotImplemented,
}

impl ResultCode {
    pub fn is_ok(self) -> bool {
        self == ResultCode::Ok
    }
}

impl From<&PluginError> for ResultCode {
    fn from(err: &PluginError) -> Self {
        match err {
            PluginError::InvalidLifecycle {
                state: ProcessorState::Uninitialized | ProcessorState::Terminated,
                ..
            } => ResultCode::NotInitialized,
            PluginError::InvalidLifecycle { .. } => ResultCode::False,
            PluginError::Core(duetto_core::Error::State(_)) => ResultCode::False,
            PluginError::Core(_)
            | PluginError::Protocol(_)
            | PluginError::UnsupportedSampleFormat(_)
            | PluginError::BusMismatch(_)
            | PluginError::InvalidSetup(_) => ResultCode::InvalidArgument,
            PluginError::QueueFull(_)
            | PluginError::Host(_)
            | PluginError::Editor(_)
            | PluginError::Io(_)
            | PluginError::Serialization(_) => ResultCode::False,
        }
    }
}

fn report<T>(operation: &str, result: Result<T>) -> ResultCode {
    match result {
        Ok(_) => ResultCode::Ok,
        Err(e) => {
            tracing::warn!("{} failed: {}", operation, e);
            ResultCode::from(&e)
        }
    }
}

/// Lifecycle calls a host makes on a plugin component.
pub trait HostComponent {
    fn initialize(&mut self, context: &HostContext) -> ResultCode;
    fn terminate(&mut self) -> ResultCode;
    fn set_bus_arrangements(
        &mut self,
        inputs: &[SpeakerArrangement],
        outputs: &[SpeakerArrangement],
    ) -> ResultCode;
    fn setup_processing(&mut self, setup: ProcessSetup) -> ResultCode;
    fn can_process_sample_size(&self, format: SampleFormat) -> ResultCode;
    fn set_active(&mut self, active: bool) -> ResultCode;
    fn process(&mut self, block: &mut ProcessBlock<'_>) -> ResultCode;
    fn set_state(&mut self, bytes: &[u8]) -> ResultCode;
    fn get_state(&self, out: &mut Vec<u8>) -> ResultCode;
    fn latency_samples(&self) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Audio,
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusDirection {
    Input,
    Output,
}

/// Processor plus editor delegate, wired to one host.
pub struct PluginComponent<P: Plugin> {
    processor: PluginProcessor<P>,
    config: Arc<PluginConfig>,
    editor_endpoint: EditorEndpoint,
    host: HostAdapter,
    delegate: Option<EditorDelegate>,
}

impl<P: Plugin> PluginComponent<P> {
    pub fn new(plugin: P, config: PluginConfig, host: Arc<dyn HostNotifier>) -> Self {
        let config = Arc::new(config);
        let host = HostAdapter::new(host);
        let (editor_endpoint, processor_endpoint) = bridge::channel(config.queue_capacity.max(1));
        let processor =
            PluginProcessor::new(plugin, Arc::clone(&config), processor_endpoint, host.clone());
        Self {
            processor,
            config,
            editor_endpoint,
            host,
            delegate: None,
        }
    }

    pub fn processor(&self) -> &PluginProcessor<P> {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut PluginProcessor<P> {
        &mut self.processor
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Available once initialized.
    pub fn delegate(&self) -> Option<&EditorDelegate> {
        self.delegate.as_ref()
    }

    pub fn delegate_mut(&mut self) -> Option<&mut EditorDelegate> {
        self.delegate.as_mut()
    }

    pub fn bus_count(&self, media: MediaType, direction: BusDirection) -> usize {
        let (inputs, outputs) = self.processor.bus_arrangements();
        match (media, direction) {
            (MediaType::Audio, BusDirection::Input) => inputs.len(),
            (MediaType::Audio, BusDirection::Output) => outputs.len(),
            (MediaType::Event, BusDirection::Input) => self.config.midi_input as usize,
            (MediaType::Event, BusDirection::Output) => self.config.midi_output as usize,
        }
    }

    /// Parameters the host sees: the plugin's own, then the bypass toggle
    /// for effects.
    pub fn parameter_count(&self) -> usize {
        self.processor.registry().len()
    }

    pub fn parameter_info(&self, index: usize) -> Option<&ParameterDescriptor> {
        self.processor
            .registry()
            .get(index)
            .ok()
            .map(|param| param.descriptor())
    }

    /// Root unit plus one unit per parameter group.
    pub fn unit_count(&self) -> usize {
        self.processor.registry().unit_count()
    }

    pub fn unit_info(&self, unit_index: usize) -> Option<UnitInfo> {
        self.processor.registry().unit_info(unit_index)
    }

    pub fn set_latency(&mut self, samples: u32) {
        self.processor.set_latency(samples);
    }

    // ========================================================================
    // Editor
    // ========================================================================

    pub fn attach_editor(&mut self, editor: Box<dyn Editor>) -> ResultCode {
        match self.delegate.as_mut() {
            Some(delegate) => {
                delegate.attach_editor(editor);
                ResultCode::Ok
            }
            None => ResultCode::NotInitialized,
        }
    }

    pub fn open_window(&mut self, parent: WindowHandle) -> Option<WindowHandle> {
        self.delegate.as_mut()?.open_window(parent)
    }

    pub fn close_window(&mut self) {
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.close_window();
        }
    }

    /// UI timer tick: deliver pending processor messages to the editor.
    pub fn idle(&mut self) -> usize {
        self.delegate.as_mut().map_or(0, EditorDelegate::idle)
    }
}

impl<P: Plugin> HostComponent for PluginComponent<P> {
    fn initialize(&mut self, context: &HostContext) -> ResultCode {
        let code = report("initialize", self.processor.initialize(context));
        if code.is_ok() {
            self.delegate = Some(EditorDelegate::new(
                Arc::clone(self.processor.registry()),
                self.editor_endpoint.clone(),
                self.host.clone(),
                self.config.editor_size,
            ));
        }
        code
    }

    fn terminate(&mut self) -> ResultCode {
        self.processor.terminate();
        if let Some(mut delegate) = self.delegate.take() {
            delegate.detach_editor();
        }
        ResultCode::Ok
    }

    fn set_bus_arrangements(
        &mut self,
        inputs: &[SpeakerArrangement],
        outputs: &[SpeakerArrangement],
    ) -> ResultCode {
        report(
            "set_bus_arrangements",
            self.processor.set_bus_arrangements(inputs, outputs),
        )
    }

    fn setup_processing(&mut self, setup: ProcessSetup) -> ResultCode {
        report("setup_processing", self.processor.setup_processing(setup))
    }

    fn can_process_sample_size(&self, format: SampleFormat) -> ResultCode {
        if self.processor.can_process_sample_size(format) {
            ResultCode::Ok
        } else {
            ResultCode::False
        }
    }

    fn set_active(&mut self, active: bool) -> ResultCode {
        report("set_active", self.processor.set_active(active))
    }

    /// Not logged: runs on the audio thread.
    fn process(&mut self, block: &mut ProcessBlock<'_>) -> ResultCode {
        match self.processor.process(block) {
            Ok(()) => ResultCode::Ok,
            Err(e) => ResultCode::from(&e),
        }
    }

    fn set_state(&mut self, bytes: &[u8]) -> ResultCode {
        let code = report("set_state", self.processor.set_state(bytes));
        if code.is_ok() {
            if let Some(delegate) = self.delegate.as_mut() {
                delegate.on_restore_state();
            }
        }
        code
    }

    fn get_state(&self, out: &mut Vec<u8>) -> ResultCode {
        report("get_state", self.processor.get_state(out))
    }

    fn latency_samples(&self) -> u32 {
        self.processor.latency()
    }
}

impl<P: Plugin> Drop for PluginComponent<P> {
    fn drop(&mut self) {
        if self.processor.state() != ProcessorState::Terminated {
            self.terminate();
        }
    }
}
