//! UI-thread side of the plugin: routes processor messages to controls and
//! UI gestures to the host and the processor.

use crate::bridge::EditorEndpoint;
use crate::error::{PluginError, Result};
use crate::host::{HostAdapter, HostEvent};
use crate::protocol::{ControlTag, EditorMessage, Payload, ProcessorMessage};
use duetto_core::{MidiMessage, ParameterRegistry, SysExData};
use std::sync::Arc;

/// Opaque platform window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

/// A UI control, as far as message routing is concerned.
pub trait Control: Send {
    fn tag(&self) -> ControlTag {
        ControlTag::NONE
    }

    /// Parameter this control is bound to, if any.
    fn param_index(&self) -> Option<usize> {
        None
    }

    fn wants_midi(&self) -> bool {
        false
    }

    fn set_value_from_delegate(&mut self, normalized: f64);

    fn on_msg_from_delegate(&mut self, _message_tag: i32, _data: &[u8]) {}

    fn on_midi(&mut self, _msg: &MidiMessage) {}

    fn on_sysex(&mut self, _msg: &SysExData) {}
}

/// The graphics side of a plugin UI.
pub trait Editor: Send {
    fn controls_mut(&mut self) -> &mut [Box<dyn Control>];

    /// Create the native view inside `parent`.
    fn open_window(&mut self, parent: WindowHandle) -> Option<WindowHandle>;

    fn close_window(&mut self);

    fn size(&self) -> (u32, u32);

    fn on_display_scale(&mut self) {}

    /// Arbitrary message from the processor. Returns whether it was handled.
    fn on_arbitrary_message(&mut self, _message_tag: i32, _data: &[u8]) -> bool {
        false
    }

    fn on_idle(&mut self) {}
}

/// Owns at most one [`Editor`] and mediates everything it exchanges with the
/// host and the processor.
///
/// Lives on the UI thread. Parameter values are read from the shared
/// registry; edits made here are written to the registry, reported to the
/// host, and queued for the processor.
pub struct EditorDelegate {
    registry: Arc<ParameterRegistry>,
    endpoint: EditorEndpoint,
    host: HostAdapter,
    editor: Option<Box<dyn Editor>>,
    window_open: bool,
    size: Option<(u32, u32)>,
}

impl EditorDelegate {
    pub fn new(
        registry: Arc<ParameterRegistry>,
        endpoint: EditorEndpoint,
        host: HostAdapter,
        initial_size: Option<(u32, u32)>,
    ) -> Self {
        Self {
            registry,
            endpoint,
            host,
            editor: None,
            window_open: false,
            size: initial_size,
        }
    }

    pub fn registry(&self) -> &Arc<ParameterRegistry> {
        &self.registry
    }

    // ========================================================================
    // Editor lifecycle
    // ========================================================================

    /// Attach a graphics context, replacing (and releasing) any previous one.
    ///
    /// Every control bound to a parameter is brought up to date, then the
    /// editor is told to apply its display scale.
    pub fn attach_editor(&mut self, editor: Box<dyn Editor>) {
        if self.detach_editor() {
            tracing::debug!("Replacing attached editor");
        }
        self.editor = Some(editor);
        self.resync_parameters();
        if let Some(editor) = self.editor.as_mut() {
            editor.on_display_scale();
        }
    }

    /// Release the editor, closing its window first. Returns whether one was attached.
    pub fn detach_editor(&mut self) -> bool {
        self.close_window();
        self.editor.take().is_some()
    }

    pub fn has_editor(&self) -> bool {
        self.editor.is_some()
    }

    pub fn open_window(&mut self, parent: WindowHandle) -> Option<WindowHandle> {
        let editor = self.editor.as_mut()?;
        if self.window_open {
            editor.close_window();
            self.window_open = false;
        }
        let view = editor.open_window(parent);
        self.window_open = view.is_some();
        view
    }

    pub fn close_window(&mut self) {
        if !self.window_open {
            return;
        }
        if let Some(editor) = self.editor.as_mut() {
            editor.close_window();
        }
        self.window_open = false;
    }

    pub fn is_window_open(&self) -> bool {
        self.window_open
    }

    /// Push the current value of every parameter to its bound controls.
    /// Returns the number of parameters visited.
    pub fn resync_parameters(&mut self) -> usize {
        if self.editor.is_none() {
            return 0;
        }
        let registry = Arc::clone(&self.registry);
        for (index, param) in registry.iter().enumerate() {
            self.send_parameter_value_from_delegate(index, param.normalized());
        }
        registry.len()
    }

    /// Host state was restored: resync once.
    pub fn on_restore_state(&mut self) {
        let count = self.resync_parameters();
        tracing::debug!("Editor resynced {} parameters after state restore", count);
    }

    // ========================================================================
    // Processor → UI
    // ========================================================================

    fn controls_mut(&mut self) -> &mut [Box<dyn Control>] {
        match self.editor.as_mut() {
            Some(editor) => editor.controls_mut(),
            None => &mut [],
        }
    }

    /// Set the value of every control carrying `tag`. Returns how many were updated.
    pub fn send_control_value_from_delegate(&mut self, tag: ControlTag, normalized: f64) -> usize {
        if !tag.is_addressable() {
            return 0;
        }
        let mut count = 0;
        for control in self.controls_mut().iter_mut().filter(|c| c.tag() == tag) {
            control.set_value_from_delegate(normalized);
            count += 1;
        }
        count
    }

    pub fn send_control_msg_from_delegate(
        &mut self,
        tag: ControlTag,
        message_tag: i32,
        data: &[u8],
    ) -> usize {
        if !tag.is_addressable() {
            return 0;
        }
        let mut count = 0;
        for control in self.controls_mut().iter_mut().filter(|c| c.tag() == tag) {
            control.on_msg_from_delegate(message_tag, data);
            count += 1;
        }
        count
    }

    /// Set the value of every control bound to `param_index`.
    pub fn send_parameter_value_from_delegate(&mut self, param_index: usize, normalized: f64) -> usize {
        self.for_control_with_param(param_index, |control| {
            control.set_value_from_delegate(normalized)
        })
    }

    pub fn send_midi_msg_from_delegate(&mut self, msg: &MidiMessage) -> usize {
        let mut count = 0;
        for control in self.controls_mut().iter_mut().filter(|c| c.wants_midi()) {
            control.on_midi(msg);
            count += 1;
        }
        count
    }

    pub fn send_sysex_msg_from_delegate(&mut self, msg: &SysExData) -> usize {
        let mut count = 0;
        for control in self.controls_mut().iter_mut().filter(|c| c.wants_midi()) {
            control.on_sysex(msg);
            count += 1;
        }
        count
    }

    pub fn send_arbitrary_msg_from_delegate(&mut self, message_tag: i32, data: &[u8]) -> bool {
        match self.editor.as_mut() {
            Some(editor) => editor.on_arbitrary_message(message_tag, data),
            None => false,
        }
    }

    /// Apply `f` to every control bound to `param_index`. Returns how many matched.
    pub fn for_control_with_param(
        &mut self,
        param_index: usize,
        mut f: impl FnMut(&mut dyn Control),
    ) -> usize {
        let mut count = 0;
        for control in self.controls_mut().iter_mut() {
            if control.param_index() == Some(param_index) {
                f(control.as_mut());
                count += 1;
            }
        }
        count
    }

    /// Drain every pending processor message and deliver it to the controls.
    /// Called on each UI timer tick. Messages arriving with no editor attached
    /// are discarded.
    pub fn idle(&mut self) -> usize {
        let endpoint = self.endpoint.clone();
        let count = endpoint.drain(|msg| self.dispatch(msg));
        if let Some(editor) = self.editor.as_mut() {
            editor.on_idle();
        }
        count
    }

    fn dispatch(&mut self, msg: ProcessorMessage) {
        match msg {
            ProcessorMessage::ParamValueToUi {
                param_index,
                normalized,
            } => {
                // An editor in another process keeps its own table; later
                // resyncs read from it.
                let normalized = self
                    .registry
                    .set_normalized(param_index, normalized)
                    .unwrap_or(normalized);
                self.send_parameter_value_from_delegate(param_index, normalized);
            }
            ProcessorMessage::ControlValueToUi {
                control_tag,
                normalized,
            } => {
                self.send_control_value_from_delegate(control_tag, normalized);
            }
            ProcessorMessage::ControlMessageToUi {
                control_tag,
                message_tag,
                payload,
            } => {
                self.send_control_msg_from_delegate(control_tag, message_tag, payload.as_slice());
            }
            ProcessorMessage::ArbitraryMessageToUi {
                message_tag,
                payload,
            } => {
                if !self.send_arbitrary_msg_from_delegate(message_tag, payload.as_slice()) {
                    tracing::trace!("Unhandled arbitrary message {}", message_tag);
                }
            }
            ProcessorMessage::MidiFromProcessor(msg) => {
                self.send_midi_msg_from_delegate(&msg);
            }
            ProcessorMessage::SysExFromProcessor(msg) => {
                self.send_sysex_msg_from_delegate(&msg);
            }
        }
    }

    // ========================================================================
    // UI → host / processor
    // ========================================================================

    fn check_param(&self, param_index: usize) -> Result<()> {
        self.registry.get(param_index)?;
        Ok(())
    }

    pub fn begin_parameter_edit(&self, param_index: usize) -> Result<()> {
        self.check_param(param_index)?;
        self.host.begin_edit(param_index);
        Ok(())
    }

    /// A user gesture moved a parameter. The value is stored, reported to
    /// the host, and queued for the processor.
    pub fn parameter_changed_from_ui(&self, param_index: usize, normalized: f64) -> Result<()> {
        let stored = self.registry.set_normalized(param_index, normalized)?;
        self.host.perform_edit(param_index, stored);
        self.endpoint.send(EditorMessage::ControlValueChanged {
            control_tag: ControlTag::NONE,
            param_index: Some(param_index),
            normalized: stored,
        })
    }

    pub fn end_parameter_edit(&self, param_index: usize) -> Result<()> {
        self.check_param(param_index)?;
        self.host.end_edit(param_index);
        Ok(())
    }

    /// Report a batch of edits inside one host group edit.
    ///
    /// Every edit is attempted; the first failure is returned after the
    /// group is closed.
    pub fn dirty_parameters_from_ui(&self, edits: &[(usize, f64)]) -> Result<()> {
        if edits.is_empty() {
            return Ok(());
        }
        self.host.begin_group_edit();
        let mut first_error = None;
        for &(index, value) in edits {
            if let Err(e) = self.parameter_changed_from_ui(index, value) {
                first_error.get_or_insert(e);
            }
        }
        self.host.end_group_edit();
        first_error.map_or(Ok(()), Err)
    }

    /// A control moved. Bound controls go through the parameter path.
    pub fn control_value_changed_from_ui(&self, tag: ControlTag, normalized: f64) -> Result<()> {
        self.endpoint.send(EditorMessage::ControlValueChanged {
            control_tag: tag,
            param_index: None,
            normalized: normalized.clamp(0.0, 1.0),
        })
    }

    pub fn send_control_msg_from_ui(
        &self,
        tag: ControlTag,
        message_tag: i32,
        data: &[u8],
    ) -> Result<()> {
        self.endpoint.send(EditorMessage::ControlMessage {
            control_tag: tag,
            message_tag,
            payload: Payload::new(data)?,
        })
    }

    pub fn send_arbitrary_msg_from_ui(&self, message_tag: i32, data: &[u8]) -> Result<()> {
        self.endpoint.send(EditorMessage::ArbitraryMessage {
            message_tag,
            payload: Payload::new(data)?,
        })
    }

    pub fn send_midi_msg_from_ui(&self, msg: MidiMessage) -> Result<()> {
        self.endpoint.send(EditorMessage::MidiFromUi(msg))
    }

    pub fn send_sysex_msg_from_ui(&self, msg: SysExData) -> Result<()> {
        self.endpoint.send(EditorMessage::SysExFromUi(msg))
    }

    /// Ask the host to resize the view. Only forwarded when the size changed.
    pub fn resize_from_ui(&mut self, width: u32, height: u32) -> Result<bool> {
        if width == 0 || height == 0 {
            return Err(PluginError::Editor(format!(
                "invalid editor size {}x{}",
                width, height
            )));
        }
        if self.size == Some((width, height)) {
            return Ok(false);
        }
        self.size = Some((width, height));
        Ok(self.host.notify(HostEvent::EditorResized { width, height }))
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }
}

impl Drop for EditorDelegate {
    fn drop(&mut self) {
        self.detach_editor();
    }
}
