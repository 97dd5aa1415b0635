//! Host notification boundary.
//!
//! The host's component handler is abstracted behind [`HostNotifier`]. The
//! [`HostAdapter`] maps plugin-level [`HostEvent`]s onto it: each event
//! produces exactly one host call, failures are logged and never retried.

use crate::error::Result;
use std::sync::Arc;

/// Why the plugin asks the host to re-query it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestartReason {
    /// Parameter names, ranges or display strings changed.
    ParamTitlesChanged,
    LatencyChanged,
}

/// Events the plugin raises toward the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    ParameterDetailsChanged,
    LatencyChanged,
    EditorResized { width: u32, height: u32 },
}

/// Calls the plugin may make into the host.
///
/// Edit calls are fire-and-forget. Implementations are invoked from the UI
/// thread (edits, resize) or the thread that changes latency.
pub trait HostNotifier: Send + Sync {
    fn begin_edit(&self, param_index: usize);
    fn perform_edit(&self, param_index: usize, normalized: f64);
    fn end_edit(&self, param_index: usize);

    /// Hosts without group edits ignore these.
    fn begin_group_edit(&self) {}
    fn end_group_edit(&self) {}

    fn restart_component(&self, reason: RestartReason) -> Result<()>;
    fn resize_view(&self, width: u32, height: u32) -> Result<()>;
}

/// Host used before one is connected, and by tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl HostNotifier for NullHost {
    fn begin_edit(&self, _param_index: usize) {}
    fn perform_edit(&self, _param_index: usize, _normalized: f64) {}
    fn end_edit(&self, _param_index: usize) {}

    fn restart_component(&self, _reason: RestartReason) -> Result<()> {
        Ok(())
    }

    fn resize_view(&self, _width: u32, _height: u32) -> Result<()> {
        Ok(())
    }
}

/// Shared handle to the host. Cloning is cheap.
#[derive(Clone)]
pub struct HostAdapter {
    host: Arc<dyn HostNotifier>,
}

impl HostAdapter {
    pub fn new(host: Arc<dyn HostNotifier>) -> Self {
        Self { host }
    }

    pub fn null() -> Self {
        Self::new(Arc::new(NullHost))
    }

    /// Forward one event as one host call. Returns whether the host accepted it.
    pub fn notify(&self, event: HostEvent) -> bool {
        let result = match event {
            HostEvent::ParameterDetailsChanged => self
                .host
                .restart_component(RestartReason::ParamTitlesChanged),
            HostEvent::LatencyChanged => self.host.restart_component(RestartReason::LatencyChanged),
            HostEvent::EditorResized { width, height } => self.host.resize_view(width, height),
        };

        match result {
            Ok(()) => {
                tracing::debug!("Host notified: {:?}", event);
                true
            }
            Err(e) => {
                tracing::warn!("Host rejected {:?}: {}", event, e);
                false
            }
        }
    }

    pub fn begin_edit(&self, param_index: usize) {
        self.host.begin_edit(param_index);
    }

    pub fn perform_edit(&self, param_index: usize, normalized: f64) {
        self.host.perform_edit(param_index, normalized);
    }

    pub fn end_edit(&self, param_index: usize) {
        self.host.end_edit(param_index);
    }

    pub fn begin_group_edit(&self) {
        self.host.begin_group_edit();
    }

    pub fn end_group_edit(&self) {
        self.host.end_group_edit();
    }
}

impl Default for HostAdapter {
    fn default() -> Self {
        Self::null()
    }
}
