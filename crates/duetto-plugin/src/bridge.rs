//! Two-queue bridge between the editor and the processor.
//!
//! UI thread ⇄ [`EditorEndpoint`] ⇄ queues ⇄ [`ProcessorEndpoint`] ⇄ audio thread.
//!
//! Each queue has exactly one producer thread and one consumer thread.
//! Endpoints are cheap to clone (shared state is behind Arcs) but every
//! clone of one endpoint must stay on that endpoint's thread.

use crate::error::{PluginError, Result};
use crate::protocol::{EditorMessage, Envelope, ProcessorMessage};
use crate::queue::MessageQueue;
use std::sync::Arc;

const TO_PROCESSOR: &str = "editor->processor";
const TO_EDITOR: &str = "processor->editor";

/// Overflow counters for both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub to_processor_dropped: u64,
    pub to_editor_dropped: u64,
}

/// Create a connected pair of endpoints with `capacity` slots per direction.
pub fn channel(capacity: usize) -> (EditorEndpoint, ProcessorEndpoint) {
    let to_processor = Arc::new(MessageQueue::new(TO_PROCESSOR, capacity));
    let to_editor = Arc::new(MessageQueue::new(TO_EDITOR, capacity));

    let editor = EditorEndpoint {
        outbound: Arc::clone(&to_processor),
        inbound: Arc::clone(&to_editor),
    };
    let processor = ProcessorEndpoint {
        outbound: to_editor,
        inbound: to_processor,
    };
    (editor, processor)
}

fn stats(
    to_processor: &MessageQueue<EditorMessage>,
    to_editor: &MessageQueue<ProcessorMessage>,
) -> BridgeStats {
    BridgeStats {
        to_processor_dropped: to_processor.dropped(),
        to_editor_dropped: to_editor.dropped(),
    }
}

/// UI-thread side.
#[derive(Clone)]
pub struct EditorEndpoint {
    outbound: Arc<MessageQueue<EditorMessage>>,
    inbound: Arc<MessageQueue<ProcessorMessage>>,
}

impl EditorEndpoint {
    /// Queue a message for the processor. Overflow is logged and the message dropped.
    pub fn send(&self, msg: EditorMessage) -> Result<()> {
        self.outbound.push(msg).map_err(|rejected| {
            tracing::warn!(
                queue = self.outbound.name(),
                dropped = self.outbound.dropped(),
                "Queue full, dropping {:?}",
                rejected
            );
            PluginError::QueueFull(self.outbound.name())
        })
    }

    /// Deliver every pending processor message to `handler`, in FIFO order.
    pub fn drain(&self, handler: impl FnMut(ProcessorMessage)) -> usize {
        self.inbound.drain(handler)
    }

    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    pub fn stats(&self) -> BridgeStats {
        stats(&self.outbound, &self.inbound)
    }
}

/// Audio-thread side. Nothing here logs, locks, or allocates.
#[derive(Clone)]
pub struct ProcessorEndpoint {
    outbound: Arc<MessageQueue<ProcessorMessage>>,
    inbound: Arc<MessageQueue<EditorMessage>>,
}

impl ProcessorEndpoint {
    /// Queue a message for the editor. Returns `false` if it was dropped.
    pub fn send(&self, msg: ProcessorMessage) -> bool {
        self.outbound.push(msg).is_ok()
    }

    /// Deliver every pending editor message to `handler`, in FIFO order.
    pub fn drain(&self, handler: impl FnMut(EditorMessage)) -> usize {
        self.inbound.drain(handler)
    }

    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    pub fn stats(&self) -> BridgeStats {
        stats(&self.inbound, &self.outbound)
    }
}

/// One side of the bridge, as seen by a relay that forwards it over a wire.
///
/// `Incoming` is what this endpoint drains; `Outgoing` is what it sends.
pub trait Endpoint: Send + 'static {
    type Incoming;
    type Outgoing: for<'a> TryFrom<&'a Envelope, Error = crate::error::ProtocolError>;

    fn send_message(&self, msg: Self::Outgoing) -> Result<()>;
    fn drain_messages(&self, handler: &mut dyn FnMut(Self::Incoming)) -> usize;
    fn to_envelope(msg: &Self::Incoming) -> Envelope;
}

impl Endpoint for EditorEndpoint {
    type Incoming = ProcessorMessage;
    type Outgoing = EditorMessage;

    fn send_message(&self, msg: EditorMessage) -> Result<()> {
        self.send(msg)
    }

    fn drain_messages(&self, handler: &mut dyn FnMut(ProcessorMessage)) -> usize {
        self.drain(handler)
    }

    fn to_envelope(msg: &ProcessorMessage) -> Envelope {
        Envelope::from(msg)
    }
}

impl Endpoint for ProcessorEndpoint {
    type Incoming = EditorMessage;
    type Outgoing = ProcessorMessage;

    fn send_message(&self, msg: ProcessorMessage) -> Result<()> {
        if self.send(msg) {
            Ok(())
        } else {
            Err(PluginError::QueueFull(self.outbound.name()))
        }
    }

    fn drain_messages(&self, handler: &mut dyn FnMut(EditorMessage)) -> usize {
        self.drain(handler)
    }

    fn to_envelope(msg: &EditorMessage) -> Envelope {
        Envelope::from(msg)
    }
}
