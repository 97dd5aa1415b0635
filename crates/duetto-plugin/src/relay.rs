//! Relay thread forwarding one bridge endpoint over an envelope transport.
//!
//! In the processor's process the relay holds the [`EditorEndpoint`](crate::EditorEndpoint)
//! and stands in for the remote editor; in the editor's process it holds the
//! [`ProcessorEndpoint`](crate::ProcessorEndpoint) and stands in for the
//! remote processor. Neither side's threads ever touch the socket.

use crate::bridge::Endpoint;
use crate::error::Result;
use crate::transport::{is_disconnect, EnvelopeTransport};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Counters shared with the relay thread.
#[derive(Debug, Default)]
pub struct RelayStats {
    forwarded: AtomicU64,
    received: AtomicU64,
    rejected: AtomicU64,
}

impl RelayStats {
    /// Envelopes written to the peer.
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Envelopes read from the peer and queued locally.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Envelopes read from the peer and dropped (malformed or queue full).
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Relay thread handle. Stops and joins the thread when dropped.
pub struct RelayHandle {
    running: Arc<AtomicBool>,
    stats: Arc<RelayStats>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Start relaying `endpoint` over a connected socket.
    pub fn spawn<E>(endpoint: E, stream: UnixStream) -> Result<Self>
    where
        E: Endpoint + Clone + Sync,
        E::Incoming: Send,
        E::Outgoing: Send,
    {
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(RelayStats::default());

        let thread_handle = thread::Builder::new().name("duetto-relay".to_string()).spawn({
            let running = Arc::clone(&running);
            let stats = Arc::clone(&stats);
            move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        tracing::error!("Relay runtime failed to start: {}", e);
                        return;
                    }
                };
                runtime.block_on(relay_main(endpoint, stream, running, stats));
            }
        })?;

        Ok(Self {
            running,
            stats,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// False once stopped or the peer disconnected.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn relay_main<E>(
    endpoint: E,
    stream: UnixStream,
    running: Arc<AtomicBool>,
    stats: Arc<RelayStats>,
) where
    E: Endpoint + Clone + Sync,
    E::Incoming: Send,
    E::Outgoing: Send,
{
    let transport = match EnvelopeTransport::from_std(stream) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Relay could not adopt socket: {}", e);
            running.store(false, Ordering::Release);
            return;
        }
    };
    let (mut reader, mut writer) = transport.into_split();

    let reader_task = tokio::spawn({
        let endpoint = endpoint.clone();
        let running = Arc::clone(&running);
        let stats = Arc::clone(&stats);
        async move {
            loop {
                let envelope = match reader.recv().await {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        if is_disconnect(&e) {
                            tracing::debug!("Relay peer disconnected");
                        } else {
                            tracing::warn!("Relay read failed: {}", e);
                        }
                        running.store(false, Ordering::Release);
                        return;
                    }
                };
                let queued = match <E::Outgoing>::try_from(&envelope) {
                    Ok(msg) => endpoint.send_message(msg),
                    Err(e) => {
                        tracing::warn!("Dropping envelope '{}': {}", envelope.opcode(), e);
                        stats.rejected.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                };
                match queued {
                    Ok(()) => stats.received.fetch_add(1, Ordering::Relaxed),
                    Err(_) => stats.rejected.fetch_add(1, Ordering::Relaxed),
                };
            }
        }
    });

    let mut tick = tokio::time::interval(POLL_INTERVAL);
    let mut batch = Vec::new();
    loop {
        let keep_going = running.load(Ordering::Acquire);
        endpoint.drain_messages(&mut |msg| batch.push(E::to_envelope(&msg)));
        for envelope in batch.drain(..) {
            if let Err(e) = writer.send(&envelope).await {
                if !is_disconnect(&e) {
                    tracing::warn!("Relay write failed: {}", e);
                }
                running.store(false, Ordering::Release);
                reader_task.abort();
                return;
            }
            stats.forwarded.fetch_add(1, Ordering::Relaxed);
        }
        // One last drain after a stop request so nothing queued before it is lost.
        if !keep_going {
            break;
        }
        tick.tick().await;
    }
    reader_task.abort();
}
