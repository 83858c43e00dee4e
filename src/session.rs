//! Mixer session management.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::pipeline::MixerCommand;
use crate::MixerError;

/// Default timeout for graceful shutdown operations.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Statistics about a running mixer.
///
/// All counters are cumulative since the session started.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Frame ticks processed.
    pub frames_mixed: u64,
    /// Packets applied to source buffers.
    pub packets_ingested: u64,
    /// Ring buffer overflow resets.
    pub buffer_overflows: u64,
    /// Mix-time starvations.
    pub starvations: u64,
    /// Frames that finished past their scheduled deadline.
    pub cadence_slips: u64,
}

/// Internal state shared between the Session handle and the mixer task.
pub(crate) struct SessionState {
    pub running: AtomicBool,
    pub frames_mixed: AtomicU64,
    pub packets_ingested: AtomicU64,
    pub buffer_overflows: AtomicU64,
    pub starvations: AtomicU64,
    pub cadence_slips: AtomicU64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            frames_mixed: AtomicU64::new(0),
            packets_ingested: AtomicU64::new(0),
            buffer_overflows: AtomicU64::new(0),
            starvations: AtomicU64::new(0),
            cadence_slips: AtomicU64::new(0),
        }
    }
}

/// Handle to a running mixer.
///
/// Returned by [`SpatialMixBuilder::start()`]; the mixer loop runs in a
/// background task until [`stop()`](Session::stop) is called or the handle
/// is dropped.
///
/// # Example
///
/// ```ignore
/// let session = SpatialMix::builder()
///     .packet_source(packet_rx)
///     .add_sink(ChannelSink::new(frame_tx))
///     .start()
///     .await?;
///
/// // Mixing runs in the background...
/// tokio::time::sleep(Duration::from_secs(10)).await;
///
/// session.stop().await?;
/// ```
///
/// [`SpatialMixBuilder::start()`]: crate::SpatialMixBuilder::start
pub struct Session {
    state: Arc<SessionState>,
    cmd_tx: mpsc::Sender<MixerCommand>,
    mixer_handle: Option<JoinHandle<()>>,
}

impl Session {
    pub(crate) fn new(
        state: Arc<SessionState>,
        cmd_tx: mpsc::Sender<MixerCommand>,
        mixer_handle: JoinHandle<()>,
    ) -> Self {
        Self {
            state,
            cmd_tx,
            mixer_handle: Some(mixer_handle),
        }
    }

    /// Returns `true` if the mixer loop is still running.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Returns current session statistics.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames_mixed: self.state.frames_mixed.load(Ordering::SeqCst),
            packets_ingested: self.state.packets_ingested.load(Ordering::SeqCst),
            buffer_overflows: self.state.buffer_overflows.load(Ordering::SeqCst),
            starvations: self.state.starvations.load(Ordering::SeqCst),
            cadence_slips: self.state.cadence_slips.load(Ordering::SeqCst),
        }
    }

    /// Gracefully stops the mixer.
    ///
    /// Packets still queued on the inbound channel are discarded.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` reserves room for sinks that fail
    /// to flush on shutdown.
    pub async fn stop(mut self) -> Result<(), MixerError> {
        self.stop_internal().await;
        Ok(())
    }

    async fn stop_internal(&mut self) {
        if !self.state.running.swap(false, Ordering::SeqCst) {
            // Already stopped
            return;
        }

        // Wake the mixer if it is sleeping out a frame interval.
        let _ = tokio::time::timeout(
            Duration::from_millis(100),
            self.cmd_tx.send(MixerCommand::Stop),
        )
        .await;

        if let Some(handle) = self.mixer_handle.take() {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
                tracing::warn!("Mixer task did not complete within timeout");
            }
        }
    }

    /// Signals shutdown without waiting, for use from Drop.
    fn signal_stop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);
        let _ = self.cmd_tx.try_send(MixerCommand::Stop);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state.running.load(Ordering::SeqCst) {
            // Dropped without explicit stop() - signal the task and let it
            // wind down on its own; Drop must not block.
            self.signal_stop();
        }
    }
}
