//! Runtime events for monitoring mixer health.
//!
//! Events are non-fatal notifications about mixer behavior. The mixer
//! continues running after events are emitted - they're for logging/metrics,
//! not error handling.

use std::sync::Arc;
use std::time::Duration;

use crate::{SourceId, SourceKind};

/// Runtime events emitted by the mixer loop.
///
/// These are informational events, not errors. The mixer recovers locally
/// from every one of them. Use the [`EventCallback`] to log these or update
/// metrics.
///
/// # Example
///
/// ```
/// use spatial_mix::MixerEvent;
///
/// fn handle_event(event: MixerEvent) {
///     match event {
///         MixerEvent::BufferOverflow { source_id, dropped_samples } => {
///             eprintln!("{source_id}: dropped {dropped_samples} samples");
///         }
///         MixerEvent::SourceStarved { source_id, available } => {
///             eprintln!("{source_id}: starved with {available} samples");
///         }
///         other => eprintln!("{other:?}"),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub enum MixerEvent {
    /// A packet arrived from an unknown identity and a source was created.
    SourceRegistered {
        /// Identity of the new source.
        source_id: SourceId,
        /// Whether it is a microphone or an injector stream.
        kind: SourceKind,
    },

    /// A write crossed a source's read cursor; the ring was reset and the
    /// packet's audio dropped.
    BufferOverflow {
        /// Source whose ring overflowed.
        source_id: SourceId,
        /// Samples discarded, including everything buffered at reset time.
        dropped_samples: usize,
    },

    /// A started source could not fill a whole frame and was skipped.
    ///
    /// The source must re-accumulate the jitter cushion before it is mixed
    /// again.
    SourceStarved {
        /// Source that starved.
        source_id: SourceId,
        /// Samples available at mix time.
        available: usize,
    },

    /// A source is buffering toward its jitter cushion and was not mixed.
    SourceHeldBack {
        /// Source being held back.
        source_id: SourceId,
        /// Samples available at mix time.
        available: usize,
        /// Samples required before the source becomes eligible.
        required: usize,
    },

    /// Frame processing overran its slot in the cadence schedule.
    ///
    /// The mixer proceeds immediately without catch-up; each frame still
    /// represents exactly one frame of audio time.
    FrameSlipped {
        /// Index of the late frame.
        frame: u64,
        /// How far past the scheduled time the frame completed.
        behind: Duration,
    },

    /// A source's gap tracker completed a new sliding-window maximum.
    ///
    /// Telemetry for jitter-buffer sizing; the mixer does not act on it.
    GapWindowUpdated {
        /// Source the measurement belongs to.
        source_id: SourceId,
        /// Worst interframe arrival gap across the window.
        window_max: Duration,
    },

    /// A sink rejected a frame. The frame is dropped for that sink.
    SinkError {
        /// Name of the sink that errored.
        sink_name: String,
        /// Description of the error.
        error: String,
    },
}

/// Callback type for receiving runtime events.
///
/// Register an event callback via [`SpatialMixBuilder::on_event()`] to
/// receive notifications about overflow, starvation, cadence slips, and sink
/// errors.
///
/// [`SpatialMixBuilder::on_event()`]: crate::SpatialMixBuilder::on_event
pub type EventCallback = Arc<dyn Fn(MixerEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// This is a convenience function for creating event callbacks without
/// manually wrapping in `Arc`.
///
/// # Example
///
/// ```
/// use spatial_mix::{event_callback, MixerEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(MixerEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}
