//! Per-source mixer state.

use crate::pipeline::{AudioRingBuffer, InterframeGapHistory};
use crate::{MixerConfig, Pose, SourceId, SourceKind, StreamTag};

/// Everything the mixer tracks for one audio source.
///
/// A source is created on its first packet and owns its ring buffer and gap
/// tracker. `should_mix` is transient: the eligibility gate raises it each
/// frame and the post-mix advance clears it.
#[derive(Debug)]
pub struct SourceState {
    /// Identity the registry keys this source by.
    pub id: SourceId,
    /// Microphone or injector.
    pub kind: SourceKind,
    /// Stream tag for injector streams.
    pub stream_tag: Option<StreamTag>,
    /// Jitter-absorbing PCM store.
    pub buffer: AudioRingBuffer,
    /// Arrival-gap telemetry.
    pub gaps: InterframeGapHistory,
    /// Latest position and facing reported by the sender.
    pub pose: Pose,
    /// Per-source attenuation ratio in `[0, 1]`.
    pub attenuation: f32,
    /// Whether this source hears its own stream.
    pub loopback: bool,
    /// Raised by the eligibility gate when this source contributes to the
    /// current frame; cleared after read cursors advance.
    pub should_mix: bool,
}

impl SourceState {
    /// Creates a microphone source with a fresh default buffer and tracker.
    pub fn microphone(id: SourceId, config: &MixerConfig) -> Self {
        Self::new(id, SourceKind::Microphone, None, config)
    }

    /// Creates an injector source for the given stream tag.
    pub fn injector(tag: StreamTag, config: &MixerConfig) -> Self {
        let id = SourceId::new(format!("injector:{tag}"));
        Self::new(id, SourceKind::Injector, Some(tag), config)
    }

    fn new(
        id: SourceId,
        kind: SourceKind,
        stream_tag: Option<StreamTag>,
        config: &MixerConfig,
    ) -> Self {
        Self {
            id,
            kind,
            stream_tag,
            buffer: AudioRingBuffer::new(config.samples_per_frame, config.ring_frames, false),
            gaps: InterframeGapHistory::new(
                config.gap_interval_samples,
                config.gap_window_intervals,
            ),
            pose: Pose::default(),
            attenuation: 1.0,
            loopback: false,
            should_mix: false,
        }
    }

    /// True for sources that receive a personalized mix.
    pub fn is_listener(&self) -> bool {
        self.kind == SourceKind::Microphone
    }
}
