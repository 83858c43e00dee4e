//! Application of inbound packets to source state.

use tracing::warn;

use crate::pipeline::{SourceRegistry, WriteOutcome};
use crate::{AudioPacket, MixerConfig, SourceKind};

/// What happened when a packet was applied.
#[derive(Debug, Clone, Copy)]
pub struct IngestOutcome {
    /// Slot of the source the packet was applied to.
    pub source_index: usize,
    /// True if this packet created the source.
    pub created: bool,
    /// The ring buffer write result.
    pub write: WriteOutcome,
    /// Samples lost if the write overflowed: everything buffered at reset
    /// time plus the incoming audio.
    pub dropped_samples: usize,
}

/// Resolves (or creates) the packet's source, records the arrival with its
/// gap tracker, refreshes pose, and appends the PCM payload to its ring.
///
/// Returns `None` for an injector packet without a stream tag, which the
/// protocol layer should never produce.
pub fn apply_packet(
    registry: &mut SourceRegistry,
    config: &MixerConfig,
    packet: &AudioPacket,
) -> Option<IngestOutcome> {
    let (source_index, created) = match packet.kind {
        SourceKind::Microphone => registry.resolve_microphone(&packet.source_id, config),
        SourceKind::Injector => {
            let Some(tag) = packet.stream_tag else {
                warn!(source = %packet.source_id, "injector packet without stream tag, ignoring");
                return None;
            };
            registry.resolve_injector(tag, config)
        }
    };

    let source = registry.get_mut(source_index);
    source.pose = packet.pose;
    match packet.kind {
        SourceKind::Microphone => source.loopback = packet.loopback,
        SourceKind::Injector => source.attenuation = packet.attenuation.clamp(0.0, 1.0),
    }

    source.gaps.frame_received();

    let samples = packet.samples();
    let buffered_before = source.buffer.available();
    let write = source.buffer.write_samples(&samples);
    let dropped_samples = if write.overflowed {
        buffered_before + samples.len().min(source.buffer.capacity())
    } else {
        0
    };

    Some(IngestOutcome {
        source_index,
        created,
        write,
        dropped_samples,
    })
}
