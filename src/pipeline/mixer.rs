//! The mixer loop task.
//!
//! A single task owns the registry, every ring buffer, and the stereo
//! scratch. Each frame it drains the inbound packet channel, classifies
//! sources, produces one personalized frame per listener, advances read
//! cursors, and sleeps until the next scheduled tick. Ring buffers are
//! never touched from any other task.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::pipeline::{
    apply_packet, classify, distance_coefficient, DistanceCache, Eligibility, FrameCadence,
    SourceRegistry, SpatialParams, StereoScratch,
};
use crate::session::SessionState;
use crate::sink::Sink;
use crate::{AudioPacket, EventCallback, MixerConfig, MixerEvent, StereoFrame};

/// Command sent to the mixer task.
pub enum MixerCommand {
    /// Stop the mixer gracefully.
    Stop,
}

/// The mixer loop: owns all per-source state and produces one stereo frame
/// per listener per tick.
pub struct Mixer {
    config: MixerConfig,
    registry: SourceRegistry,
    scratch: StereoScratch,
    sinks: Vec<Arc<dyn Sink>>,
    event_callback: Option<EventCallback>,
    state: Arc<SessionState>,
    frame_index: u64,
}

impl Mixer {
    /// Creates a mixer with the given sinks.
    pub fn new(
        config: MixerConfig,
        sinks: Vec<Arc<dyn Sink>>,
        event_callback: Option<EventCallback>,
        state: Arc<SessionState>,
    ) -> Self {
        let scratch = StereoScratch::new(config.samples_per_frame);
        Self {
            config,
            registry: SourceRegistry::new(),
            scratch,
            sinks,
            event_callback,
            state,
            frame_index: 0,
        }
    }

    fn emit_event(&self, event: MixerEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }

    /// Applies one inbound packet to its source.
    fn ingest(&mut self, packet: &AudioPacket) {
        let Some(outcome) = apply_packet(&mut self.registry, &self.config, packet) else {
            return;
        };
        self.state.packets_ingested.fetch_add(1, Ordering::Relaxed);

        if outcome.created {
            let source = self.registry.get(outcome.source_index);
            debug!(source = %source.id, kind = %source.kind, "registered new source");
            self.emit_event(MixerEvent::SourceRegistered {
                source_id: source.id.clone(),
                kind: source.kind,
            });
        }

        if outcome.write.overflowed {
            self.state.buffer_overflows.fetch_add(1, Ordering::Relaxed);
            let source_id = self.registry.get(outcome.source_index).id.clone();
            self.emit_event(MixerEvent::BufferOverflow {
                source_id,
                dropped_samples: outcome.dropped_samples,
            });
        }
    }

    /// Runs the eligibility gate over every source.
    fn classify_sources(&mut self) {
        let samples_per_frame = self.config.samples_per_frame;
        let jitter_samples = self.config.jitter_samples();
        let mut starvations = 0;
        let mut events = Vec::new();

        for source in self.registry.iter_mut() {
            match classify(&source.buffer, samples_per_frame, jitter_samples) {
                Eligibility::Skip => source.should_mix = false,
                Eligibility::HeldBack {
                    available,
                    required,
                } => {
                    debug!(source = %source.id, available, required, "held back awaiting jitter cushion");
                    events.push(MixerEvent::SourceHeldBack {
                        source_id: source.id.clone(),
                        available,
                        required,
                    });
                    source.should_mix = false;
                }
                Eligibility::Starved { available } => {
                    warn!(source = %source.id, available, "source starved");
                    events.push(MixerEvent::SourceStarved {
                        source_id: source.id.clone(),
                        available,
                    });
                    source.buffer.set_started(false);
                    source.should_mix = false;
                    starvations += 1;
                }
                Eligibility::Eligible => {
                    source.buffer.set_started(true);
                    source.should_mix = true;
                }
            }
        }

        self.state
            .starvations
            .fetch_add(starvations, Ordering::Relaxed);
        for event in events {
            self.emit_event(event);
        }
    }

    /// Produces one frame per listener from the sources flagged this tick.
    fn mix_listeners(&mut self) -> Vec<StereoFrame> {
        let mut cache = DistanceCache::new(self.registry.len());
        let mut frames = Vec::new();

        for listener_index in 0..self.registry.len() {
            let listener = self.registry.get(listener_index);
            if !listener.is_listener() {
                continue;
            }
            let listener_id = listener.id.clone();
            let listener_pose = listener.pose;
            let listener_loopback = listener.loopback;

            self.scratch.clear();

            for source_index in 0..self.registry.len() {
                if source_index == listener_index && !listener_loopback {
                    continue;
                }
                let source = self.registry.get(source_index);
                if !source.should_mix {
                    continue;
                }

                let params = if source_index == listener_index {
                    SpatialParams::identity()
                } else {
                    let source_pose = source.pose;
                    let distance_ratio = self.config.distance_ratio;
                    let coeff = cache.coefficient(listener_index, source_index, || {
                        distance_coefficient(
                            listener_pose.distance_to(&source_pose),
                            distance_ratio,
                        )
                    });
                    SpatialParams::compute(
                        &listener_pose,
                        &source_pose,
                        source.attenuation,
                        coeff,
                        &self.config,
                    )
                };

                self.scratch.mix_source(&source.buffer, &params);
            }

            frames.push(StereoFrame {
                listener: listener_id,
                samples: self.scratch.interleaved(),
                sample_rate: self.config.sample_rate,
                frame_index: self.frame_index,
            });
        }

        frames
    }

    /// Pushes the read cursor past the consumed frame on every contributing
    /// source, after all listeners have mixed from it.
    fn advance_read_cursors(&mut self) {
        let frame = self.config.samples_per_frame as i64;
        for source in self.registry.iter_mut() {
            if source.should_mix {
                source.buffer.shift_read(frame);
                source.should_mix = false;
            }
        }
    }

    /// Surfaces freshly-completed gap-window maxima as telemetry.
    fn drain_gap_telemetry(&mut self) {
        let mut updates = Vec::new();
        for source in self.registry.iter_mut() {
            if source.gaps.has_new_window_max() {
                updates.push((source.id.clone(), source.gaps.drain_window_max()));
            }
        }
        for (source_id, window_max) in updates {
            self.emit_event(MixerEvent::GapWindowUpdated {
                source_id,
                window_max,
            });
        }
    }

    /// Delivers the tick's frames to every sink concurrently.
    ///
    /// Frames are perishable: a failed write is surfaced as an event and the
    /// frame is dropped for that sink, never retried.
    async fn deliver(&self, frames: &[StereoFrame]) {
        let writes = self.sinks.iter().flat_map(|sink| {
            frames.iter().map(move |frame| async move {
                (sink.name().to_string(), sink.write(frame).await)
            })
        });

        for (sink_name, result) in join_all(writes).await {
            if let Err(error) = result {
                self.emit_event(MixerEvent::SinkError {
                    sink_name,
                    error: error.to_string(),
                });
            }
        }
    }

    /// One full frame tick: drain, classify, mix, deliver, advance.
    async fn step(&mut self, packet_rx: &mut mpsc::Receiver<AudioPacket>) {
        while let Ok(packet) = packet_rx.try_recv() {
            self.ingest(&packet);
        }

        self.classify_sources();
        let frames = self.mix_listeners();
        self.deliver(&frames).await;
        self.advance_read_cursors();
        self.drain_gap_telemetry();

        self.frame_index += 1;
        self.state.frames_mixed.fetch_add(1, Ordering::Relaxed);
    }

    /// Runs the mixer until a stop command arrives.
    ///
    /// This is the main entry point for the mixer task.
    pub async fn run(
        mut self,
        mut packet_rx: mpsc::Receiver<AudioPacket>,
        mut cmd_rx: mpsc::Receiver<MixerCommand>,
    ) {
        let mut cadence =
            FrameCadence::new(self.config.samples_per_frame, self.config.sample_rate);

        while self.state.running.load(Ordering::SeqCst) {
            self.step(&mut packet_rx).await;

            let tick = cadence.schedule_next();
            if tick.behind > Duration::ZERO {
                warn!(
                    frame = tick.frame,
                    behind_us = tick.behind.as_micros() as u64,
                    "frame slipped past its deadline"
                );
                self.state.cadence_slips.fetch_add(1, Ordering::Relaxed);
                self.emit_event(MixerEvent::FrameSlipped {
                    frame: tick.frame,
                    behind: tick.behind,
                });
                // No catch-up: proceed immediately, checking for shutdown.
                if let Ok(MixerCommand::Stop) = cmd_rx.try_recv() {
                    break;
                }
            } else {
                tokio::select! {
                    () = tokio::time::sleep_until(tick.deadline) => {}
                    Some(cmd) = cmd_rx.recv() => match cmd {
                        MixerCommand::Stop => break,
                    },
                }
            }
        }

        self.stop_sinks().await;
        self.state.running.store(false, Ordering::SeqCst);
    }

    /// Flushes every sink on the way out.
    async fn stop_sinks(&self) {
        for sink in &self.sinks {
            if let Err(error) = sink.on_stop().await {
                self.emit_event(MixerEvent::SinkError {
                    sink_name: sink.name().to_string(),
                    error: format!("Error during shutdown: {error}"),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pose, SourceId};

    fn mixer_with_config(config: MixerConfig) -> Mixer {
        Mixer::new(config, Vec::new(), None, Arc::new(SessionState::new()))
    }

    fn small_config() -> MixerConfig {
        MixerConfig {
            samples_per_frame: 4,
            ring_frames: 4,
            jitter_msecs: 0,
            ..MixerConfig::default()
        }
    }

    fn mic_packet(id: &str, pose: Pose, samples: &[i16]) -> AudioPacket {
        AudioPacket::microphone(id, pose, AudioPacket::payload_from_samples(samples))
    }

    fn frame_for<'a>(frames: &'a [StereoFrame], id: &str) -> &'a StereoFrame {
        frames
            .iter()
            .find(|frame| frame.listener == SourceId::new(id))
            .unwrap()
    }

    #[test]
    fn test_startup_hold_back_then_eligible() {
        let config = MixerConfig {
            sample_rate: 11000, // jitter cushion of 132 samples at 12ms
            samples_per_frame: 256,
            ..MixerConfig::default()
        };
        assert_eq!(config.jitter_samples(), 132);
        let mut mixer = mixer_with_config(config);

        // One frame buffered: held back, frame is silence.
        mixer.ingest(&mic_packet("a", Pose::default(), &[1000; 256]));
        mixer.ingest(&mic_packet("b", Pose::default(), &[0; 512]));
        mixer.classify_sources();
        let frames = mixer.mix_listeners();
        assert!(frame_for(&frames, "b").is_silent());
        mixer.advance_read_cursors();

        // A second frame raises available to 512 > 388: mixed now.
        mixer.ingest(&mic_packet("a", Pose::default(), &[1000; 256]));
        mixer.ingest(&mic_packet("b", Pose::default(), &[0; 512]));
        mixer.classify_sources();
        let frames = mixer.mix_listeners();
        assert!(!frame_for(&frames, "b").is_silent());
    }

    #[test]
    fn test_listener_without_loopback_hears_silence_alone() {
        let mut mixer = mixer_with_config(small_config());

        // Plenty of audio buffered, but the only other source is itself.
        for _ in 0..3 {
            mixer.ingest(&mic_packet("solo", Pose::default(), &[9000; 4]));
        }
        mixer.classify_sources();
        let frames = mixer.mix_listeners();

        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_silent());
    }

    #[test]
    fn test_loopback_listener_hears_itself() {
        let mut mixer = mixer_with_config(small_config());

        for _ in 0..3 {
            let packet = mic_packet("solo", Pose::default(), &[9000; 4]).with_loopback(true);
            mixer.ingest(&packet);
        }
        mixer.classify_sources();
        let frames = mixer.mix_listeners();

        let (left, right) = frames[0].split_channels();
        assert_eq!(left, vec![9000; 4]);
        assert_eq!(right, vec![9000; 4]);
    }

    #[test]
    fn test_no_eligible_sources_emits_zero_frame() {
        let mut mixer = mixer_with_config(small_config());

        mixer.ingest(&mic_packet("listener", Pose::default(), &[500; 12]));
        // Other source exists but never wrote: skipped.
        let (other, _) = mixer
            .registry
            .resolve_microphone(&SourceId::new("quiet"), &small_config());
        assert!(!mixer.registry.get(other).buffer.has_been_written());

        mixer.classify_sources();
        let frames = mixer.mix_listeners();
        assert!(frame_for(&frames, "listener").is_silent());
    }

    #[test]
    fn test_advance_clears_should_mix_and_consumes_frame() {
        let mut mixer = mixer_with_config(small_config());

        mixer.ingest(&mic_packet("a", Pose::default(), &[1, 2, 3, 4, 5, 6, 7, 8]));
        mixer.classify_sources();
        let available_before = mixer.registry.get(0).buffer.available();
        assert!(mixer.registry.get(0).should_mix);

        mixer.advance_read_cursors();
        assert!(!mixer.registry.get(0).should_mix);
        assert_eq!(
            mixer.registry.get(0).buffer.available(),
            available_before - 4
        );
    }

    #[test]
    fn test_two_listeners_hear_each_other_positioned() {
        let mut mixer = mixer_with_config(small_config());
        let west = Pose::new([1.0, 0.0, 0.0], 0.0);
        let east = Pose::new([-1.0, 0.0, 0.0], 0.0);

        for _ in 0..3 {
            mixer.ingest(&mic_packet("west", west, &[8000; 4]));
            mixer.ingest(&mic_packet("east", east, &[8000; 4]));
        }
        mixer.classify_sources();
        let frames = mixer.mix_listeners();
        assert_eq!(frames.len(), 2);

        // Each hears the other, not itself, and the frames are not silent.
        let west_frame = frame_for(&frames, "west");
        let east_frame = frame_for(&frames, "east");
        assert!(!west_frame.is_silent());
        assert!(!east_frame.is_silent());

        // From west's seat the other source sits to one side; the first
        // samples of the near-ear channel lead the far-ear channel.
        let (left, right) = west_frame.split_channels();
        assert_ne!(left, right);
    }

    #[test]
    fn test_saturation_with_co_located_full_scale_sources() {
        let mut mixer = mixer_with_config(small_config());
        let spot = Pose::default();

        for _ in 0..3 {
            mixer.ingest(&mic_packet("loud-1", spot, &[i16::MAX; 4]));
            mixer.ingest(&mic_packet("loud-2", spot, &[i16::MAX; 4]));
            mixer.ingest(&mic_packet("ear", spot, &[0; 4]));
        }
        mixer.classify_sources();
        let frames = mixer.mix_listeners();

        let (left, _right) = frame_for(&frames, "ear").split_channels();
        // Two full-scale co-located sources saturate the near ear rather
        // than wrapping.
        assert_eq!(left, vec![i16::MAX; 4]);
    }

    #[test]
    fn test_injectors_do_not_receive_frames() {
        let mut mixer = mixer_with_config(small_config());
        let tag = crate::StreamTag::new([3; 8]);

        for _ in 0..3 {
            let packet = AudioPacket::injector(
                tag,
                Pose::default(),
                1.0,
                AudioPacket::payload_from_samples(&[4000; 4]),
            );
            mixer.ingest(&packet);
            mixer.ingest(&mic_packet("ear", Pose::default(), &[0; 4]));
        }
        mixer.classify_sources();
        let frames = mixer.mix_listeners();

        // Only the microphone is a listener; it hears the injector.
        assert_eq!(frames.len(), 1);
        assert!(!frames[0].is_silent());
    }

    #[test]
    fn test_starvation_counted_and_unstarted() {
        let mut mixer = mixer_with_config(small_config());

        mixer.ingest(&mic_packet("a", Pose::default(), &[1; 8]));
        mixer.classify_sources();
        mixer.advance_read_cursors();
        mixer.classify_sources();
        mixer.advance_read_cursors();

        // Buffer now empty; source was started, so the next gate starves it.
        mixer.classify_sources();
        assert!(!mixer.registry.get(0).buffer.is_started());
        assert_eq!(mixer.state.starvations.load(Ordering::SeqCst), 1);
    }
}
