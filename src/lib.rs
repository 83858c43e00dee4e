//! # spatial-mix
//!
//! Real-time per-listener spatial voice mixing for networked virtual
//! environments.
//!
//! `spatial-mix` takes mono microphone and injector streams arriving as
//! network packets and produces, for each participant, a personalized stereo
//! mix that excludes their own voice (unless loopback is requested) and
//! positions every other source in 3D space: distance roll-off, off-axis
//! attenuation, inter-aural delay, and inter-aural amplitude.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spatial_mix::{AudioPacket, ChannelSink, SpatialMix, StereoFrame};
//! use tokio::sync::mpsc;
//!
//! // The network layer feeds packets in; mixed frames come out per listener.
//! let (packet_tx, packet_rx) = mpsc::channel::<AudioPacket>(256);
//! let (frame_tx, mut frame_rx) = mpsc::channel::<StereoFrame>(100);
//!
//! let session = SpatialMix::builder()
//!     .packet_source(packet_rx)
//!     .add_sink(ChannelSink::new(frame_tx))
//!     .on_event(|e| tracing::warn!(?e, "mixer event"))
//!     .start()
//!     .await?;
//!
//! // Send each listener's frames back over the wire.
//! while let Some(frame) = frame_rx.recv().await {
//!     // frame.listener, frame.samples (interleaved L,R) ...
//! }
//!
//! session.stop().await?;
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict task boundary:
//!
//! - **Packet Channel**: The network collaborator pushes owned packet
//!   records; nothing else crosses the boundary
//! - **Mixer Task**: Owns every ring buffer and the registry; drains
//!   ingest between frames, gates sources on the jitter cushion, mixes,
//!   and paces itself on a monotonic anchored schedule
//! - **Sinks**: Receive one stereo frame per listener per tick
//!
//! All failure conditions inside the core (overflow, starvation, cadence
//! slip, malformed payloads) recover locally and surface as
//! [`MixerEvent`]s - the mixer never aborts.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod config;
mod error;
mod event;
mod frame;
mod mock;
mod packet;
mod pipeline;
mod session;
mod sink;

pub use builder::{SpatialMix, SpatialMixBuilder};
pub use config::MixerConfig;
pub use error::{MixerError, SinkError};
pub use event::{event_callback, EventCallback, MixerEvent};
pub use frame::StereoFrame;
pub use mock::MockVoice;
pub use packet::{AudioPacket, Pose, SourceId, SourceKind, StreamTag, STREAM_TAG_LEN};
pub use pipeline::{AudioRingBuffer, InterframeGapHistory, WriteOutcome};
pub use session::{Session, SessionStats};
pub use sink::{ChannelSink, Sink, WavSink};
