//! The mixing pipeline.
//!
//! One task owns everything between the inbound packet channel and the
//! sinks:
//!
//! ```text
//! Packet Channel → Ingest → Per-Source Rings → Gate → Mix → Sinks
//! ```
//!
//! Ingest runs between frames, never concurrently with mixing, so ring
//! buffers are mutated from exactly one place.

mod cadence;
mod gap_history;
mod ingest;
mod mix;
mod mixer;
mod registry;
mod ring_buffer;
mod source;
mod spatial;

pub use gap_history::InterframeGapHistory;
pub use ring_buffer::{AudioRingBuffer, WriteOutcome};

pub(crate) use cadence::FrameCadence;
pub(crate) use ingest::apply_packet;
pub(crate) use mix::{classify, Eligibility, StereoScratch};
pub(crate) use mixer::{Mixer, MixerCommand};
pub(crate) use registry::SourceRegistry;
pub(crate) use source::SourceState;
pub(crate) use spatial::{distance_coefficient, DistanceCache, SpatialParams};
