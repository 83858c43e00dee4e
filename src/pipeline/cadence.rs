//! Fixed-interval frame pacing.

use std::time::Duration;

use tokio::time::Instant;

/// Paces frame emission at the nominal sample rate.
///
/// The schedule anchors once at construction: frame `n` is due at
/// `start + n * samples_per_frame / sample_rate`, computed from the frame
/// counter each tick so scheduling error never accumulates. When processing
/// overruns its slot the mixer proceeds immediately without catch-up; each
/// frame still represents exactly one frame of audio time.
#[derive(Debug)]
pub struct FrameCadence {
    start: Instant,
    samples_per_frame: u64,
    sample_rate: u64,
    next_frame: u64,
}

/// One scheduling decision from [`FrameCadence::schedule_next`].
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// Index of the frame the deadline belongs to.
    pub frame: u64,
    /// When that frame is due.
    pub deadline: Instant,
    /// How far past the deadline we already are; zero when on time.
    pub behind: Duration,
}

impl FrameCadence {
    /// Anchors a new schedule at the current instant.
    pub fn new(samples_per_frame: usize, sample_rate: u32) -> Self {
        Self {
            start: Instant::now(),
            samples_per_frame: samples_per_frame as u64,
            sample_rate: u64::from(sample_rate),
            next_frame: 0,
        }
    }

    /// Index of the most recently scheduled frame.
    pub fn current_frame(&self) -> u64 {
        self.next_frame
    }

    /// Advances the schedule by one frame and reports its deadline.
    ///
    /// `behind` is non-zero when the deadline already passed: the caller
    /// should log the slip and continue without sleeping.
    pub fn schedule_next(&mut self) -> Tick {
        self.next_frame += 1;
        let deadline = self.start + self.audio_time(self.next_frame);
        Tick {
            frame: self.next_frame,
            deadline,
            behind: Instant::now().saturating_duration_since(deadline),
        }
    }

    /// Exact audio time covered by `frames` frames.
    fn audio_time(&self, frames: u64) -> Duration {
        let nanos = (u128::from(frames) * u128::from(self.samples_per_frame) * 1_000_000_000)
            / u128::from(self.sample_rate);
        Duration::from_nanos(nanos as u64)
    }
}
