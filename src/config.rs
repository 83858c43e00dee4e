//! Configuration for the mixer core.

use std::time::Duration;

use crate::MixerError;

/// Configuration for mixing behavior.
///
/// Use [`MixerConfig::default()`] for the nominal settings, or customize as
/// needed. All sources are assumed to stream at `sample_rate`; the mixer does
/// no resampling.
///
/// # Example
///
/// ```
/// use spatial_mix::MixerConfig;
///
/// let config = MixerConfig {
///     samples_per_frame: 512,
///     ..Default::default()
/// };
/// assert_eq!(config.ring_capacity(), 5120);
/// ```
#[derive(Debug, Clone)]
pub struct MixerConfig {
    /// Nominal sample rate in Hz.
    ///
    /// Default: 22050
    pub sample_rate: u32,

    /// Frame size per channel in samples.
    ///
    /// Smaller values reduce latency but increase per-frame overhead.
    /// Default: 256
    pub samples_per_frame: usize,

    /// Ring buffer size in frames.
    ///
    /// Each source buffers up to `ring_frames * samples_per_frame` samples
    /// before overflowing. Default: 10
    pub ring_frames: usize,

    /// Startup jitter cushion in milliseconds.
    ///
    /// A source is held out of the mix until it has buffered one frame plus
    /// this cushion, which prevents chattering starvations at stream start.
    /// Default: 12
    pub jitter_msecs: u32,

    /// Number of interframe gaps accumulated per gap-tracker interval.
    ///
    /// Default: 50
    pub gap_interval_samples: u32,

    /// Number of intervals in the gap-tracker sliding window.
    ///
    /// Default: 32
    pub gap_window_intervals: usize,

    /// Distance attenuation scale.
    ///
    /// The roll-off stays at unity below `3 / distance_ratio` metres.
    /// Default: 10
    pub distance_ratio: f32,

    /// Floor of the off-axis attenuation coefficient, reached when a source
    /// faces perpendicular to (or away from) the listener.
    ///
    /// Default: 0.2
    pub max_off_axis_atten: f32,

    /// Weak-ear amplitude reduction for a source at 90 degrees off the
    /// listener's facing.
    ///
    /// Default: 0.5
    pub phase_amp_ratio_at_90: f32,

    /// Weak-ear delay in samples for a source at 90 degrees off the
    /// listener's facing.
    ///
    /// Default: 20
    pub phase_delay_at_90: u32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            samples_per_frame: 256,
            ring_frames: 10,
            jitter_msecs: 12,
            gap_interval_samples: 50,
            gap_window_intervals: 32,
            distance_ratio: 10.0,
            max_off_axis_atten: 0.2,
            phase_amp_ratio_at_90: 0.5,
            phase_delay_at_90: 20,
        }
    }
}

impl MixerConfig {
    /// Jitter cushion converted to samples at the nominal rate.
    pub fn jitter_samples(&self) -> usize {
        (self.jitter_msecs as usize * self.sample_rate as usize) / 1000
    }

    /// Per-source ring capacity in samples.
    pub fn ring_capacity(&self) -> usize {
        self.samples_per_frame * self.ring_frames
    }

    /// Audio time covered by one frame.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(self.samples_per_frame as f64 / f64::from(self.sample_rate))
    }

    /// Slope of the off-axis attenuation: the coefficient runs linearly from
    /// 1 on-axis down to `max_off_axis_atten` at 90 degrees and beyond.
    pub(crate) fn off_axis_step(&self) -> f32 {
        (1.0 - self.max_off_axis_atten) / 2.0
    }

    pub(crate) fn validate(&self) -> Result<(), MixerError> {
        if self.sample_rate == 0 {
            return Err(MixerError::InvalidConfig {
                reason: "sample_rate must be positive".to_string(),
            });
        }
        if self.samples_per_frame == 0 {
            return Err(MixerError::InvalidConfig {
                reason: "samples_per_frame must be positive".to_string(),
            });
        }
        if self.ring_frames < 2 {
            return Err(MixerError::InvalidConfig {
                reason: "ring_frames must be at least 2".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.max_off_axis_atten) {
            return Err(MixerError::InvalidConfig {
                reason: "max_off_axis_atten must be within [0, 1]".to_string(),
            });
        }
        Ok(())
    }
}
