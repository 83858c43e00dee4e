//! Eligibility gate and saturating stereo mixing.

use crate::pipeline::{AudioRingBuffer, SpatialParams};

/// Per-frame classification of a source, evaluated before mixing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// The buffer has never been written; nothing to say yet.
    Skip,
    /// Buffering toward the jitter cushion; not mixed this frame.
    HeldBack {
        /// Samples available at evaluation time.
        available: usize,
        /// Cushion the source must exceed to become eligible.
        required: usize,
    },
    /// A started source that cannot fill a whole frame.
    Starved {
        /// Samples available at evaluation time.
        available: usize,
    },
    /// Contributes to this frame's mix.
    Eligible,
}

/// Decides whether a source contributes to the current frame.
///
/// The jitter cushion (one frame plus `jitter_samples`) applies only before
/// a source has started; once started, a source is starved as soon as it
/// cannot fill a whole frame, and must re-accumulate the cushion.
pub fn classify(
    buffer: &AudioRingBuffer,
    samples_per_frame: usize,
    jitter_samples: usize,
) -> Eligibility {
    if !buffer.has_been_written() {
        return Eligibility::Skip;
    }

    let available = buffer.available();
    if !buffer.is_started() && available <= samples_per_frame + jitter_samples {
        Eligibility::HeldBack {
            available,
            required: samples_per_frame + jitter_samples,
        }
    } else if available < samples_per_frame {
        Eligibility::Starved { available }
    } else {
        Eligibility::Eligible
    }
}

/// Planar stereo accumulation buffer, re-zeroed per listener per frame.
///
/// Sources mix into it with true two-sided saturating addition; the
/// interleaved frame is produced at emission time.
#[derive(Debug)]
pub struct StereoScratch {
    left: Vec<i16>,
    right: Vec<i16>,
}

impl StereoScratch {
    /// Creates a scratch for frames of `samples_per_frame` per channel.
    pub fn new(samples_per_frame: usize) -> Self {
        Self {
            left: vec![0; samples_per_frame],
            right: vec![0; samples_per_frame],
        }
    }

    /// Zeroes both channels for the next listener.
    pub fn clear(&mut self) {
        self.left.fill(0);
        self.right.fill(0);
    }

    /// Samples per channel.
    pub fn samples_per_frame(&self) -> usize {
        self.left.len()
    }

    /// Mixes one frame of `buffer` into the scratch.
    ///
    /// The near ear receives the attenuated signal as-is; the far ear
    /// receives it weakened by `weak_ratio` and delayed by `delay_samples`,
    /// with the pre-roll pulled from the ring's look-back window (audio from
    /// the previous frame).
    pub fn mix_source(&mut self, buffer: &AudioRingBuffer, params: &SpatialParams) {
        let frame = self.left.len();
        let delay = params.delay_samples;
        let (good, delayed) = if params.source_on_right {
            (&mut self.right, &mut self.left)
        } else {
            (&mut self.left, &mut self.right)
        };

        for i in 0..frame {
            if i < delay {
                // Pre-roll: the delayed channel starts with samples the near
                // ear already heard at the end of the previous frame.
                let earlier = f32::from(buffer.index(i as i64 - delay as i64)) * params.attenuation;
                saturating_mix(&mut delayed[i], (earlier * params.weak_ratio) as i16);
            }

            let current = (f32::from(buffer.index(i as i64)) * params.attenuation) as i16;
            saturating_mix(&mut good[i], current);

            if i + delay < frame {
                saturating_mix(
                    &mut delayed[i + delay],
                    (f32::from(current) * params.weak_ratio) as i16,
                );
            }
        }
    }

    /// Emits the scratch as interleaved `L, R` samples.
    pub fn interleaved(&self) -> Vec<i16> {
        let mut samples = Vec::with_capacity(self.left.len() * 2);
        for (&l, &r) in self.left.iter().zip(&self.right) {
            samples.push(l);
            samples.push(r);
        }
        samples
    }
}

/// Adds `add` into `sample`, clamping at both 16-bit bounds.
fn saturating_mix(sample: &mut i16, add: i16) {
    let sum = i32::from(*sample) + i32::from(add);
    *sample = sum.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
}
