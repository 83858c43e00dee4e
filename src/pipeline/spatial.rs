//! Spatialization parameters: distance roll-off, off-axis attenuation, and
//! inter-aural phase.
//!
//! All angles live in the horizontal `(x, z)` plane; the `y` component
//! contributes to distance only. Angles are degrees in `(-180, 180]`,
//! positive toward the listener's right.

use crate::{MixerConfig, Pose};

/// Per-pair mixing parameters computed once per source per listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialParams {
    /// Composite attenuation: distance * per-source ratio * off-axis.
    pub attenuation: f32,
    /// Weak-ear delay in samples.
    pub delay_samples: usize,
    /// Weak-ear amplitude ratio in `[1 - phase_amp_ratio_at_90, 1]`.
    pub weak_ratio: f32,
    /// True when the source sits to the listener's right, putting the near
    /// ear on the right channel. An angle of exactly zero chooses the left.
    pub source_on_right: bool,
}

impl SpatialParams {
    /// Parameters for a listener hearing itself: no attenuation, no phase.
    pub fn identity() -> Self {
        Self {
            attenuation: 1.0,
            delay_samples: 0,
            weak_ratio: 1.0,
            source_on_right: false,
        }
    }

    /// Computes the parameters for `source` as heard by `listener`.
    ///
    /// `distance_coeff` is supplied by the caller so it can be memoized per
    /// unordered pair within a frame.
    pub fn compute(
        listener: &Pose,
        source: &Pose,
        source_attenuation: f32,
        distance_coeff: f32,
        config: &MixerConfig,
    ) -> Self {
        let absolute = absolute_angle_to_source(listener, source);
        let bearing_relative = wrap_degrees(absolute - listener.bearing);
        let angle_of_delivery = wrap_degrees(absolute - source.bearing);

        let off_axis = config.max_off_axis_atten
            + config.off_axis_step() * (angle_of_delivery.abs() / 90.0);

        let attenuation = distance_coeff * source_attenuation * off_axis;

        let sin_ratio = bearing_relative.to_radians().sin().abs();
        let delay_samples = (config.phase_delay_at_90 as f32 * sin_ratio).round() as usize;
        let weak_ratio = 1.0 - config.phase_amp_ratio_at_90 * sin_ratio;

        Self {
            attenuation,
            delay_samples,
            weak_ratio,
            source_on_right: bearing_relative > 0.0,
        }
    }
}

/// Distance attenuation coefficient: `min(1, 0.5^(log3(ratio * d) - 1))`.
///
/// Unity below the reference distance, then a smooth roll-off that halves
/// for every tripling of distance.
pub fn distance_coefficient(distance: f32, ratio: f32) -> f32 {
    let exponent = (ratio * distance).ln() / 3.0f32.ln() - 1.0;
    0.5f32.powf(exponent).min(1.0)
}

/// Maps an angle in degrees into `(-180, 180]`.
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle % 360.0;
    if wrapped > 180.0 {
        wrapped - 360.0
    } else if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Absolute bearing from the listener to the source, signed by quadrant.
/// Boundary positions (equal coordinates) fall into the first quadrant.
fn absolute_angle_to_source(listener: &Pose, source: &Pose) -> f32 {
    let dx = (source.position[0] - listener.position[0]).abs();
    let dz = (source.position[2] - listener.position[2]).abs();
    let triangle_angle = dz.atan2(dx).to_degrees();

    if source.position[0] >= listener.position[0] {
        if source.position[2] >= listener.position[2] {
            -90.0 + triangle_angle
        } else {
            -90.0 - triangle_angle
        }
    } else if source.position[2] >= listener.position[2] {
        90.0 - triangle_angle
    } else {
        90.0 + triangle_angle
    }
}

/// Frame-local memo of distance coefficients, keyed by unordered slot pair.
///
/// Rebuilt each frame; for the handful of sources a mixer carries, a dense
/// matrix is simpler than a map.
#[derive(Debug)]
pub struct DistanceCache {
    len: usize,
    coefficients: Vec<Option<f32>>,
}

impl DistanceCache {
    /// Creates a cache for `len` sources.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            coefficients: vec![None; len * len],
        }
    }

    /// Returns the memoized coefficient for the pair `(a, b)`, computing it
    /// on first access.
    pub fn coefficient(&mut self, a: usize, b: usize, compute: impl FnOnce() -> f32) -> f32 {
        let (low, high) = (a.min(b), a.max(b));
        let slot = &mut self.coefficients[low * self.len + high];
        *slot.get_or_insert_with(compute)
    }
}
