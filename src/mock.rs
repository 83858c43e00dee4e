//! Mock voice source for testing without a network.

use std::time::Duration;

use crate::{AudioPacket, Pose, StreamTag};

/// Generates deterministic packet streams for testing and demos.
///
/// A `MockVoice` stands in for a remote participant or injector: it
/// accumulates synthetic PCM and chops it into [`AudioPacket`]s carrying the
/// voice's pose, exactly as the network collaborator would. This allows
/// exercising the full pipeline in CI with no sockets involved.
///
/// # Example
///
/// ```
/// use spatial_mix::{MockVoice, Pose};
///
/// let mut voice = MockVoice::microphone("10.0.0.2:5001", 22050)
///     .with_pose(Pose::new([1.0, 0.0, 0.0], 90.0));
///
/// voice.generate_sine(440.0, 100);
/// let packets = voice.drain_packets(256);
/// assert!(!packets.is_empty());
/// ```
pub struct MockVoice {
    identity: String,
    stream_tag: Option<StreamTag>,
    pose: Pose,
    attenuation: f32,
    loopback: bool,
    sample_rate: u32,
    samples: Vec<i16>,
}

impl MockVoice {
    /// Creates a mock participant microphone.
    pub fn microphone(identity: impl Into<String>, sample_rate: u32) -> Self {
        Self {
            identity: identity.into(),
            stream_tag: None,
            pose: Pose::default(),
            attenuation: 1.0,
            loopback: false,
            sample_rate,
            samples: Vec::new(),
        }
    }

    /// Creates a mock injector stream with the given tag.
    pub fn injector(tag: StreamTag, sample_rate: u32) -> Self {
        Self {
            identity: format!("injector:{tag}"),
            stream_tag: Some(tag),
            pose: Pose::default(),
            attenuation: 1.0,
            loopback: false,
            sample_rate,
            samples: Vec::new(),
        }
    }

    /// Sets the voice's pose.
    #[must_use]
    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    /// Sets the injector attenuation ratio.
    #[must_use]
    pub fn with_attenuation(mut self, attenuation: f32) -> Self {
        self.attenuation = attenuation;
        self
    }

    /// Sets the loopback flag on generated microphone packets.
    #[must_use]
    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    /// Updates the pose for subsequently generated packets.
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// Generates silence for the given duration in milliseconds.
    pub fn generate_silence(&mut self, duration_ms: u64) {
        let num_samples = self.samples_for_duration(duration_ms);
        self.samples.extend(std::iter::repeat(0i16).take(num_samples));
    }

    /// Generates a sine wave at the given frequency for the given duration.
    pub fn generate_sine(&mut self, frequency: f64, duration_ms: u64) {
        let num_samples = self.samples_for_duration(duration_ms);
        let sample_rate = f64::from(self.sample_rate);
        let start = self.samples.len();

        for i in 0..num_samples {
            let t = (start + i) as f64 / sample_rate;
            let value = (2.0 * std::f64::consts::PI * frequency * t).sin();
            self.samples.push((value * 16000.0) as i16);
        }
    }

    /// Generates a constant-amplitude signal, convenient for assertions.
    pub fn generate_level(&mut self, level: i16, duration_ms: u64) {
        let num_samples = self.samples_for_duration(duration_ms);
        self.samples.extend(std::iter::repeat(level).take(num_samples));
    }

    /// Adds raw samples directly.
    pub fn add_samples(&mut self, samples: &[i16]) {
        self.samples.extend_from_slice(samples);
    }

    /// Returns the duration of accumulated audio.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Drains all accumulated audio into packets of `samples_per_packet`
    /// samples each. The final packet may be shorter.
    pub fn drain_packets(&mut self, samples_per_packet: usize) -> Vec<AudioPacket> {
        let samples = std::mem::take(&mut self.samples);
        samples
            .chunks(samples_per_packet)
            .map(|chunk| self.packet_from(chunk))
            .collect()
    }

    /// Drains up to `samples` samples into a single packet. Returns `None`
    /// when no audio is accumulated.
    pub fn next_packet(&mut self, samples: usize) -> Option<AudioPacket> {
        if self.samples.is_empty() {
            return None;
        }
        let take = samples.min(self.samples.len());
        let chunk: Vec<i16> = self.samples.drain(..take).collect();
        Some(self.packet_from(&chunk))
    }

    fn packet_from(&self, samples: &[i16]) -> AudioPacket {
        let payload = AudioPacket::payload_from_samples(samples);
        match self.stream_tag {
            None => AudioPacket::microphone(self.identity.as_str(), self.pose, payload)
                .with_loopback(self.loopback),
            Some(tag) => AudioPacket::injector(tag, self.pose, self.attenuation, payload),
        }
    }

    fn samples_for_duration(&self, duration_ms: u64) -> usize {
        (u64::from(self.sample_rate) * duration_ms / 1000) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_silence() {
        let mut voice = MockVoice::microphone("mic", 22050);
        voice.generate_silence(100);

        let packets = voice.drain_packets(256);
        let total: usize = packets.iter().map(|p| p.samples().len()).sum();
        assert_eq!(total, 2205);
        assert!(packets
            .iter()
            .all(|p| p.samples().iter().all(|&s| s == 0)));
    }

    #[test]
    fn test_mock_sine_has_signal() {
        let mut voice = MockVoice::microphone("mic", 22050);
        voice.generate_sine(440.0, 100);

        let packets = voice.drain_packets(256);
        assert!(packets
            .iter()
            .any(|p| p.samples().iter().any(|&s| s != 0)));
    }

    #[test]
    fn test_packets_carry_pose_and_loopback() {
        let pose = Pose::new([1.0, 2.0, 3.0], 45.0);
        let mut voice = MockVoice::microphone("mic", 22050)
            .with_pose(pose)
            .with_loopback(true);
        voice.generate_level(100, 50);

        let packets = voice.drain_packets(256);
        assert!(packets.iter().all(|p| p.pose == pose && p.loopback));
    }

    #[test]
    fn test_injector_packets_carry_tag_and_attenuation() {
        let tag = StreamTag::new([5; 8]);
        let mut voice = MockVoice::injector(tag, 22050).with_attenuation(0.3);
        voice.generate_level(500, 50);

        let packets = voice.drain_packets(256);
        assert!(packets
            .iter()
            .all(|p| p.stream_tag == Some(tag) && p.attenuation == 0.3));
    }

    #[test]
    fn test_next_packet_drains_incrementally() {
        let mut voice = MockVoice::microphone("mic", 22050);
        voice.add_samples(&[1, 2, 3, 4, 5]);

        let first = voice.next_packet(2).unwrap();
        assert_eq!(first.samples(), vec![1, 2]);

        let second = voice.next_packet(10).unwrap();
        assert_eq!(second.samples(), vec![3, 4, 5]);

        assert!(voice.next_packet(10).is_none());
    }

    #[test]
    fn test_duration() {
        let mut voice = MockVoice::microphone("mic", 22050);
        voice.generate_silence(500);
        assert_eq!(voice.duration(), Duration::from_secs_f64(11025.0 / 22050.0));
    }
}
