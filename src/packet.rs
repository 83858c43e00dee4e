//! Inbound packet shape: source identity, pose, and raw PCM payload.

use std::sync::Arc;

/// Number of bytes in an injector stream tag.
pub const STREAM_TAG_LEN: usize = 8;

/// Unique identifier for an audio source.
///
/// `SourceId` is a lightweight, cloneable identifier supplied by the network
/// collaborator - typically the sender's address or an assigned id. It uses
/// `Arc<str>` internally for efficient cloning and comparison.
///
/// # Example
///
/// ```
/// use spatial_mix::SourceId;
///
/// let alice = SourceId::new("10.0.0.2:5001");
/// let bob = SourceId::new("10.0.0.3:5001");
///
/// assert_ne!(alice, bob);
/// assert_eq!(alice, SourceId::new("10.0.0.2:5001"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(Arc<str>);

impl SourceId {
    /// Creates a new source ID from a string.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for SourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Fixed-length byte tag identifying an injector stream.
///
/// Injector packets carry no sender identity; streams are matched by
/// comparing this tag byte-wise against registered injectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamTag([u8; STREAM_TAG_LEN]);

impl StreamTag {
    /// Creates a tag from exactly [`STREAM_TAG_LEN`] bytes.
    pub fn new(bytes: [u8; STREAM_TAG_LEN]) -> Self {
        Self(bytes)
    }

    /// Creates a tag from a byte slice, or `None` if the length is wrong.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    /// Returns the raw tag bytes.
    pub fn as_bytes(&self) -> &[u8; STREAM_TAG_LEN] {
        &self.0
    }
}

impl std::fmt::Display for StreamTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// The kind of source behind a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A participant's microphone stream. Participants are also listeners.
    Microphone,
    /// A synthesized or pre-recorded stream. Injectors are never listeners.
    Injector,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Microphone => write!(f, "microphone"),
            Self::Injector => write!(f, "injector"),
        }
    }
}

/// A source's position and facing in the virtual environment.
///
/// Positions are metres; bearing is azimuth in degrees in the horizontal
/// plane. The `y` component contributes to distance attenuation but not to
/// angular placement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// Position as `[x, y, z]`.
    pub position: [f32; 3],
    /// Facing azimuth in degrees.
    pub bearing: f32,
}

impl Pose {
    /// Creates a pose at the given position, facing `bearing` degrees.
    pub fn new(position: [f32; 3], bearing: f32) -> Self {
        Self { position, bearing }
    }

    /// Euclidean distance to another pose.
    pub fn distance_to(&self, other: &Pose) -> f32 {
        let dx = self.position[0] - other.position[0];
        let dy = self.position[1] - other.position[1];
        let dz = self.position[2] - other.position[2];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// An inbound audio packet, as handed over by the network collaborator
/// after the protocol header has been stripped.
///
/// The payload is raw little-endian signed 16-bit PCM at the nominal sample
/// rate. A trailing odd byte is dropped during byte-to-sample truncation.
///
/// # Example
///
/// ```
/// use spatial_mix::{AudioPacket, Pose};
///
/// let samples = vec![100i16; 256];
/// let packet = AudioPacket::microphone(
///     "10.0.0.2:5001",
///     Pose::new([1.0, 0.0, 2.0], 90.0),
///     AudioPacket::payload_from_samples(&samples),
/// );
/// assert_eq!(packet.payload.len(), 512);
/// ```
#[derive(Debug, Clone)]
pub struct AudioPacket {
    /// Whether this packet came from a microphone or an injector.
    pub kind: SourceKind,
    /// Sender identity. For injectors this is derived from the stream tag.
    pub source_id: SourceId,
    /// Stream tag; present on injector packets only.
    pub stream_tag: Option<StreamTag>,
    /// The sender's current pose.
    pub pose: Pose,
    /// Per-source attenuation ratio in `[0, 1]`. Microphones send `1.0`.
    pub attenuation: f32,
    /// Whether the sender wants to hear its own stream mixed back.
    pub loopback: bool,
    /// Raw little-endian i16 PCM bytes.
    pub payload: Vec<u8>,
}

impl AudioPacket {
    /// Creates a microphone packet.
    pub fn microphone(source_id: impl Into<SourceId>, pose: Pose, payload: Vec<u8>) -> Self {
        Self {
            kind: SourceKind::Microphone,
            source_id: source_id.into(),
            stream_tag: None,
            pose,
            attenuation: 1.0,
            loopback: false,
            payload,
        }
    }

    /// Creates an injector packet for the given stream tag.
    pub fn injector(tag: StreamTag, pose: Pose, attenuation: f32, payload: Vec<u8>) -> Self {
        Self {
            kind: SourceKind::Injector,
            source_id: SourceId::new(format!("injector:{tag}")),
            stream_tag: Some(tag),
            pose,
            attenuation,
            loopback: false,
            payload,
        }
    }

    /// Sets the loopback flag.
    #[must_use]
    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    /// Encodes samples as a little-endian payload.
    pub fn payload_from_samples(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    /// Decodes the payload into samples, dropping any trailing odd byte.
    pub fn samples(&self) -> Vec<i16> {
        self.payload
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }
}
