//! Tokio mpsc channel sink implementation.

use crate::sink::Sink;
use crate::{SinkError, StereoFrame};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A sink that sends mixed frames to a tokio mpsc channel.
///
/// This is the primary way to get frames out of the mixer - typically into
/// the network layer that packetizes each listener's mix back to them.
///
/// # Example
///
/// ```
/// use spatial_mix::{ChannelSink, StereoFrame};
/// use tokio::sync::mpsc;
///
/// let (tx, mut rx) = mpsc::channel::<StereoFrame>(100);
/// let sink = ChannelSink::new(tx);
///
/// // Use sink with the SpatialMix builder...
/// // Then receive frames:
/// // while let Some(frame) = rx.recv().await { ... }
/// ```
pub struct ChannelSink {
    name: String,
    sender: mpsc::Sender<StereoFrame>,
}

impl ChannelSink {
    /// Creates a new channel sink with the given sender.
    ///
    /// Size the channel for your consumer: frames arrive at the frame
    /// cadence (about 86 per second per listener at the defaults).
    pub fn new(sender: mpsc::Sender<StereoFrame>) -> Self {
        Self {
            name: "channel".to_string(),
            sender,
        }
    }

    /// Creates a new channel sink with a custom name.
    pub fn with_name(name: impl Into<String>, sender: mpsc::Sender<StereoFrame>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }
}

#[async_trait]
impl Sink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, frame: &StereoFrame) -> Result<(), SinkError> {
        self.sender
            .send(frame.clone())
            .await
            .map_err(|_| SinkError::ChannelClosed)
    }
}
