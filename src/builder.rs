//! Builder pattern for `SpatialMix`.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::pipeline::Mixer;
use crate::session::{Session, SessionState};
use crate::sink::Sink;
use crate::{event_callback, AudioPacket, EventCallback, MixerConfig, MixerError, MixerEvent};

/// Builder for configuring and starting the mixer.
///
/// Use [`SpatialMix::builder()`] to create a new builder.
///
/// # Example
///
/// ```ignore
/// use spatial_mix::{ChannelSink, SpatialMix, StereoFrame, AudioPacket};
/// use tokio::sync::mpsc;
///
/// let (packet_tx, packet_rx) = mpsc::channel::<AudioPacket>(256);
/// let (frame_tx, mut frame_rx) = mpsc::channel::<StereoFrame>(100);
///
/// let session = SpatialMix::builder()
///     .packet_source(packet_rx)
///     .add_sink(ChannelSink::new(frame_tx))
///     .on_event(|e| tracing::warn!(?e, "mixer event"))
///     .start()
///     .await?;
/// ```
///
/// [`SpatialMix::builder()`]: crate::SpatialMix::builder
#[must_use]
pub struct SpatialMixBuilder {
    config: MixerConfig,
    packet_rx: Option<mpsc::Receiver<AudioPacket>>,
    sinks: Vec<Arc<dyn Sink>>,
    event_callback: Option<EventCallback>,
}

impl Default for SpatialMixBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialMixBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: MixerConfig::default(),
            packet_rx: None,
            sinks: Vec::new(),
            event_callback: None,
        }
    }

    /// Set custom mixer configuration.
    pub fn config(mut self, config: MixerConfig) -> Self {
        self.config = config;
        self
    }

    /// Wire the inbound packet channel.
    ///
    /// The network collaborator sends owned [`AudioPacket`] records into the
    /// paired sender; the mixer drains them between frames.
    pub fn packet_source(mut self, packet_rx: mpsc::Receiver<AudioPacket>) -> Self {
        self.packet_rx = Some(packet_rx);
        self
    }

    /// Add a sink to receive mixed frames.
    ///
    /// At least one sink must be added before calling `start()`.
    pub fn add_sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Set a callback to receive runtime events.
    ///
    /// Events include buffer overflows, starvations, cadence slips, and sink
    /// errors.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(MixerEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    fn validate(&self) -> Result<(), MixerError> {
        self.config.validate()?;
        if self.packet_rx.is_none() {
            return Err(MixerError::NoPacketSource);
        }
        if self.sinks.is_empty() {
            return Err(MixerError::NoSinksConfigured);
        }
        Ok(())
    }

    /// Start the mixer loop.
    ///
    /// Returns a [`Session`] handle to observe and stop it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - No packet source or no sinks are configured
    /// - Any sink fails to start
    pub async fn start(mut self) -> Result<Session, MixerError> {
        self.validate()?;
        let packet_rx = self.packet_rx.take().ok_or(MixerError::NoPacketSource)?;

        for sink in &self.sinks {
            sink.on_start()
                .await
                .map_err(|e| MixerError::SinkStartFailed {
                    sink_name: sink.name().to_string(),
                    reason: e.to_string(),
                })?;
        }

        let state = Arc::new(SessionState::new());
        let (cmd_tx, cmd_rx) = mpsc::channel(1);

        let mixer = Mixer::new(
            self.config,
            self.sinks,
            self.event_callback,
            Arc::clone(&state),
        );
        let mixer_handle = tokio::spawn(async move {
            mixer.run(packet_rx, cmd_rx).await;
        });

        Ok(Session::new(state, cmd_tx, mixer_handle))
    }
}

/// Main entry point for spatial-mix.
///
/// Use [`SpatialMix::builder()`] to start configuring a mixer.
pub struct SpatialMix;

impl SpatialMix {
    /// Creates a new builder for configuring the mixer.
    pub fn builder() -> SpatialMixBuilder {
        SpatialMixBuilder::new()
    }
}
