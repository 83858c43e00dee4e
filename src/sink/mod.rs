//! Sink trait and implementations for mixed-frame destinations.
//!
//! A [`Sink`] is any destination that can receive per-listener stereo
//! frames. The crate provides two built-in sinks:
//!
//! - [`ChannelSink`]: Sends frames to a tokio mpsc channel (e.g. the
//!   network layer that packetizes them back to participants)
//! - [`WavSink`]: Captures one listener's mix to a WAV file
//!
//! You can implement the [`Sink`] trait for custom destinations like
//! sockets or monitoring taps.

mod channel;
mod wav;

pub use channel::ChannelSink;
pub use wav::WavSink;

use crate::{SinkError, StereoFrame};
use async_trait::async_trait;

/// A destination for mixed stereo frames.
///
/// The mixer delivers every listener's frame to every sink once per tick;
/// sinks that care about a single listener filter on
/// [`StereoFrame::listener`].
///
/// # Implementation Notes
///
/// - Methods take `&self` - use interior mutability (`Mutex`, `RwLock`) if needed
/// - All methods are async and run on the tokio runtime
/// - `on_start` is called before any frames flow; open resources here
/// - `on_stop` is called during graceful shutdown; close resources here
/// - Frames are perishable: a failed `write` is reported as an event and the
///   frame is dropped for that sink, never retried
///
/// # Example
///
/// ```
/// use spatial_mix::{Sink, SinkError, StereoFrame};
/// use async_trait::async_trait;
///
/// struct PrintSink {
///     name: String,
/// }
///
/// #[async_trait]
/// impl Sink for PrintSink {
///     fn name(&self) -> &str {
///         &self.name
///     }
///
///     async fn write(&self, frame: &StereoFrame) -> Result<(), SinkError> {
///         println!("{}: {} samples", frame.listener, frame.samples.len());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Sink: Send + Sync {
    /// Human-readable name for logging and error messages.
    fn name(&self) -> &str;

    /// Called once before mixing begins.
    ///
    /// Use this to open files, establish connections, or allocate resources.
    /// Errors here are fatal and will prevent the mixer from starting.
    ///
    /// Default implementation does nothing.
    async fn on_start(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Write one listener's frame.
    ///
    /// Called once per listener per tick. Implementations should return
    /// quickly; a slow sink delays the whole frame tick.
    async fn write(&self, frame: &StereoFrame) -> Result<(), SinkError>;

    /// Called during graceful shutdown.
    ///
    /// Use this to flush buffers, close files, or clean up resources.
    ///
    /// Default implementation does nothing.
    async fn on_stop(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSink {
        name: String,
        count: AtomicUsize,
    }

    impl CountingSink {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                count: AtomicUsize::new(0),
            }
        }

        fn count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Sink for CountingSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&self, _frame: &StereoFrame) -> Result<(), SinkError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_frame() -> StereoFrame {
        StereoFrame {
            listener: SourceId::new("listener"),
            samples: vec![0i16; 8],
            sample_rate: 22050,
            frame_index: 0,
        }
    }

    #[tokio::test]
    async fn test_sink_lifecycle() {
        let sink = CountingSink::new("test");

        sink.on_start().await.unwrap();

        sink.write(&test_frame()).await.unwrap();
        sink.write(&test_frame()).await.unwrap();
        assert_eq!(sink.count(), 2);

        sink.on_stop().await.unwrap();
    }

    #[test]
    fn test_sink_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Arc<dyn Sink>>();
    }
}
