//! WAV file sink for capturing one listener's mix.

use crate::sink::Sink;
use crate::{SinkError, SourceId, StereoFrame};
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A sink that writes one listener's stereo mix to a WAV file.
///
/// Frames for other listeners are ignored. The file is created on the first
/// matching frame and finalized (header updated) on `on_stop()`.
///
/// # Example
///
/// ```no_run
/// use spatial_mix::{SourceId, WavSink};
///
/// let sink = WavSink::for_listener("alice.wav", SourceId::new("10.0.0.2:5001"));
/// // Use with the SpatialMix builder...
/// ```
pub struct WavSink {
    name: String,
    path: PathBuf,
    listener: SourceId,
    state: Mutex<WavState>,
}

struct WavState {
    writer: Option<BufWriter<File>>,
    samples_written: u64,
}

impl WavSink {
    /// Creates a sink capturing `listener`'s mix at `path`.
    pub fn for_listener(path: impl AsRef<Path>, listener: SourceId) -> Self {
        Self {
            name: format!("wav:{}", path.as_ref().display()),
            path: path.as_ref().to_path_buf(),
            listener,
            state: Mutex::new(WavState {
                writer: None,
                samples_written: 0,
            }),
        }
    }

    fn write_wav_header(
        writer: &mut BufWriter<File>,
        sample_rate: u32,
        data_size: u32,
    ) -> std::io::Result<()> {
        const CHANNELS: u16 = 2;

        // RIFF header
        writer.write_all(b"RIFF")?;
        writer.write_all(&(36 + data_size).to_le_bytes())?; // File size - 8
        writer.write_all(b"WAVE")?;

        // fmt chunk
        writer.write_all(b"fmt ")?;
        writer.write_all(&16u32.to_le_bytes())?; // Chunk size
        writer.write_all(&1u16.to_le_bytes())?; // Audio format (PCM)
        writer.write_all(&CHANNELS.to_le_bytes())?;
        writer.write_all(&sample_rate.to_le_bytes())?;
        let byte_rate = sample_rate * u32::from(CHANNELS) * 2; // 16-bit samples
        writer.write_all(&byte_rate.to_le_bytes())?;
        let block_align = CHANNELS * 2;
        writer.write_all(&block_align.to_le_bytes())?;
        writer.write_all(&16u16.to_le_bytes())?; // Bits per sample

        // data chunk header
        writer.write_all(b"data")?;
        writer.write_all(&data_size.to_le_bytes())?;

        Ok(())
    }

    fn update_wav_header(writer: &mut BufWriter<File>, data_size: u32) -> std::io::Result<()> {
        use std::io::{Seek, SeekFrom};

        // Update RIFF chunk size
        writer.seek(SeekFrom::Start(4))?;
        writer.write_all(&(36 + data_size).to_le_bytes())?;

        // Update data chunk size
        writer.seek(SeekFrom::Start(40))?;
        writer.write_all(&data_size.to_le_bytes())?;

        writer.seek(SeekFrom::End(0))?;

        Ok(())
    }
}

#[async_trait]
impl Sink for WavSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, frame: &StereoFrame) -> Result<(), SinkError> {
        if frame.listener != self.listener {
            return Ok(());
        }

        let mut state = self
            .state
            .lock()
            .map_err(|_| SinkError::write_failed("wav state poisoned"))?;

        // Initialize on first matching frame, when the sample rate is known.
        if state.writer.is_none() {
            let file =
                File::create(&self.path).map_err(|e| SinkError::file_error(&self.path, e))?;
            let mut writer = BufWriter::new(file);

            // Placeholder header; sizes are patched on stop.
            Self::write_wav_header(&mut writer, frame.sample_rate, 0)
                .map_err(|e| SinkError::file_error(&self.path, e))?;

            state.writer = Some(writer);
        }

        if let Some(ref mut writer) = state.writer {
            for sample in &frame.samples {
                writer
                    .write_all(&sample.to_le_bytes())
                    .map_err(|e| SinkError::file_error(&self.path, e))?;
            }
            state.samples_written += frame.samples.len() as u64;
        }

        Ok(())
    }

    async fn on_stop(&self) -> Result<(), SinkError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SinkError::write_failed("wav state poisoned"))?;

        let data_size = (state.samples_written * 2) as u32;

        if let Some(ref mut writer) = state.writer {
            Self::update_wav_header(writer, data_size)
                .map_err(|e| SinkError::file_error(&self.path, e))?;

            writer
                .flush()
                .map_err(|e| SinkError::file_error(&self.path, e))?;
        }

        state.writer = None;
        Ok(())
    }
}
