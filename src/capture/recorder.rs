//! Microphone recorder using CPAL for capture and hound for WAV writing
//!
//! The recorder captures from the default input device into a 16-bit WAV
//! file. The returned handle supports pause/resume (the stream keeps running,
//! samples are dropped while paused, so elapsed time never resets) and
//! exposes a live peak-amplitude sample for the waveform display.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use hound::{WavSpec, WavWriter};
use uuid::Uuid;

use super::paths::generate_wav_path;
use super::{AudioOrigin, CaptureError, CapturedAudio};

type SharedWriter = Arc<Mutex<Option<WavWriter<std::io::BufWriter<std::fs::File>>>>>;

/// Handle to an active recording.
pub struct RecordingHandle {
    _stream: Stream,
    writer: SharedWriter,
    is_recording: Arc<AtomicBool>,
    is_paused: Arc<AtomicBool>,
    peak_bits: Arc<AtomicU32>,
    samples_written: Arc<AtomicU64>,
    sample_rate: u32,
    channels: u16,
    wav_path: PathBuf,
}

impl RecordingHandle {
    /// Pause capture. Samples arriving while paused are discarded.
    pub fn pause(&self) {
        self.is_paused.store(true, Ordering::SeqCst);
    }

    /// Resume capture after a pause.
    pub fn resume(&self) {
        self.is_paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused.load(Ordering::SeqCst)
    }

    /// Peak amplitude (0.0..=1.0) of the most recent input buffer.
    pub fn amplitude(&self) -> f32 {
        f32::from_bits(self.peak_bits.load(Ordering::Relaxed))
    }

    /// Recorded duration so far, derived from samples actually written
    /// (paused time is excluded by construction).
    pub fn elapsed_secs(&self) -> f64 {
        let frames =
            self.samples_written.load(Ordering::Relaxed) / u64::from(self.channels.max(1));
        frames as f64 / f64::from(self.sample_rate)
    }

    /// Stop recording and finalize the WAV file.
    pub fn stop(self) -> Result<CapturedAudio, CaptureError> {
        self.is_recording.store(false, Ordering::SeqCst);

        let duration_secs = self.elapsed_secs();

        let mut writer_guard = self.writer.lock().unwrap();
        if let Some(writer) = writer_guard.take() {
            writer
                .finalize()
                .map_err(|e| CaptureError::WriteFailed(e.to_string()))?;
        }

        tracing::info!("Recording stopped, WAV finalized: {:?}", self.wav_path);

        let display_name = self
            .wav_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording.wav".to_string());

        Ok(CapturedAudio {
            source_uri: self.wav_path.display().to_string(),
            display_name,
            mime_type: "audio/wav".to_string(),
            duration_secs,
            origin: AudioOrigin::Recording,
        })
    }

    /// Abort the recording, discarding the partial WAV file.
    pub fn discard(self) {
        self.is_recording.store(false, Ordering::SeqCst);
        let mut writer_guard = self.writer.lock().unwrap();
        if let Some(writer) = writer_guard.take() {
            let _ = writer.finalize();
        }
        drop(writer_guard);
        if let Err(e) = std::fs::remove_file(&self.wav_path) {
            tracing::debug!("Discard: could not remove {:?}: {}", self.wav_path, e);
        }
    }
}

/// Audio recorder that captures from the default input device.
pub struct AudioRecorder {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
}

impl AudioRecorder {
    /// Create a new AudioRecorder using the default input device.
    ///
    /// A missing device or unsupported configuration is terminal for the
    /// capture flow (the closest analogue to a microphone permission denial).
    pub fn new() -> Result<Self, CaptureError> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or(CaptureError::NoInputDevice)?;

        tracing::info!("Using audio input device: {:?}", device.name());

        let supported_config = device
            .default_input_config()
            .map_err(|_| CaptureError::NoSupportedConfig)?;

        tracing::info!(
            "Audio config: {} Hz, {} channels, {:?}",
            supported_config.sample_rate().0,
            supported_config.channels(),
            supported_config.sample_format()
        );

        let sample_format = supported_config.sample_format();
        let config: StreamConfig = supported_config.into();

        Ok(Self {
            device,
            config,
            sample_format,
        })
    }

    /// Start recording to a new WAV file.
    pub fn start(&self, session_id: Uuid) -> Result<(RecordingHandle, PathBuf), CaptureError> {
        let wav_path = generate_wav_path(session_id)
            .map_err(|e| CaptureError::FileCreationFailed(e.to_string()))?;

        let spec = WavSpec {
            channels: self.config.channels,
            sample_rate: self.config.sample_rate.0,
            bits_per_sample: 16, // Always write as 16-bit
            sample_format: hound::SampleFormat::Int,
        };

        let writer = WavWriter::create(&wav_path, spec)
            .map_err(|e| CaptureError::FileCreationFailed(e.to_string()))?;

        let writer: SharedWriter = Arc::new(Mutex::new(Some(writer)));
        let is_recording = Arc::new(AtomicBool::new(true));
        let is_paused = Arc::new(AtomicBool::new(false));
        let peak_bits = Arc::new(AtomicU32::new(0f32.to_bits()));
        let samples_written = Arc::new(AtomicU64::new(0));

        let stream = self.build_stream(
            writer.clone(),
            is_recording.clone(),
            is_paused.clone(),
            peak_bits.clone(),
            samples_written.clone(),
        )?;

        stream.play().map_err(|e| {
            CaptureError::StreamCreationFailed(format!("Failed to start stream: {}", e))
        })?;

        tracing::info!("Recording started: {:?}", wav_path);

        let handle = RecordingHandle {
            _stream: stream,
            writer,
            is_recording,
            is_paused,
            peak_bits,
            samples_written,
            sample_rate: self.config.sample_rate.0,
            channels: self.config.channels,
            wav_path: wav_path.clone(),
        };

        Ok((handle, wav_path))
    }

    fn build_stream(
        &self,
        writer: SharedWriter,
        is_recording: Arc<AtomicBool>,
        is_paused: Arc<AtomicBool>,
        peak_bits: Arc<AtomicU32>,
        samples_written: Arc<AtomicU64>,
    ) -> Result<Stream, CaptureError> {
        let err_fn = |err| tracing::error!("Audio stream error: {}", err);

        match self.sample_format {
            SampleFormat::I16 => self.build_stream_typed::<i16>(
                writer,
                is_recording,
                is_paused,
                peak_bits,
                samples_written,
                err_fn,
            ),
            SampleFormat::U16 => self.build_stream_typed::<u16>(
                writer,
                is_recording,
                is_paused,
                peak_bits,
                samples_written,
                err_fn,
            ),
            SampleFormat::F32 => self.build_stream_typed::<f32>(
                writer,
                is_recording,
                is_paused,
                peak_bits,
                samples_written,
                err_fn,
            ),
            _ => Err(CaptureError::NoSupportedConfig),
        }
    }

    fn build_stream_typed<T>(
        &self,
        writer: SharedWriter,
        is_recording: Arc<AtomicBool>,
        is_paused: Arc<AtomicBool>,
        peak_bits: Arc<AtomicU32>,
        samples_written: Arc<AtomicU64>,
        err_fn: impl FnMut(cpal::StreamError) + Send + 'static,
    ) -> Result<Stream, CaptureError>
    where
        T: cpal::Sample<Float = f32> + cpal::SizedSample + Send + 'static,
    {
        let config = self.config.clone();

        let stream = self
            .device
            .build_input_stream(
                &config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    if !is_recording.load(Ordering::SeqCst) {
                        return;
                    }

                    let mut peak = 0f32;
                    let paused = is_paused.load(Ordering::SeqCst);

                    let mut guard = writer.lock().unwrap();
                    if let Some(ref mut w) = *guard {
                        let mut written = 0u64;
                        for &sample in data {
                            let f32_sample: f32 = sample.to_float_sample();
                            peak = peak.max(f32_sample.abs().min(1.0));

                            if paused {
                                continue;
                            }

                            let sample_i16 = sample_to_i16(sample);
                            if w.write_sample(sample_i16).is_err() {
                                tracing::error!("Failed to write sample");
                                break;
                            }
                            written += 1;
                        }
                        samples_written.fetch_add(written, Ordering::Relaxed);
                    }
                    drop(guard);

                    peak_bits.store(peak.to_bits(), Ordering::Relaxed);
                },
                err_fn,
                None,
            )
            .map_err(|e| CaptureError::StreamCreationFailed(e.to_string()))?;

        Ok(stream)
    }
}

/// Convert any sample type to i16 for WAV writing.
fn sample_to_i16<T: cpal::Sample<Float = f32>>(sample: T) -> i16 {
    let f32_sample: f32 = sample.to_float_sample();
    let clamped = f32_sample.clamp(-1.0, 1.0);
    (clamped * i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_to_i16_converts_and_clamps() {
        assert_eq!(sample_to_i16(0.0f32), 0);
        assert_eq!(sample_to_i16(1.0f32), i16::MAX);
        assert_eq!(sample_to_i16(-1.0f32), -i16::MAX);
        assert_eq!(sample_to_i16(2.0f32), i16::MAX);
        assert_eq!(sample_to_i16(-2.0f32), -i16::MAX);
    }
}
