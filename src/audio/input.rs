//! Microphone capture for the loudness monitor
//!
//! Opens the default input device in its native sample format and hands
//! the monitor one mono frame per tick. Frames are dropped, never queued,
//! when the monitor falls behind.

use crate::audio::frames::{frame_len, FrameAssembler};
use crate::{Result, VocalJoystickError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, trace, warn};

/// Live microphone feeding per-tick frames
pub struct AudioInput {
    device: Device,
    config: StreamConfig,
    format: SampleFormat,
    frame_len: usize,
    stream: Option<Stream>,
    live: Arc<AtomicBool>,
}

impl AudioInput {
    /// Open the default input device, cutting frames of `frame_period`
    pub fn open(frame_period: Duration) -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| VocalJoystickError::AudioDeviceError("No microphone found".into()))?;

        let supported = device.default_input_config().map_err(|e| {
            VocalJoystickError::AudioDeviceError(format!("Microphone has no usable format: {}", e))
        })?;
        let format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let samples_per_frame = frame_len(config.sample_rate.0, frame_period);

        info!(
            "Microphone {}: {} Hz, {} channel(s), {:?}, {} samples per frame",
            device.name().unwrap_or_else(|_| "<unnamed>".to_string()),
            config.sample_rate.0,
            config.channels,
            format,
            samples_per_frame
        );

        Ok(Self {
            device,
            config,
            format,
            frame_len: samples_per_frame,
            stream: None,
            live: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Start streaming frames into `frame_tx`
    pub fn start_capture(&mut self, frame_tx: Sender<Vec<f32>>) -> Result<()> {
        if self.stream.is_some() {
            warn!("Capture already running");
            return Ok(());
        }

        let assembler = FrameAssembler::new(self.config.channels, self.frame_len);
        let stream = match self.format {
            SampleFormat::F32 => self.build_stream::<f32>(assembler, frame_tx),
            SampleFormat::I16 => self.build_stream::<i16>(assembler, frame_tx),
            SampleFormat::U16 => self.build_stream::<u16>(assembler, frame_tx),
            other => Err(VocalJoystickError::AudioDeviceError(format!(
                "Unsupported sample format {:?}",
                other
            ))),
        }?;

        self.live.store(true, Ordering::Release);
        stream.play().map_err(|e| {
            self.live.store(false, Ordering::Release);
            VocalJoystickError::AudioDeviceError(format!("Microphone would not start: {}", e))
        })?;

        self.stream = Some(stream);
        info!("Microphone capture started");
        Ok(())
    }

    fn build_stream<T>(
        &self,
        mut assembler: FrameAssembler,
        frame_tx: Sender<Vec<f32>>,
    ) -> Result<Stream>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        let live = Arc::clone(&self.live);
        let mut scratch: Vec<f32> = Vec::new();

        self.device
            .build_input_stream(
                &self.config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    if !live.load(Ordering::Acquire) {
                        return;
                    }

                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| s.to_sample::<f32>()));

                    assembler.push(&scratch, |frame| {
                        if let Err(e) = frame_tx.try_send(frame) {
                            trace!("Dropped audio frame: {}", e);
                        }
                    });
                },
                |err| error!("Microphone stream error: {}", err),
                None,
            )
            .map_err(|e| {
                VocalJoystickError::AudioDeviceError(format!("Microphone stream failed: {}", e))
            })
    }

    /// Release the stream; the monitor sees its source close
    pub fn stop_capture(&mut self) {
        self.live.store(false, Ordering::Release);

        if self.stream.take().is_some() {
            info!("Microphone capture stopped");
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.stream.is_some() && self.live.load(Ordering::Acquire)
    }
}

impl Drop for AudioInput {
    fn drop(&mut self) {
        self.stop_capture();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frame_channel;

    #[test]
    fn test_frames_sized_to_tick() {
        // Hosts without a microphone skip this
        let Ok(input) = AudioInput::open(Duration::from_millis(16)) else {
            return;
        };
        assert!(input.frame_len() >= 1);
    }

    #[test]
    fn test_stop_releases_stream() {
        let Ok(mut input) = AudioInput::open(Duration::from_millis(16)) else {
            return;
        };

        let (tx, _rx) = frame_channel();
        if input.start_capture(tx).is_ok() {
            assert!(input.is_capturing());
            input.stop_capture();
            assert!(!input.is_capturing());
        }
    }
}
