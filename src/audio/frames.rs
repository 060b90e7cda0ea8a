//! Fixed-length mono frames
//!
//! Device callbacks deliver interleaved buffers of whatever size the host
//! picks. The loudness monitor wants one frame per tick, so capture folds
//! channels down to mono and cuts the stream into frames that each cover
//! one tick of audio.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::time::Duration;

/// Frames buffered between capture and the loudness monitor
pub const FRAME_CHANNEL_CAPACITY: usize = 8;

/// Channel pair carrying mono frames from capture to the monitor
pub fn frame_channel() -> (Sender<Vec<f32>>, Receiver<Vec<f32>>) {
    bounded(FRAME_CHANNEL_CAPACITY)
}

/// Samples per frame for `period` of audio at `sample_rate`, at least one
pub fn frame_len(sample_rate: u32, period: Duration) -> usize {
    let samples = (sample_rate as u128 * period.as_micros()) / 1_000_000;
    (samples as usize).max(1)
}

/// Downmixes interleaved audio and cuts it into equal frames
#[derive(Debug)]
pub struct FrameAssembler {
    channels: usize,
    frame_len: usize,
    pending: Vec<f32>,
}

impl FrameAssembler {
    pub fn new(channels: u16, frame_len: usize) -> Self {
        let frame_len = frame_len.max(1);
        Self {
            channels: channels.max(1) as usize,
            frame_len,
            pending: Vec::with_capacity(frame_len),
        }
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Feed one interleaved buffer; `emit` receives every completed frame
    ///
    /// A trailing partial sample group (fewer values than channels) is
    /// ignored.
    pub fn push<F>(&mut self, interleaved: &[f32], mut emit: F)
    where
        F: FnMut(Vec<f32>),
    {
        for group in interleaved.chunks_exact(self.channels) {
            let mono = group.iter().sum::<f32>() / self.channels as f32;
            self.pending.push(mono);

            if self.pending.len() == self.frame_len {
                let frame =
                    std::mem::replace(&mut self.pending, Vec::with_capacity(self.frame_len));
                emit(frame);
            }
        }
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_len_covers_one_tick() {
        assert_eq!(frame_len(48_000, Duration::from_millis(16)), 768);
        assert_eq!(frame_len(44_100, Duration::from_millis(10)), 441);
        assert_eq!(frame_len(8_000, Duration::ZERO), 1);
    }

    #[test]
    fn test_stereo_downmix() {
        let mut assembler = FrameAssembler::new(2, 2);
        let mut frames = Vec::new();

        assembler.push(&[0.2, 0.4, -1.0, 1.0], |frame| frames.push(frame));

        assert_eq!(frames.len(), 1);
        assert!((frames[0][0] - 0.3).abs() < 1e-6);
        assert_eq!(frames[0][1], 0.0);
    }

    #[test]
    fn test_frames_span_callbacks() {
        let mut assembler = FrameAssembler::new(1, 4);
        let mut frames = Vec::new();

        assembler.push(&[0.1; 3], |frame| frames.push(frame));
        assert!(frames.is_empty());

        assembler.push(&[0.1; 6], |frame| frames.push(frame));
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|frame| frame.len() == 4));

        assembler.reset();
        assembler.push(&[0.1; 3], |frame| frames.push(frame));
        assert_eq!(frames.len(), 2);
    }
}
