use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, trace};

/// Normalized mean absolute magnitude of one frame, clamped to [0, 1]
pub fn frame_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: f32 = samples.iter().map(|&s| s.abs()).sum();
    let level = sum / samples.len() as f32;

    if level.is_nan() {
        return 0.0;
    }

    level.clamp(0.0, 1.0)
}

/// Loudness threshold below which every voiced intent is suppressed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseGate {
    threshold: f32,
}

impl NoiseGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// The gate is open at or above the threshold
    pub fn is_open(&self, level: f32) -> bool {
        level >= self.threshold
    }
}

/// Samples the newest audio frame on every tick
///
/// Frames arrive from capture at roughly one per tick. Only the most recent
/// one matters, so older frames are drained and discarded. A tick without a
/// new frame keeps the previous level, up to `stale_after` ticks in a row;
/// past that the stream is considered stalled and the level drops to
/// silence. A closed source is silent at once.
pub struct LoudnessMonitor {
    frames: Receiver<Vec<f32>>,
    level: f32,
    stale_after: u32,
    idle_ticks: u32,
    disconnected: bool,
}

impl LoudnessMonitor {
    pub fn new(frames: Receiver<Vec<f32>>, stale_after: u32) -> Self {
        Self {
            frames,
            level: 0.0,
            stale_after: stale_after.max(1),
            idle_ticks: 0,
            disconnected: false,
        }
    }

    /// Recompute the current loudness from the newest pending frame
    pub fn sample(&mut self) -> f32 {
        let mut newest = None;
        loop {
            match self.frames.try_recv() {
                Ok(frame) => newest = Some(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        debug!("Audio frame source closed; holding silence");
                        self.disconnected = true;
                    }
                    self.level = 0.0;
                    return self.level;
                }
            }
        }

        match newest {
            Some(frame) => {
                self.idle_ticks = 0;
                self.level = frame_level(&frame);
                trace!("Loudness {:.3} over {} samples", self.level, frame.len());
            }
            None => {
                self.idle_ticks = self.idle_ticks.saturating_add(1);
                if self.idle_ticks == self.stale_after && self.level > 0.0 {
                    debug!(
                        "No audio for {} ticks; treating capture as stalled",
                        self.idle_ticks
                    );
                }
                if self.idle_ticks >= self.stale_after {
                    self.level = 0.0;
                }
            }
        }

        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_frame_level() {
        assert_eq!(frame_level(&[]), 0.0);
        assert!((frame_level(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
        assert_eq!(frame_level(&[2.0, -3.0]), 1.0);
        assert_eq!(frame_level(&[f32::NAN, 0.1]), 0.0);
    }

    #[test]
    fn test_gate_is_inclusive() {
        let gate = NoiseGate::new(0.05);
        assert!(gate.is_open(0.05));
        assert!(gate.is_open(0.5));
        assert!(!gate.is_open(0.01));
    }

    #[test]
    fn test_monitor_uses_newest_frame() {
        let (tx, rx) = bounded(8);
        let mut monitor = LoudnessMonitor::new(rx, 4);

        tx.send(vec![0.9; 64]).unwrap();
        tx.send(vec![0.01; 64]).unwrap();

        assert!((monitor.sample() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_monitor_holds_level_between_frames() {
        let (tx, rx) = bounded(8);
        let mut monitor = LoudnessMonitor::new(rx, 4);

        tx.send(vec![0.3; 64]).unwrap();
        monitor.sample();

        for _ in 0..3 {
            assert!((monitor.sample() - 0.3).abs() < 1e-6);
        }
    }

    #[test]
    fn test_stalled_capture_decays_to_silence() {
        let (tx, rx) = bounded(8);
        let mut monitor = LoudnessMonitor::new(rx, 4);

        tx.send(vec![0.3; 64]).unwrap();
        monitor.sample();
        for _ in 0..3 {
            monitor.sample();
        }
        assert_eq!(monitor.sample(), 0.0);

        // A fresh frame revives it
        tx.send(vec![0.2; 64]).unwrap();
        assert!((monitor.sample() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_monitor_goes_silent_when_source_closes() {
        let (tx, rx) = bounded(8);
        let mut monitor = LoudnessMonitor::new(rx, 100);

        tx.send(vec![0.3; 64]).unwrap();
        monitor.sample();
        drop(tx);

        assert_eq!(monitor.sample(), 0.0);
    }
}
