use crate::channels::PitchSample;
use crate::messages::Intent;

/// Maps pitch to vertical intent with a dead zone between the thresholds
#[derive(Clone, Copy, Debug)]
pub struct PitchChannel {
    low_hz: f32,
    high_hz: f32,
}

impl PitchChannel {
    pub fn new(low_hz: f32, high_hz: f32) -> Self {
        Self { low_hz, high_hz }
    }

    /// Intent for one sample. No latching: an absent pitch or a closed
    /// gate is always `None`.
    pub fn intent(&self, sample: PitchSample, voiced: bool) -> Intent {
        if !voiced {
            return Intent::None;
        }

        match sample {
            PitchSample::Hz(hz) if hz > self.high_hz => Intent::Up,
            PitchSample::Hz(hz) if hz < self.low_hz => Intent::Down,
            _ => Intent::None,
        }
    }
}
