//! Configuration for the integration layer
//!
//! Every tunable of the fusion engine lives here. A session copies the
//! values it needs into each component at construction, so nothing reads
//! ambient constants at runtime.

use crate::{Result, VocalJoystickError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a complete joystick session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoystickConfig {
    /// Pointer displacement per dispatched MOVE, in pixels
    pub speed: i32,

    /// Pitch above this frequency (Hz) means UP
    pub pitch_high: f32,

    /// Pitch below this frequency (Hz) means DOWN
    pub pitch_low: f32,

    /// Normalized loudness that triggers a click
    pub click_threshold: f32,

    /// Normalized loudness below which every voiced intent is suppressed
    pub noise_gate: f32,

    /// Minimum classifier confidence for a vowel to count
    pub confidence_floor: f32,

    /// Minimum time between dispatched movements
    pub dispatch_interval_ms: u64,

    /// Minimum time between accepted clicks
    pub click_debounce_ms: u64,

    /// How long a dispatched action stays on the status display
    pub display_reset_ms: u64,

    /// Period of the loudness/click/dispatch loop
    pub tick_interval_ms: u64,

    /// Classifier labels that steer right
    pub right_labels: Vec<String>,

    /// Classifier labels that steer left
    pub left_labels: Vec<String>,

    /// Actuator endpoint
    pub remote_url: String,

    /// Audio silence that closes the gate when the capture stream stalls
    pub frame_timeout_ms: u64,
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            speed: 25,
            pitch_high: 350.0,
            pitch_low: 180.0,
            click_threshold: 0.25,
            noise_gate: 0.05,
            confidence_floor: 0.75,
            dispatch_interval_ms: 50,
            click_debounce_ms: 500,
            display_reset_ms: 150,
            tick_interval_ms: 16,
            right_labels: vec!["Eeeee".to_string(), "Class 2".to_string()],
            left_labels: vec!["Oooo".to_string(), "Class 3".to_string()],
            remote_url: "ws://localhost:8000/ws".to_string(),
            frame_timeout_ms: 250,
        }
    }
}

impl JoystickConfig {
    /// Load a configuration from a TOML file; missing keys keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            VocalJoystickError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the movement speed
    pub fn with_speed(mut self, speed: i32) -> Self {
        self.speed = speed;
        self
    }

    /// Set the pitch dead zone
    pub fn with_pitch_range(mut self, low: f32, high: f32) -> Self {
        self.pitch_low = low;
        self.pitch_high = high;
        self
    }

    /// Set the noise gate and click thresholds
    pub fn with_loudness_thresholds(mut self, noise_gate: f32, click_threshold: f32) -> Self {
        self.noise_gate = noise_gate;
        self.click_threshold = click_threshold;
        self
    }

    /// Set the classifier confidence floor
    pub fn with_confidence_floor(mut self, floor: f32) -> Self {
        self.confidence_floor = floor;
        self
    }

    /// Set the actuator endpoint
    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = url.into();
        self
    }

    /// Set the loop period
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }

    pub fn click_debounce(&self) -> Duration {
        Duration::from_millis(self.click_debounce_ms)
    }

    pub fn display_reset(&self) -> Duration {
        Duration::from_millis(self.display_reset_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Ticks without a fresh frame before the level drops to silence
    pub fn stale_frame_ticks(&self) -> u32 {
        let ticks = self.frame_timeout_ms.div_ceil(self.tick_interval_ms.max(1));
        ticks.clamp(1, u32::MAX as u64) as u32
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.noise_gate) || !unit.contains(&self.click_threshold) {
            return Err(VocalJoystickError::ConfigError(
                "Loudness thresholds must lie in [0, 1]".to_string(),
            ));
        }

        if self.click_threshold <= self.noise_gate {
            return Err(VocalJoystickError::ConfigError(format!(
                "Click threshold {} must be above the noise gate {}",
                self.click_threshold, self.noise_gate
            )));
        }

        if !unit.contains(&self.confidence_floor) {
            return Err(VocalJoystickError::ConfigError(
                "Confidence floor must lie in [0, 1]".to_string(),
            ));
        }

        if !self.pitch_low.is_finite() || !self.pitch_high.is_finite() {
            return Err(VocalJoystickError::ConfigError(format!(
                "Pitch thresholds must be finite: low {} Hz, high {} Hz",
                self.pitch_low, self.pitch_high
            )));
        }

        if self.pitch_low <= 0.0 || self.pitch_low >= self.pitch_high {
            return Err(VocalJoystickError::ConfigError(format!(
                "Pitch dead zone is empty: low {} Hz, high {} Hz",
                self.pitch_low, self.pitch_high
            )));
        }

        if self.speed <= 0 {
            return Err(VocalJoystickError::ConfigError(
                "Speed must be positive".to_string(),
            ));
        }

        if self.tick_interval_ms == 0
            || self.dispatch_interval_ms == 0
            || self.click_debounce_ms == 0
            || self.display_reset_ms == 0
            || self.frame_timeout_ms == 0
        {
            return Err(VocalJoystickError::ConfigError(
                "Intervals must be non-zero".to_string(),
            ));
        }

        if self.right_labels.is_empty() || self.left_labels.is_empty() {
            return Err(VocalJoystickError::ConfigError(
                "Both label vocabularies need at least one label".to_string(),
            ));
        }

        if let Some(label) = self
            .right_labels
            .iter()
            .find(|label| self.left_labels.contains(label))
        {
            return Err(VocalJoystickError::ConfigError(format!(
                "Label {:?} maps to both directions",
                label
            )));
        }

        Ok(())
    }
}
