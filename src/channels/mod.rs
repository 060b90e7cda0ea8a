//! Pitch and vowel channels
//!
//! Each channel turns the latest output of an opaque model into a
//! directional intent. The models themselves sit behind the
//! [`PitchEstimator`] and [`VowelClassifier`] traits; every call is one
//! request, and the session loops re-issue it as soon as it resolves.

pub mod feed;
pub mod pitch;
pub mod vowel;

pub use feed::{FeedClassifier, FeedPitchEstimator, ModelFeed, ModelFeedSender};
pub use pitch::PitchChannel;
pub use vowel::VowelChannel;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One estimate from the pitch model
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum PitchSample {
    /// Fundamental frequency in Hz
    Hz(f32),
    /// The model heard no pitch
    #[default]
    Absent,
}

impl PitchSample {
    /// Anything that is not a positive finite frequency counts as absent
    pub fn from_frequency(frequency: Option<f32>) -> Self {
        match frequency {
            Some(hz) if hz.is_finite() && hz > 0.0 => PitchSample::Hz(hz),
            _ => PitchSample::Absent,
        }
    }

    pub fn frequency(&self) -> Option<f32> {
        match self {
            PitchSample::Hz(hz) => Some(*hz),
            PitchSample::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, PitchSample::Absent)
    }
}

/// One entry of a classifier result list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Source of pitch estimates
#[async_trait]
pub trait PitchEstimator: Send {
    /// Resolve the next estimate
    async fn get_pitch(&mut self) -> Result<PitchSample>;
}

/// Source of vowel classifications
#[async_trait]
pub trait VowelClassifier: Send {
    /// Resolve the next classification, ordered best-first
    async fn classify(&mut self) -> Result<Vec<Classification>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_sample_from_frequency() {
        assert_eq!(PitchSample::from_frequency(Some(220.0)), PitchSample::Hz(220.0));
        assert!(PitchSample::from_frequency(None).is_absent());
        assert!(PitchSample::from_frequency(Some(0.0)).is_absent());
        assert!(PitchSample::from_frequency(Some(-5.0)).is_absent());
        assert!(PitchSample::from_frequency(Some(f32::NAN)).is_absent());
    }
}
