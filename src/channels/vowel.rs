use crate::channels::Classification;
use crate::messages::Intent;

/// Maps high-confidence vowel labels to horizontal intent
#[derive(Clone, Debug)]
pub struct VowelChannel {
    right_labels: Vec<String>,
    left_labels: Vec<String>,
    confidence_floor: f32,
}

impl VowelChannel {
    pub fn new(right_labels: Vec<String>, left_labels: Vec<String>, confidence_floor: f32) -> Self {
        Self {
            right_labels,
            left_labels,
            confidence_floor,
        }
    }

    /// Intent for one classifier result list; only the best entry is read
    pub fn intent(&self, results: &[Classification], voiced: bool) -> Intent {
        if !voiced {
            return Intent::None;
        }

        let Some(best) = results.first() else {
            return Intent::None;
        };

        if best.confidence <= self.confidence_floor {
            return Intent::None;
        }

        if self.right_labels.iter().any(|label| *label == best.label) {
            Intent::Right
        } else if self.left_labels.iter().any(|label| *label == best.label) {
            Intent::Left
        } else {
            Intent::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> VowelChannel {
        VowelChannel::new(
            vec!["Eeeee".into(), "Class 2".into()],
            vec!["Oooo".into(), "Class 3".into()],
            0.75,
        )
    }

    #[test]
    fn test_vocabulary_mapping() {
        let right = [Classification::new("Class 2", 0.9)];
        let left = [Classification::new("Oooo", 0.8)];
        assert_eq!(channel().intent(&right, true), Intent::Right);
        assert_eq!(channel().intent(&left, true), Intent::Left);
    }

    #[test]
    fn test_confidence_floor_is_exclusive() {
        let at_floor = [Classification::new("Class 2", 0.75)];
        let below = [Classification::new("Class 3", 0.5)];
        assert_eq!(channel().intent(&at_floor, true), Intent::None);
        assert_eq!(channel().intent(&below, true), Intent::None);
    }

    #[test]
    fn test_unknown_label_is_none() {
        let noise = [Classification::new("Background Noise", 0.99)];
        assert_eq!(channel().intent(&noise, true), Intent::None);
    }

    #[test]
    fn test_only_best_entry_counts() {
        let results = [
            Classification::new("Background Noise", 0.8),
            Classification::new("Class 2", 0.79),
        ];
        assert_eq!(channel().intent(&results, true), Intent::None);
    }

    #[test]
    fn test_closed_gate_and_empty_results() {
        let right = [Classification::new("Class 2", 0.9)];
        assert_eq!(channel().intent(&right, false), Intent::None);
        assert_eq!(channel().intent(&[], true), Intent::None);
    }
}
