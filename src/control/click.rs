use crate::messages::OutboundCommand;
use std::time::{Duration, Instant};

/// Emits a click on loud transients, at most once per debounce window
#[derive(Clone, Debug)]
pub struct ClickDetector {
    threshold: f32,
    debounce: Duration,
    last_click: Option<Instant>,
}

impl ClickDetector {
    pub fn new(threshold: f32, debounce: Duration) -> Self {
        Self {
            threshold,
            debounce,
            last_click: None,
        }
    }

    /// Check one loudness sample
    pub fn observe(&mut self, level: f32, now: Instant) -> Option<OutboundCommand> {
        if level <= self.threshold {
            return None;
        }

        if let Some(last) = self.last_click {
            if now.saturating_duration_since(last) < self.debounce {
                return None;
            }
        }

        self.last_click = Some(now);
        Some(OutboundCommand::click())
    }

    pub fn last_click(&self) -> Option<Instant> {
        self.last_click
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> ClickDetector {
        ClickDetector::new(0.25, Duration::from_millis(500))
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut click = detector();
        let now = Instant::now();
        assert!(click.observe(0.25, now).is_none());
        assert!(click.observe(0.3, now).is_some());
    }

    #[test]
    fn test_spikes_100ms_apart_click_once() {
        let mut click = detector();
        let start = Instant::now();
        assert!(click.observe(0.3, start).is_some());
        assert!(click
            .observe(0.3, start + Duration::from_millis(100))
            .is_none());
    }

    #[test]
    fn test_spikes_600ms_apart_click_twice() {
        let mut click = detector();
        let start = Instant::now();
        assert!(click.observe(0.3, start).is_some());
        assert!(click
            .observe(0.3, start + Duration::from_millis(600))
            .is_some());
    }

    #[test]
    fn test_rejected_spike_does_not_restart_window() {
        let mut click = detector();
        let start = Instant::now();
        click.observe(0.3, start);
        click.observe(0.3, start + Duration::from_millis(200));

        assert_eq!(click.last_click(), Some(start));
        assert!(click
            .observe(0.3, start + Duration::from_millis(500))
            .is_some());
    }
}
