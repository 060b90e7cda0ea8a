//! Shared engine state
//!
//! Four producers touch this state: the tick loop (loudness, click,
//! dispatch), the pitch loop, the classification loop and the display
//! reset timers. Every read-modify-write goes through one exclusive lock so
//! the priority rule always sees a consistent cell, and every write first
//! checks the liveness flag so results that land after teardown are
//! discarded.

use crate::audio::NoiseGate;
use crate::channels::{Classification, PitchChannel, PitchSample, VowelChannel};
use crate::control::arbiter::{CommandArbiter, Transition};
use crate::control::click::ClickDetector;
use crate::control::dispatch::{ActionDisplay, Dispatcher};
use crate::integration::JoystickConfig;
use crate::messages::{ActiveCommand, LastAction, OutboundCommand};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// Commands produced by one tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickOutput {
    pub click: Option<OutboundCommand>,
    pub movement: Option<OutboundCommand>,
    pub transition: Option<Transition>,
}

impl TickOutput {
    /// Clicks first: they bypass the movement throttle
    pub fn commands(&self) -> impl Iterator<Item = OutboundCommand> {
        self.click.into_iter().chain(self.movement)
    }
}

/// Everything guarded by the engine lock
#[derive(Debug)]
pub struct EngineState {
    gate: NoiseGate,
    level: f32,
    last_pitch: Option<f32>,
    arbiter: CommandArbiter,
    pitch: PitchChannel,
    vowel: VowelChannel,
    click: ClickDetector,
    dispatcher: Dispatcher,
    display: ActionDisplay,
    live: bool,
}

impl EngineState {
    pub fn new(config: &JoystickConfig) -> Self {
        Self {
            gate: NoiseGate::new(config.noise_gate),
            level: 0.0,
            last_pitch: None,
            arbiter: CommandArbiter::new(),
            pitch: PitchChannel::new(config.pitch_low, config.pitch_high),
            vowel: VowelChannel::new(
                config.right_labels.clone(),
                config.left_labels.clone(),
                config.confidence_floor,
            ),
            click: ClickDetector::new(config.click_threshold, config.click_debounce()),
            dispatcher: Dispatcher::new(config.speed, config.dispatch_interval()),
            display: ActionDisplay::new(),
            live: true,
        }
    }

    pub fn is_voiced(&self) -> bool {
        self.gate.is_open(self.level)
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn active(&self) -> ActiveCommand {
        self.arbiter.active()
    }

    /// One loudness tick: gate, click, then throttled dispatch
    pub fn on_tick(&mut self, level: f32, now: Instant) -> TickOutput {
        if !self.live {
            return TickOutput::default();
        }

        self.level = level;
        let voiced = self.is_voiced();

        let transition = if voiced {
            None
        } else {
            self.arbiter.close_gate()
        };

        let click = self.click.observe(level, now);
        let movement = self.dispatcher.poll(voiced, self.arbiter.active(), now);

        TickOutput {
            click,
            movement,
            transition,
        }
    }

    /// One pitch estimate; errors arrive here as `Absent`
    pub fn on_pitch(&mut self, sample: PitchSample) -> Option<Transition> {
        if !self.live {
            return None;
        }

        self.last_pitch = sample.frequency();
        let voiced = self.is_voiced();
        let intent = self.pitch.intent(sample, voiced);
        self.arbiter.observe_pitch(intent, voiced)
    }

    /// One classification result list
    pub fn on_classification(&mut self, results: &[Classification]) -> Option<Transition> {
        if !self.live {
            return None;
        }

        let voiced = self.is_voiced();
        let intent = self.vowel.intent(results, voiced);
        self.arbiter.observe_vowel(intent, voiced)
    }

    /// Record a sent command on the display; returns what its reset must name
    pub fn show_action(&mut self, command: &OutboundCommand) -> Option<LastAction> {
        if !self.live {
            return None;
        }
        let shown = LastAction::Sent(command.action);
        self.display.show(shown);
        Some(shown)
    }

    pub fn expire_action(&mut self, armed: LastAction) -> bool {
        self.live && self.display.expire(armed)
    }

    /// Stop accepting writes
    pub fn shutdown(&mut self) -> Option<Transition> {
        self.live = false;
        self.display = ActionDisplay::new();
        self.arbiter.reset()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            active: self.arbiter.active(),
            last_action: self.display.current(),
            level: self.level,
            level_percent: (self.level * 100.0).round() as u8,
            pitch_hz: self.last_pitch.map(|hz| hz.round() as u32).unwrap_or(0),
            voiced: self.is_voiced(),
            live: self.live,
        }
    }
}

/// Point-in-time copy of the engine state for status output
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineSnapshot {
    pub active: ActiveCommand,
    pub last_action: LastAction,
    pub level: f32,
    pub level_percent: u8,
    /// Last heard pitch, 0 when none
    pub pitch_hz: u32,
    pub voiced: bool,
    pub live: bool,
}

/// Thread-safe handle to the engine state
#[derive(Clone)]
pub struct SharedEngineState {
    inner: Arc<Mutex<EngineState>>,
}

impl SharedEngineState {
    pub fn new(config: &JoystickConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EngineState::new(config))),
        }
    }

    pub fn on_tick(&self, level: f32, now: Instant) -> TickOutput {
        self.inner.lock().on_tick(level, now)
    }

    pub fn on_pitch(&self, sample: PitchSample) -> Option<Transition> {
        self.inner.lock().on_pitch(sample)
    }

    pub fn on_classification(&self, results: &[Classification]) -> Option<Transition> {
        self.inner.lock().on_classification(results)
    }

    pub fn show_action(&self, command: &OutboundCommand) -> Option<LastAction> {
        self.inner.lock().show_action(command)
    }

    pub fn expire_action(&self, armed: LastAction) -> bool {
        self.inner.lock().expire_action(armed)
    }

    pub fn shutdown(&self) -> Option<Transition> {
        self.inner.lock().shutdown()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn active(&self) -> ActiveCommand {
        self.inner.lock().active()
    }

    pub fn is_live(&self) -> bool {
        self.inner.lock().is_live()
    }
}
