//! Command arbitration
//!
//! `ActiveCommand` is one cell written by three producers. The priority rule:
//!
//! - silence forces `Idle`, overriding everything
//! - a horizontal intent (`Left`/`Right`) always writes, pre-empting vertical
//! - a vertical observation only writes while the cell is not horizontal;
//!   an absent or dead-zone pitch then resets it to `Idle`
//!
//! A horizontal command has no expiry of its own. It holds until silence or
//! a contradicting classification.

use crate::messages::{ActiveCommand, Intent};
use tracing::debug;

/// A change of the active command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: ActiveCommand,
    pub to: ActiveCommand,
}

/// Owner of the active command
#[derive(Clone, Debug, Default)]
pub struct CommandArbiter {
    active: ActiveCommand,
    previous: ActiveCommand,
}

impl CommandArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> ActiveCommand {
        self.active
    }

    /// Value held before the most recent change
    pub fn previous(&self) -> ActiveCommand {
        self.previous
    }

    /// Silence: force idle regardless of any channel
    pub fn close_gate(&mut self) -> Option<Transition> {
        self.set(ActiveCommand::Idle)
    }

    /// Apply a pitch observation
    ///
    /// `intent` is the pitch channel output for the sample, already `None`
    /// for an absent pitch or the dead zone.
    pub fn observe_pitch(&mut self, intent: Intent, voiced: bool) -> Option<Transition> {
        if !voiced {
            return self.close_gate();
        }

        if self.active.is_horizontal() {
            return None;
        }

        debug_assert!(!intent.is_horizontal());
        self.set(intent.into())
    }

    /// Apply a vowel observation
    pub fn observe_vowel(&mut self, intent: Intent, voiced: bool) -> Option<Transition> {
        if !voiced {
            return self.close_gate();
        }

        if intent.is_horizontal() {
            return self.set(intent.into());
        }

        None
    }

    /// End of session
    pub fn reset(&mut self) -> Option<Transition> {
        self.set(ActiveCommand::Idle)
    }

    fn set(&mut self, next: ActiveCommand) -> Option<Transition> {
        if next == self.active {
            return None;
        }

        let transition = Transition {
            from: self.active,
            to: next,
        };
        self.previous = self.active;
        self.active = next;
        debug!("Active command {} -> {}", transition.from, transition.to);
        Some(transition)
    }
}
