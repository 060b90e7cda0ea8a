use crate::messages::{ActiveCommand, LastAction, OutboundCommand};
use std::time::{Duration, Instant};

/// Rate-limits movement to one MOVE per interval
#[derive(Clone, Debug)]
pub struct Dispatcher {
    speed: i32,
    interval: Duration,
    last_dispatch: Option<Instant>,
}

impl Dispatcher {
    pub fn new(speed: i32, interval: Duration) -> Self {
        Self {
            speed,
            interval,
            last_dispatch: None,
        }
    }

    /// Decide whether this tick dispatches a movement
    ///
    /// Once the window is open on a voiced tick the timestamp is recorded,
    /// whatever happens to the command afterwards.
    pub fn poll(
        &mut self,
        voiced: bool,
        command: ActiveCommand,
        now: Instant,
    ) -> Option<OutboundCommand> {
        if !voiced {
            return None;
        }

        if let Some(last) = self.last_dispatch {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }

        self.last_dispatch = Some(now);
        OutboundCommand::for_command(command, self.speed)
    }

    pub fn last_dispatch(&self) -> Option<Instant> {
        self.last_dispatch
    }
}

/// Short-lived "last action" value shown on the status line
///
/// A reset names the action it was armed for and only clears the display
/// while that action is still shown. A newer action of another kind
/// survives an older reset; a repeat of the same kind does not.
#[derive(Clone, Debug, Default)]
pub struct ActionDisplay {
    action: LastAction,
}

impl ActionDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> LastAction {
        self.action
    }

    pub fn show(&mut self, action: LastAction) {
        self.action = action;
    }

    /// Reset to idle if `armed` is still what the display shows
    pub fn expire(&mut self, armed: LastAction) -> bool {
        if self.action != armed || armed == LastAction::Idle {
            return false;
        }
        self.action = LastAction::Idle;
        true
    }
}
