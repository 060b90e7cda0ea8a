use serde::{Deserialize, Serialize};

/// Directional intent derived fresh from one channel update
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Intent {
    #[default]
    None,
    Left,
    Right,
    Up,
    Down,
}

impl Intent {
    /// Left or right
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Intent::Left | Intent::Right)
    }
}

/// The single authoritative command cell owned by the arbiter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActiveCommand {
    #[default]
    Idle,
    Left,
    Right,
    Up,
    Down,
}

impl ActiveCommand {
    pub fn is_horizontal(&self) -> bool {
        matches!(self, ActiveCommand::Left | ActiveCommand::Right)
    }

    /// Pointer displacement for one dispatch, `None` when idle.
    ///
    /// Screen coordinates: positive `dy` moves the pointer down.
    pub fn displacement(&self, speed: i32) -> Option<(i32, i32)> {
        match self {
            ActiveCommand::Idle => None,
            ActiveCommand::Left => Some((-speed, 0)),
            ActiveCommand::Right => Some((speed, 0)),
            ActiveCommand::Up => Some((0, -speed)),
            ActiveCommand::Down => Some((0, speed)),
        }
    }
}

impl From<Intent> for ActiveCommand {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::None => ActiveCommand::Idle,
            Intent::Left => ActiveCommand::Left,
            Intent::Right => ActiveCommand::Right,
            Intent::Up => ActiveCommand::Up,
            Intent::Down => ActiveCommand::Down,
        }
    }
}

impl std::fmt::Display for ActiveCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActiveCommand::Idle => write!(f, "IDLE"),
            ActiveCommand::Left => write!(f, "LEFT"),
            ActiveCommand::Right => write!(f, "RIGHT"),
            ActiveCommand::Up => write!(f, "UP"),
            ActiveCommand::Down => write!(f, "DOWN"),
        }
    }
}

/// Kind of message sent to the actuator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Move,
    Click,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Move => write!(f, "MOVE"),
            Action::Click => write!(f, "CLICK"),
        }
    }
}

/// Fire-and-forget command payload, serialized as
/// `{"action": "MOVE"|"CLICK", "dx": int, "dy": int}`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundCommand {
    pub action: Action,
    #[serde(default)]
    pub dx: i32,
    #[serde(default)]
    pub dy: i32,
}

impl OutboundCommand {
    pub fn movement(dx: i32, dy: i32) -> Self {
        Self {
            action: Action::Move,
            dx,
            dy,
        }
    }

    pub fn click() -> Self {
        Self {
            action: Action::Click,
            dx: 0,
            dy: 0,
        }
    }

    /// Build the MOVE for an active command, `None` when idle
    pub fn for_command(command: ActiveCommand, speed: i32) -> Option<Self> {
        command
            .displacement(speed)
            .map(|(dx, dy)| Self::movement(dx, dy))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Transport connectivity as seen by the rest of the system
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}

/// Transient "last action" display value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LastAction {
    #[default]
    Idle,
    Sent(Action),
}

impl std::fmt::Display for LastAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LastAction::Idle => write!(f, "IDLE"),
            LastAction::Sent(action) => write!(f, "{}", action),
        }
    }
}
