//! Signal fusion and command arbitration

pub mod arbiter;
pub mod click;
pub mod dispatch;
pub mod state;

pub use arbiter::{CommandArbiter, Transition};
pub use click::ClickDetector;
pub use dispatch::{ActionDisplay, Dispatcher};
pub use state::{EngineSnapshot, EngineState, SharedEngineState, TickOutput};
