//! Integration layer
//!
//! Wires capture, models, the fusion engine and the transport into one
//! session.

pub mod config;
pub mod orchestrator;

pub use config::JoystickConfig;
pub use orchestrator::{SessionBuilder, SessionHandle, SessionSnapshot, SessionStatus};
