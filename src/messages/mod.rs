pub mod types;

pub use types::{
    Action, ActiveCommand, ConnectionState, Intent, LastAction, OutboundCommand,
};
