pub mod document;
pub(crate) mod driver;
mod executor;
pub mod hub;
pub(crate) mod loading;
pub(crate) mod messages;
mod run_state;
pub(crate) use run_state::RunState;

pub use messages::{DocToHubMsg, HubToDocMsg, MessageDecodeError};
