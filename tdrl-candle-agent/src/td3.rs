//! TD3 agent.
mod actor;
mod base;
mod config;
mod critic;
pub use actor::{Actor, ActorConfig};
pub use base::Td3;
pub use config::Td3Config;
pub use critic::{Critic, CriticConfig};
