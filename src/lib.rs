//! Channel liveness tracking and minute-watched heartbeats for Twitch drops mining.

pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{MinerError, Result};
pub use models::settings::Settings;
pub use models::stream::{Game, Stream};
pub use services::channel_service::{Channel, ChannelContext};
pub use services::hooks::{ChannelDisplay, ChannelEvents};
pub use services::transport::{TwitchClient, TwitchTransport};
