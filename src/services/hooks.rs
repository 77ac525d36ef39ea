use crate::services::channel_service::Channel;
use log::{debug, info};
use std::sync::Arc;

/// The channel list shown to the user. Refreshed after every observable change of a channel.
pub trait ChannelDisplay: Send + Sync {
    fn display(&self, channel: &Channel, add: bool);
    fn remove(&self, channel: &Channel);
}

/// Liveness notifications for whoever decides what gets watched.
pub trait ChannelEvents: Send + Sync {
    fn on_online(&self, channel: &Arc<Channel>);
    fn on_offline(&self, channel: &Arc<Channel>);
}

/// Writes channel rows to the log instead of a GUI.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl ChannelDisplay for LogDisplay {
    fn display(&self, channel: &Channel, add: bool) {
        let status = if channel.is_online() {
            "ONLINE"
        } else if channel.is_pending_online() {
            "PENDING_ONLINE"
        } else {
            "OFFLINE"
        };
        let game = channel
            .game()
            .map(|g| g.name)
            .unwrap_or_default();
        debug!(
            "{} {}: {} {} viewers={} drops={} points={}",
            if add { "+" } else { "~" },
            channel,
            status,
            game,
            channel.viewers().unwrap_or(0),
            channel.drops_enabled(),
            channel.points().unwrap_or(0),
        );
    }

    fn remove(&self, channel: &Channel) {
        debug!("- {}", channel);
    }
}

#[derive(Debug, Default)]
pub struct LogEvents;

impl ChannelEvents for LogEvents {
    fn on_online(&self, channel: &Arc<Channel>) {
        info!("{} goes ONLINE", channel.name());
    }

    fn on_offline(&self, channel: &Arc<Channel>) {
        info!("{} goes OFFLINE", channel.name());
    }
}
