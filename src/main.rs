use anyhow::{bail, Context, Result};
use drops_watcher::services::hooks::{LogDisplay, LogEvents};
use drops_watcher::{Channel, ChannelContext, Settings, TwitchClient};
use futures::future::join_all;
use log::{error, info, warn};
use std::sync::Arc;

/// Polls every configured channel and sends a minute-watched to the live ones each interval.
/// Without the websocket feed, liveness is checked by polling instead of "stream-up" events.
async fn watch_loop(channels: &[Arc<Channel>], settings: &Settings) {
    let mut interval = tokio::time::interval(settings.watch_interval());
    loop {
        interval.tick().await;

        let checks = channels.iter().map(|channel| async move {
            if let Err(e) = channel.check_online().await {
                warn!("Failed to check {}: {}", channel.name(), e);
                return;
            }
            channel.display(false);
            if !channel.is_online() {
                return;
            }
            match channel.send_watch().await {
                Ok(true) => info!("✅ Watched a minute of {}", channel.name()),
                Ok(false) => warn!("minute-watched for {} wasn't accepted", channel.name()),
                Err(e) => error!("Can't watch {}: {}", channel.name(), e),
            }
            if let Err(e) = channel.claim_bonus().await {
                warn!("Failed to claim bonus on {}: {}", channel.name(), e);
            }
        });
        join_all(checks).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings_path = Settings::default_path()?;
    let settings = Settings::load(&settings_path)?;
    if settings.auth_token.is_empty() {
        bail!(
            "no auth token, set DROPS_WATCHER_TOKEN or auth_token in {}",
            settings_path.display()
        );
    }
    if settings.channels.is_empty() {
        bail!("no channels configured in {}", settings_path.display());
    }

    let mut client = TwitchClient::new(&settings)?;
    let user_id = client.login().await.context("token validation failed")?;
    info!("Logged in as user {}", user_id);

    let ctx = ChannelContext {
        transport: Arc::new(client),
        display: Arc::new(LogDisplay),
        events: Arc::new(LogEvents),
        online_delay: settings.online_delay(),
    };

    let mut channels = Vec::new();
    for login in &settings.channels {
        match Channel::from_name(ctx.clone(), login, false).await {
            Ok(channel) => {
                channel.display(true);
                channels.push(channel);
            }
            Err(e) => error!("Failed to load channel {}: {}", login, e),
        }
    }
    if channels.is_empty() {
        bail!("none of the configured channels could be loaded");
    }

    tokio::select! {
        _ = watch_loop(&channels, &settings) => {}
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    for channel in &channels {
        channel.remove();
    }
    Ok(())
}
