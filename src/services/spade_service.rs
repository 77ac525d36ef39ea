//! Spade URL discovery.
//!
//! The minute-watched endpoint isn't part of any API, it has to be walked to:
//! streamer page (HTML) --parse--> streamer settings (JavaScript) --parse--> spade URL

use crate::error::{MinerError, Result};
use crate::services::transport::TwitchTransport;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static SETTINGS_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)src="(https://static\.twitchcdn\.net/config/settings\.[0-9a-f]{32}\.js)""#)
        .unwrap()
});

static SPADE_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"spade_url": ?"(https://video-edge-[.\w\-/]+\.ts)""#).unwrap()
});

pub fn extract_settings_url(html: &str) -> Option<&str> {
    SETTINGS_URL_REGEX
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

pub fn extract_spade_url(settings_js: &str) -> Option<&str> {
    SPADE_URL_REGEX
        .captures(settings_js)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Resolves the spade URL starting from a public channel page.
pub async fn resolve_spade_url(transport: &dyn TwitchTransport, channel_url: &str) -> Result<String> {
    let streamer_html = transport.fetch_text(channel_url).await?;
    let settings_url =
        extract_settings_url(&streamer_html).ok_or(MinerError::Extraction { step: 1 })?;

    let settings_js = transport.fetch_text(settings_url).await?;
    let spade_url = extract_spade_url(&settings_js).ok_or(MinerError::Extraction { step: 2 })?;

    debug!("Resolved spade URL for {}: {}", channel_url, spade_url);
    Ok(spade_url.to_string())
}
