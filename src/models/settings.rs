use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "drops-watcher";
const TOKEN_ENV: &str = "DROPS_WATCHER_TOKEN";

// Android app client ID, matches the tokens issued for drops
pub const DEFAULT_CLIENT_ID: &str = "kd1unb4b3q4t58fwlpcbzcbnm76a8fp";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Settings {
    pub auth_token: String,
    pub client_id: String,
    pub user_agent: String,
    /// Logins of the channels to watch.
    pub channels: Vec<String>,
    /// How long a "stream-up" signal waits before the stream info is queried.
    pub online_delay_secs: u64,
    pub watch_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auth_token: String::new(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            channels: vec![],
            online_delay_secs: 120,
            watch_interval_secs: 60, // a minute-watched every minute
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl Settings {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("no config directory on this platform")?;
        Ok(config_dir.join(APP_DIR).join("settings.json"))
    }

    /// Loads settings from `path`, or defaults if the file doesn't exist yet.
    /// The token env var always wins over the file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Settings::default()
        };

        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.is_empty() {
                settings.auth_token = token;
            }
        }
        Ok(settings)
    }

    pub fn online_delay(&self) -> Duration {
        Duration::from_secs(self.online_delay_secs)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
