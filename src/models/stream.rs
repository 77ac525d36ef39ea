use crate::error::Result;
use crate::utils::json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tag id Twitch attaches to broadcasts that currently qualify for drops.
pub const DROPS_ENABLED_TAG: &str = "c2542d6d-cd10-4532-919b-3d19f30a768b";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Game {
    pub id: u64,
    pub name: String,
}

impl Game {
    /// `null` means the broadcaster didn't pick a category.
    fn from_json(data: &Value) -> Result<Option<Game>> {
        if data.is_null() {
            return Ok(None);
        }
        Ok(Some(Game {
            id: json::id(data, "id")?,
            name: json::string(data, "name")?.to_string(),
        }))
    }
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One live broadcast of a channel. Only the viewer count changes after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Stream {
    broadcast_id: u64,
    viewers: u64,
    title: String,
    game: Option<Game>,
    drops_enabled: bool,
}

impl Stream {
    fn new(
        broadcast_id: u64,
        game: Option<Game>,
        viewers: u64,
        title: String,
        tags: &Value,
    ) -> Self {
        Self {
            broadcast_id,
            viewers,
            drops_enabled: has_drops_tag(tags),
            game,
            title,
        }
    }

    /// Builds a stream from the `data.user` object of a `GetStreamInfo` response.
    /// The caller is expected to have checked that `stream` isn't null.
    pub fn from_get_stream(data: &Value) -> Result<Self> {
        let stream = json::required(data, "stream")?;
        let settings = json::required(data, "broadcastSettings")?;
        Ok(Self::new(
            json::id(stream, "id")?,
            Game::from_json(json::field(settings, "game")?)?,
            json::uint(stream, "viewersCount")?,
            json::string(settings, "title")?.to_string(),
            json::field(stream, "tags")?,
        ))
    }

    /// Builds a stream from a directory listing node. Directory queries are filtered by game,
    /// so the game is always there.
    pub fn from_directory(data: &Value) -> Result<Self> {
        Ok(Self::new(
            json::id(data, "id")?,
            Game::from_json(json::required(data, "game")?)?,
            json::uint(data, "viewersCount")?,
            json::string(data, "title")?.to_string(),
            json::field(data, "tags")?,
        ))
    }

    pub fn broadcast_id(&self) -> u64 {
        self.broadcast_id
    }

    pub fn viewers(&self) -> u64 {
        self.viewers
    }

    pub fn set_viewers(&mut self, viewers: u64) {
        self.viewers = viewers;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    pub fn drops_enabled(&self) -> bool {
        self.drops_enabled
    }
}

fn has_drops_tag(tags: &Value) -> bool {
    tags.as_array()
        .map(|tags| {
            tags.iter()
                .any(|tag| tag["id"].as_str() == Some(DROPS_ENABLED_TAG))
        })
        .unwrap_or(false)
}
