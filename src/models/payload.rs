use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;

/// Player tag reported with every minute-watched event.
const PLAYER: &str = "site";

#[derive(Serialize)]
struct MinuteWatched {
    event: &'static str,
    properties: WatchProperties,
}

// Field order is the order Twitch's own player sends them in
#[derive(Serialize)]
struct WatchProperties {
    channel_id: u64,
    broadcast_id: u64,
    player: &'static str,
    user_id: u64,
}

/// Form body of a minute-watched heartbeat: `data=<base64 of the JSON event list>`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WatchPayload {
    pub data: String,
}

impl WatchPayload {
    pub fn minute_watched(channel_id: u64, broadcast_id: u64, user_id: u64) -> Self {
        let events = [MinuteWatched {
            event: "minute-watched",
            properties: WatchProperties {
                channel_id,
                broadcast_id,
                player: PLAYER,
                user_id,
            },
        }];
        let json_event = serde_json::to_string(&events)
            .expect("minute-watched events hold only integers and static strings");
        Self {
            data: general_purpose::STANDARD.encode(json_event.as_bytes()),
        }
    }

    pub fn as_form(&self) -> [(&'static str, &str); 1] {
        [("data", self.data.as_str())]
    }
}
