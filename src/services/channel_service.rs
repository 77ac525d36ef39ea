use crate::error::{MinerError, Result};
use crate::models::gql::{CHANNEL_POINTS_CONTEXT, GET_STREAM_INFO};
use crate::models::payload::WatchPayload;
use crate::models::stream::{Game, Stream};
use crate::services::hooks::{ChannelDisplay, ChannelEvents};
use crate::services::spade_service;
use crate::services::transport::TwitchTransport;
use crate::utils::json;
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::AbortHandle;

pub const BASE_URL: &str = "https://www.twitch.tv";

/// Status the spade endpoint answers an accepted minute-watched with.
const WATCH_ACCEPTED: u16 = 204;

/// Everything a channel talks to.
#[derive(Clone)]
pub struct ChannelContext {
    pub transport: Arc<dyn TwitchTransport>,
    pub display: Arc<dyn ChannelDisplay>,
    pub events: Arc<dyn ChannelEvents>,
    /// "stream-up" arrives well before the stream info can be queried, so wait this long first.
    pub online_delay: Duration,
}

struct PendingOnline {
    generation: u64,
    handle: AbortHandle,
}

#[derive(Default)]
struct ChannelState {
    display_name: Option<String>,
    points: Option<u64>,
    stream: Option<Stream>,
    pending_online: Option<PendingOnline>,
    // Only valid for the current `stream`, cleared whenever it's replaced
    payload: Option<WatchPayload>,
    next_generation: u64,
}

impl ChannelState {
    fn set_stream(&mut self, stream: Option<Stream>) {
        self.stream = stream;
        self.payload = None;
    }

    /// Safe to call when nothing is pending or the task already finished.
    fn cancel_pending(&mut self) -> bool {
        match self.pending_online.take() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }
}

/// What a live lookup says about a channel.
struct UserInfo {
    id: u64,
    display_name: Option<String>,
    stream: Option<Stream>,
}

/// A followable broadcaster and its liveness.
///
/// The state machine has three states:
/// - OFFLINE: no stream, nothing pending
/// - PENDING_ONLINE: a "stream-up" was received, the delayed confirmation is running
/// - ONLINE: a stream is known
///
/// Equality and hashing use the channel id only. The id is written at most once: a channel
/// created with id `0` gets it filled by its first live lookup, so don't put unresolved
/// channels in id-keyed collections. [`Channel::from_name`] resolves before returning and
/// fails for logins Twitch doesn't know.
pub struct Channel {
    id: AtomicU64,
    login: String,
    /// Priority channels are considered first when picking what to watch.
    priority: bool,
    ctx: ChannelContext,
    spade_url: OnceCell<String>,
    state: Mutex<ChannelState>,
}

impl Channel {
    pub fn new(
        ctx: ChannelContext,
        id: u64,
        login: impl Into<String>,
        display_name: Option<String>,
        priority: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: AtomicU64::new(id),
            login: login.into(),
            priority,
            ctx,
            spade_url: OnceCell::new(),
            state: Mutex::new(ChannelState {
                display_name,
                ..Default::default()
            }),
        })
    }

    /// Channels from the drops campaign ACL are always priority channels.
    pub fn from_acl(ctx: ChannelContext, data: &Value) -> Result<Arc<Self>> {
        Ok(Self::new(
            ctx,
            json::id(data, "id")?,
            json::string(data, "name")?,
            data.get("displayName")
                .and_then(|name| name.as_str())
                .map(|name| name.to_string()),
            true,
        ))
    }

    /// A directory node describes both the broadcaster and its live stream.
    pub fn from_directory(ctx: ChannelContext, data: &Value) -> Result<Arc<Self>> {
        let broadcaster = json::required(data, "broadcaster")?;
        let stream = Stream::from_directory(data)?;
        let channel = Self::new(
            ctx,
            json::id(broadcaster, "id")?,
            json::string(broadcaster, "login")?,
            Some(json::string(broadcaster, "displayName")?.to_string()),
            false,
        );
        channel.state().set_stream(Some(stream));
        Ok(channel)
    }

    /// Looks the channel up by login, filling in its id and display name.
    pub async fn from_name(ctx: ChannelContext, login: &str, priority: bool) -> Result<Arc<Self>> {
        let channel = Self::new(ctx, 0, login, None, priority);
        let user = channel
            .lookup()
            .await?
            .ok_or_else(|| MinerError::ChannelNotFound(login.to_string()))?;
        {
            let mut state = channel.state();
            channel.apply_identity(&mut state, &user);
            state.set_stream(user.stream);
        }
        Ok(channel)
    }

    fn state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> u64 {
        self.id.load(Ordering::SeqCst)
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn priority(&self) -> bool {
        self.priority
    }

    pub fn display_name(&self) -> Option<String> {
        self.state().display_name.clone()
    }

    pub fn name(&self) -> String {
        self.display_name().unwrap_or_else(|| self.login.clone())
    }

    pub fn url(&self) -> String {
        format!("{}/{}", BASE_URL, self.login)
    }

    /// Key of this channel's row in the channel list.
    pub fn iid(&self) -> String {
        self.id().to_string()
    }

    pub fn points(&self) -> Option<u64> {
        self.state().points
    }

    pub fn is_online(&self) -> bool {
        self.state().stream.is_some()
    }

    /// Offline and not about to come online either.
    pub fn is_offline(&self) -> bool {
        let state = self.state();
        state.stream.is_none() && state.pending_online.is_none()
    }

    /// A "stream-up" was received and the stream info isn't confirmed yet.
    pub fn is_pending_online(&self) -> bool {
        self.state().pending_online.is_some()
    }

    pub fn stream(&self) -> Option<Stream> {
        self.state().stream.clone()
    }

    pub fn game(&self) -> Option<Game> {
        self.state()
            .stream
            .as_ref()
            .and_then(|stream| stream.game().cloned())
    }

    pub fn viewers(&self) -> Option<u64> {
        self.state().stream.as_ref().map(|stream| stream.viewers())
    }

    /// Viewer counts come in separately from stream info. Not part of the payload.
    pub fn set_viewers(&self, viewers: u64) {
        if let Some(stream) = self.state().stream.as_mut() {
            stream.set_viewers(viewers);
        }
    }

    pub fn drops_enabled(&self) -> bool {
        self.state()
            .stream
            .as_ref()
            .map(|stream| stream.drops_enabled())
            .unwrap_or(false)
    }

    pub fn display(&self, add: bool) {
        self.ctx.display.display(self, add);
    }

    /// Detaches the channel from the channel list, cancelling a pending confirmation.
    pub fn remove(&self) {
        self.state().cancel_pending();
        self.ctx.display.remove(self);
    }

    fn resolve_id(&self, id: u64) {
        if let Err(current) = self
            .id
            .compare_exchange(0, id, Ordering::SeqCst, Ordering::SeqCst)
        {
            if current != id {
                warn!(
                    "{} was reported with id {}, keeping {}",
                    self.login, id, current
                );
            }
        }
    }

    fn apply_identity(&self, state: &mut ChannelState, user: &UserInfo) {
        self.resolve_id(user.id);
        if user.display_name.is_some() {
            state.display_name = user.display_name.clone();
        }
    }

    async fn lookup(&self) -> Result<Option<UserInfo>> {
        let response = self
            .ctx
            .transport
            .gql_request(&GET_STREAM_INFO, json!({ "channel": self.login }))
            .await?;
        let Some(response) = response else {
            return Ok(None);
        };

        let user = json::field(json::required(&response, "data")?, "user")?;
        if user.is_null() {
            return Ok(None);
        }

        let stream = if json::field(user, "stream")?.is_null() {
            None
        } else {
            Some(Stream::from_get_stream(user)?)
        };
        Ok(Some(UserInfo {
            id: json::id(user, "id")?,
            display_name: user
                .get("displayName")
                .and_then(|name| name.as_str())
                .map(|name| name.to_string()),
            stream,
        }))
    }

    /// Queries the live stream, filling in the channel id and display name on the way.
    /// Doesn't change the liveness state.
    pub async fn get_stream(&self) -> Result<Option<Stream>> {
        let Some(user) = self.lookup().await? else {
            return Ok(None);
        };
        self.apply_identity(&mut self.state(), &user);
        Ok(user.stream)
    }

    /// Polls the channel and adopts whatever stream it reports. Returns whether it's online.
    ///
    /// Finding a stream while PENDING_ONLINE completes the pending confirmation early, firing
    /// the same hooks the delayed confirmation would have.
    pub async fn check_online(self: &Arc<Self>) -> Result<bool> {
        let user = self.lookup().await?;

        let (online, confirmed_pending) = {
            let mut state = self.state();
            let stream = match user {
                Some(user) => {
                    self.apply_identity(&mut state, &user);
                    user.stream
                }
                None => None,
            };
            let confirmed_pending = stream.is_some() && state.cancel_pending();
            state.set_stream(stream);
            (state.stream.is_some(), confirmed_pending)
        };

        if confirmed_pending {
            debug!("{} confirmed online while pending", self.login);
            self.display(false);
            self.ctx.events.on_online(self);
        }
        Ok(online)
    }

    /// Called when a "stream-up" event is received. Moves an OFFLINE channel to
    /// PENDING_ONLINE and confirms it after the online delay. Needs a tokio runtime.
    pub fn signal_going_live(self: &Arc<Self>) {
        {
            let mut state = self.state();
            if state.stream.is_some() || state.pending_online.is_some() {
                return;
            }
            let generation = state.next_generation;
            state.next_generation += 1;

            let channel = Arc::downgrade(self);
            let delay = self.ctx.online_delay;
            let task = tokio::spawn(Self::confirm_online(channel, delay, generation));
            state.pending_online = Some(PendingOnline {
                generation,
                handle: task.abort_handle(),
            });
        }
        debug!("{} is pending online", self.login);
        self.display(false);
    }

    /// Called when a "stream-down" event is received.
    pub fn signal_going_offline(self: &Arc<Self>) {
        let (was_pending, was_online) = {
            let mut state = self.state();
            let was_pending = state.cancel_pending();
            let was_online = state.stream.is_some();
            if was_online {
                state.set_stream(None);
            }
            (was_pending, was_online)
        };

        if was_pending {
            debug!("{} pending online cancelled", self.login);
            self.display(false);
        }
        if was_online {
            self.display(false);
            self.ctx.events.on_offline(self);
        }
    }

    async fn confirm_online(channel: Weak<Channel>, delay: Duration, generation: u64) {
        tokio::time::sleep(delay).await;
        let Some(channel) = channel.upgrade() else {
            return;
        };
        let lookup = channel.lookup().await;

        let online = {
            let mut state = channel.state();
            // Cancelled or superseded while the lookup was in flight
            match &state.pending_online {
                Some(pending) if pending.generation == generation => {}
                _ => return,
            }
            state.pending_online = None;
            match lookup {
                Ok(user) => {
                    let stream = user.and_then(|user| {
                        channel.apply_identity(&mut state, &user);
                        user.stream
                    });
                    let online = stream.is_some();
                    state.set_stream(stream);
                    online
                }
                Err(e) => {
                    error!("❌ Failed to confirm {} online: {}", channel.login, e);
                    false
                }
            }
        };

        channel.display(false);
        if online {
            channel.ctx.events.on_online(&channel);
        }
    }

    /// The minute-watched body for the current stream, built once per stream.
    pub fn payload(&self) -> Option<WatchPayload> {
        let mut state = self.state();
        let broadcast_id = state.stream.as_ref()?.broadcast_id();
        let payload = state.payload.get_or_insert_with(|| {
            WatchPayload::minute_watched(self.id(), broadcast_id, self.ctx.transport.user_id())
        });
        Some(payload.clone())
    }

    pub async fn spade_url(&self) -> Result<&str> {
        let url = self.url();
        let spade_url = self
            .spade_url
            .get_or_try_init(|| spade_service::resolve_spade_url(self.ctx.transport.as_ref(), &url))
            .await?;
        Ok(spade_url.as_str())
    }

    /// Sends one minute-watched heartbeat. Optimally called every 60 seconds while online.
    ///
    /// Returns `Ok(false)` when offline or when the heartbeat wasn't accepted, including when the
    /// POST itself fails. Errors come from spade URL resolution only: an extraction step not
    /// matching, or the transport failing while fetching the channel page or settings script.
    pub async fn send_watch(&self) -> Result<bool> {
        if !self.is_online() {
            return Ok(false);
        }
        let spade_url = self.spade_url().await?;
        // Might have gone offline while resolving
        let Some(payload) = self.payload() else {
            return Ok(false);
        };

        debug!("Sending minute-watched to {}", self.name());
        match self
            .ctx
            .transport
            .post_form(spade_url, &payload.as_form())
            .await
        {
            Ok(WATCH_ACCEPTED) => Ok(true),
            Ok(status) => {
                warn!("⚠️ minute-watched for {} returned status {}", self.name(), status);
                Ok(false)
            }
            Err(e) => {
                warn!("❌ minute-watched for {} failed: {}", self.name(), e);
                Ok(false)
            }
        }
    }

    /// Refreshes the points balance and claims the bonus chest if there is one.
    pub async fn claim_bonus(&self) -> Result<()> {
        let response = self
            .ctx
            .transport
            .gql_request(&CHANNEL_POINTS_CONTEXT, json!({ "channelLogin": self.login }))
            .await?
            .ok_or_else(|| MinerError::missing("data"))?;

        let channel_data = json::path(&response, &["data", "community", "channel"])?;
        let points = json::path(channel_data, &["self", "communityPoints"])?;
        self.state().points = Some(json::uint(points, "balance")?);

        let available_claim = json::field(points, "availableClaim")?;
        if available_claim.is_null() {
            // A claim refreshes the display through the websocket, nothing will here
            self.display(false);
            return Ok(());
        }

        let channel_id = json::id(channel_data, "id")?.to_string();
        let claim_id = json::string(available_claim, "id")?;
        self.ctx.transport.claim_points(&channel_id, claim_id).await?;
        info!("🎁 Claimed bonus points on {}", self.name());
        Ok(())
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Channel {}

impl Hash for Channel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.display_name() {
            Some(display_name) => write!(f, "Channel({}({}), {})", display_name, self.login, self.id()),
            None => write!(f, "Channel({}, {})", self.login, self.id()),
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
