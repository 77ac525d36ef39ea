//! In-memory collaborators for unit tests.

use crate::error::{MinerError, Result};
use crate::models::gql::GqlOperation;
use crate::services::channel_service::Channel;
use crate::services::hooks::{ChannelDisplay, ChannelEvents};
use crate::services::transport::TwitchTransport;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const USER_ID: u64 = 42;

pub enum Reply {
    Gql(Option<Value>),
    Status(u16),
    Fail,
}

#[derive(Default)]
pub struct MockTransport {
    pages: Mutex<HashMap<String, String>>,
    gql_replies: Mutex<VecDeque<Reply>>,
    post_replies: Mutex<VecDeque<Reply>>,
    gql_gate: Mutex<Option<Arc<Notify>>>,
    fetches: Mutex<Vec<String>>,
    posts: Mutex<Vec<(String, String)>>,
    gql_calls: Mutex<Vec<(String, Value)>>,
    claims: Mutex<Vec<(String, String)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, url: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }

    pub fn push_gql(&self, response: Option<Value>) {
        self.gql_replies.lock().unwrap().push_back(Reply::Gql(response));
    }

    pub fn push_gql_failure(&self) {
        self.gql_replies.lock().unwrap().push_back(Reply::Fail);
    }

    /// Statuses returned by `post_form`, in order. 204 once they run out.
    pub fn push_post(&self, reply: Reply) {
        self.post_replies.lock().unwrap().push_back(reply);
    }

    /// Makes GQL requests wait until the returned handle is notified.
    pub fn gate_gql(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gql_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn fetches(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn gql_calls(&self) -> Vec<(String, Value)> {
        self.gql_calls.lock().unwrap().clone()
    }

    pub fn claims(&self) -> Vec<(String, String)> {
        self.claims.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.fetches() + self.posts().len() + self.gql_calls().len() + self.claims().len()
    }
}

#[async_trait]
impl TwitchTransport for MockTransport {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.fetches.lock().unwrap().push(url.to_string());
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(MinerError::Status(404))
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<u16> {
        let data = form
            .iter()
            .find(|(key, _)| *key == "data")
            .map(|(_, value)| value.to_string())
            .unwrap_or_default();
        self.posts.lock().unwrap().push((url.to_string(), data));
        match self.post_replies.lock().unwrap().pop_front() {
            Some(Reply::Status(status)) => Ok(status),
            Some(_) => Err(MinerError::Gql("connection reset".to_string())),
            None => Ok(204),
        }
    }

    async fn gql_request(&self, operation: &GqlOperation, variables: Value) -> Result<Option<Value>> {
        self.gql_calls
            .lock()
            .unwrap()
            .push((operation.name.to_string(), variables));
        let gate = self.gql_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.gql_replies.lock().unwrap().pop_front() {
            Some(Reply::Gql(response)) => Ok(response),
            Some(_) => Err(MinerError::Gql("service timeout".to_string())),
            None => Ok(None),
        }
    }

    async fn claim_points(&self, channel_id: &str, claim_id: &str) -> Result<()> {
        self.claims
            .lock()
            .unwrap()
            .push((channel_id.to_string(), claim_id.to_string()));
        Ok(())
    }

    fn user_id(&self) -> u64 {
        USER_ID
    }
}

/// What a display refresh saw: `(add, is_online, is_pending_online)`.
pub type DisplaySnapshot = (bool, bool, bool);

/// Counts every hook call, and records the channel state each display refresh saw.
#[derive(Default)]
pub struct RecordingHooks {
    pub displays: Mutex<Vec<DisplaySnapshot>>,
    pub removes: Mutex<usize>,
    pub onlines: Mutex<usize>,
    pub offlines: Mutex<usize>,
}

impl RecordingHooks {
    pub fn displays(&self) -> usize {
        self.displays.lock().unwrap().len()
    }

    /// `(is_online, is_pending_online)` as seen by the latest display refresh.
    pub fn last_display(&self) -> Option<(bool, bool)> {
        self.displays
            .lock()
            .unwrap()
            .last()
            .map(|(_, online, pending)| (*online, *pending))
    }

    pub fn onlines(&self) -> usize {
        *self.onlines.lock().unwrap()
    }

    pub fn offlines(&self) -> usize {
        *self.offlines.lock().unwrap()
    }

    pub fn removes(&self) -> usize {
        *self.removes.lock().unwrap()
    }
}

impl ChannelDisplay for RecordingHooks {
    fn display(&self, channel: &Channel, add: bool) {
        let snapshot = (add, channel.is_online(), channel.is_pending_online());
        self.displays.lock().unwrap().push(snapshot);
    }

    fn remove(&self, _channel: &Channel) {
        *self.removes.lock().unwrap() += 1;
    }
}

impl ChannelEvents for RecordingHooks {
    fn on_online(&self, _channel: &Arc<Channel>) {
        *self.onlines.lock().unwrap() += 1;
    }

    fn on_offline(&self, _channel: &Arc<Channel>) {
        *self.offlines.lock().unwrap() += 1;
    }
}
