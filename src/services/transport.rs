use crate::error::{MinerError, Result};
use crate::models::gql::{GqlOperation, CLAIM_COMMUNITY_POINTS};
use crate::models::settings::Settings;
use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

const GQL_URL: &str = "https://gql.twitch.tv/gql";
const VALIDATE_URL: &str = "https://id.twitch.tv/oauth2/validate";
const CLIENT_URL: &str = "https://www.twitch.tv";

/// Authenticated access to Twitch, as seen by a channel.
#[async_trait]
pub trait TwitchTransport: Send + Sync {
    /// GET `url` and return the body as UTF-8 text.
    async fn fetch_text(&self, url: &str) -> Result<String>;

    /// POST a urlencoded form to `url` and return the response status code.
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<u16>;

    /// Run a persisted GQL query. `None` when the server answered with an empty body.
    async fn gql_request(&self, operation: &GqlOperation, variables: Value) -> Result<Option<Value>>;

    async fn claim_points(&self, channel_id: &str, claim_id: &str) -> Result<()>;

    /// Id of the logged in user.
    fn user_id(&self) -> u64;
}

pub struct TwitchClient {
    client: Client,
    auth_token: String,
    client_id: String,
    user_agent: String,
    device_id: String,
    session_id: String,
    user_id: u64,
}

impl TwitchClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .connect_timeout(settings.connect_timeout())
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            auth_token: settings.auth_token.clone(),
            client_id: settings.client_id.clone(),
            user_agent: settings.user_agent.clone(),
            device_id: Uuid::new_v4().to_string().replace("-", ""),
            session_id: Uuid::new_v4().to_string().replace("-", ""),
            user_id: 0,
        })
    }

    /// Validates the token and remembers whose it is.
    pub async fn login(&mut self) -> Result<u64> {
        let response = self
            .client
            .get(VALIDATE_URL)
            .header("Authorization", format!("OAuth {}", self.auth_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MinerError::Status(status.as_u16()));
        }

        let data: Value = response.json().await?;
        self.user_id = crate::utils::json::id(&data, "user_id")?;
        debug!("Logged in as user {}", self.user_id);
        Ok(self.user_id)
    }
}

#[async_trait]
impl TwitchTransport for TwitchClient {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MinerError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<u16> {
        let response = self
            .client
            .post(url)
            .header("User-Agent", &self.user_agent)
            .form(form)
            .send()
            .await?;
        Ok(response.status().as_u16())
    }

    async fn gql_request(&self, operation: &GqlOperation, variables: Value) -> Result<Option<Value>> {
        let response = self
            .client
            .post(GQL_URL)
            .header("Client-Id", &self.client_id)
            .header("Authorization", format!("OAuth {}", self.auth_token))
            .header("User-Agent", &self.user_agent)
            .header("Origin", CLIENT_URL)
            .header("Referer", CLIENT_URL)
            .header("X-Device-Id", &self.device_id)
            .header("Client-Session-Id", &self.session_id)
            .json(&operation.with_variables(variables))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MinerError::Status(status.as_u16()));
        }

        let response_text = response.text().await?;
        if response_text.trim().is_empty() {
            return Ok(None);
        }

        let result: Value = serde_json::from_str(&response_text).map_err(|e| {
            error!(
                "Failed to decode {} response: {}",
                operation.name,
                response_text.chars().take(500).collect::<String>()
            );
            e
        })?;

        if let Some(errors) = result["errors"].as_array() {
            if let Some(first) = errors.first() {
                let message = first["message"].as_str().unwrap_or("Unknown error");
                return Err(MinerError::Gql(format!("{}: {}", operation.name, message)));
            }
        }

        Ok(Some(result))
    }

    async fn claim_points(&self, channel_id: &str, claim_id: &str) -> Result<()> {
        self.gql_request(
            &CLAIM_COMMUNITY_POINTS,
            json!({
                "input": {
                    "channelID": channel_id,
                    "claimID": claim_id,
                }
            }),
        )
        .await?;
        Ok(())
    }

    fn user_id(&self) -> u64 {
        self.user_id
    }
}
