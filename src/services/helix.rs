use crate::config::{Config, HELIX_MAX_LOGINS, TOKEN_EXPIRY_BUFFER_SECS};
use crate::errors::StatusError;
use crate::models::{AppToken, StreamSnapshot, UserProfile};
use crate::services::TwitchApi;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;


const HELIX_PAGE_SIZE: &str = "100"; // matches HELIX_MAX_LOGINS

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct HelixPage<T> {
    data: Vec<T>,
}

/// Process-wide app access token, refreshed lazily once it is past expiry.
#[derive(Default)]
pub struct TokenCache {
    pub(crate) entry: Mutex<Option<AppToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, StatusError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TokenResponse, StatusError>>,
    {
        let mut entry = self.entry.lock().await;
        if let Some(cached) = entry.as_ref() {
            if SystemTime::now() < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        let response = refresh().await?;
        let lifetime = response.expires_in.saturating_sub(TOKEN_EXPIRY_BUFFER_SECS);
        *entry = Some(AppToken {
            token: response.access_token.clone(),
            expires_at: SystemTime::now() + Duration::from_secs(lifetime),
        });
        log::debug!("Obtained Twitch app access token valid for {}s", lifetime);
        Ok(response.access_token)
    }
}

pub struct HelixClient {
    client: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    helix_url: String,
    tokens: TokenCache,
}

impl HelixClient {
    pub fn new(config: &Config) -> Result<Self, StatusError> {
        let client = Client::builder()
            .timeout(config.upstream_timeout)
            .build()?;
        Ok(Self::with_client(
            client,
            &config.client_id,
            &config.client_secret,
            &config.token_url,
            &config.helix_url,
        ))
    }

    pub fn with_client(
        client: Client,
        client_id: &str,
        client_secret: &str,
        token_url: &str,
        helix_url: &str,
    ) -> Self {
        Self {
            client,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token_url: token_url.to_string(),
            helix_url: helix_url.trim_end_matches('/').to_string(),
            tokens: TokenCache::new(),
        }
    }

    pub async fn get_token(&self) -> Result<String, StatusError> {
        self.tokens.get_or_refresh(|| self.request_token()).await
    }

    async fn request_token(&self) -> Result<TokenResponse, StatusError> {
        log::debug!("Requesting Twitch app access token");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];
        let token = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .json::<TokenResponse>()
            .await?;
        Ok(token)
    }

    /// Looks up `logins` on a Helix endpoint keyed by login, one request per
    /// chunk of at most `HELIX_MAX_LOGINS`. `extra` is appended to every request.
    async fn get_by_login<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        key: &str,
        logins: &[String],
        extra: &[(&str, &str)],
    ) -> Result<Vec<T>, StatusError> {
        if logins.is_empty() {
            return Ok(Vec::new());
        }

        let token = self.get_token().await?;
        let url = format!("{}/{}", self.helix_url, endpoint);
        let mut results = Vec::with_capacity(logins.len());

        for chunk in logins.chunks(HELIX_MAX_LOGINS) {
            let mut query: Vec<(&str, &str)> = chunk.iter().map(|login| (key, login.as_str())).collect();
            query.extend_from_slice(extra);
            let page = self
                .client
                .get(&url)
                .header("Client-Id", &self.client_id)
                .header(AUTHORIZATION, format!("Bearer {}", token))
                .query(&query)
                .send()
                .await?
                .error_for_status()?
                .json::<HelixPage<T>>()
                .await?;
            results.extend(page.data);
        }

        Ok(results)
    }
}

#[async_trait]
impl TwitchApi for HelixClient {
    async fn get_users(&self, logins: &[String]) -> Result<Vec<UserProfile>, StatusError> {
        self.get_by_login("users", "login", logins, &[]).await
    }

    async fn get_streams(&self, logins: &[String]) -> Result<Vec<StreamSnapshot>, StatusError> {
        // Helix pages streams at 20 by default; one page must cover a whole chunk.
        self.get_by_login("streams", "user_login", logins, &[("first", HELIX_PAGE_SIZE)])
            .await
    }
}
