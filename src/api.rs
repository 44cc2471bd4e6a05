use crate::config::ConfigStore;
use crate::credentials::CredentialStore;
use crate::types::{Channel, LoginResponse, MessageRecord, UserSummary};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server returned {status}")]
    Http { status: u16 },
}

/// Reliable request/response transport. Every call resolves the current
/// credential and endpoint configuration on the way out; neither resolution
/// can abort a call — the request proceeds against the default endpoint and
/// without an Authorization header rather than failing locally. Only the
/// remote call itself errors, and that error propagates to the caller with
/// no local retry.
pub struct RequestClient {
    http: reqwest::Client,
    config: ConfigStore,
    credentials: CredentialStore,
}

impl RequestClient {
    pub fn new(config: ConfigStore, credentials: CredentialStore) -> Result<Self, ApiError> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            config,
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.config.base_url(), path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.resolve() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let res = self.authorize(self.http.get(self.url(path))).send().await?;
        if !res.status().is_success() {
            return Err(ApiError::Http {
                status: res.status().as_u16(),
            });
        }
        Ok(res.json().await?)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let res = self
            .authorize(self.http.post(self.url("/api/login")))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(ApiError::Http {
                status: res.status().as_u16(),
            });
        }
        Ok(res.json().await?)
    }

    pub async fn list_channels(&self) -> Result<Vec<Channel>, ApiError> {
        self.get_json("/api/channels").await
    }

    pub async fn list_users(&self) -> Result<Vec<UserSummary>, ApiError> {
        self.get_json("/api/users").await
    }

    pub async fn channel_messages(&self, channel_id: &str) -> Result<Vec<MessageRecord>, ApiError> {
        self.get_json(&format!(
            "/api/channels/{}/messages",
            urlencoding::encode(channel_id)
        ))
        .await
    }

    pub async fn send_channel_message(&self, channel_id: &str, body: &str) -> Result<(), ApiError> {
        let path = format!("/api/channels/{}/messages", urlencoding::encode(channel_id));
        let res = self
            .authorize(self.http.post(self.url(&path)))
            .json(&json!({ "body": body }))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(ApiError::Http {
                status: res.status().as_u16(),
            });
        }
        Ok(())
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
