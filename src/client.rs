use crate::api::{ApiError, RequestClient};
use crate::config::{ConfigError, ConfigStore};
use crate::credentials::CredentialStore;
use crate::dispatch::Dispatcher;
use crate::push::PushChannel;
use crate::session::Session;
use crate::types::{
    Channel, ConnectionStatus, Invalidation, LoginResponse, MessageRecord, SendOutcome,
    UserSummary,
};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// The process-wide messaging runtime a desktop shell embeds.
///
/// Owns the endpoint configuration, the session and credential chain, both
/// transports, and the dispatcher, and exposes the operations the view layer
/// needs. The session lifecycle is explicit: empty at construction,
/// populated by [`ChatClient::login`], emptied by [`ChatClient::logout`].
pub struct ChatClient {
    config: ConfigStore,
    session: Session,
    credentials: CredentialStore,
    api: Arc<RequestClient>,
    push: Arc<PushChannel>,
    dispatcher: Arc<Dispatcher>,
}

impl ChatClient {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_config(ConfigStore::new())
    }

    pub fn with_config(config: ConfigStore) -> Result<Self, ApiError> {
        let session = Session::new();
        let credentials = CredentialStore::with_default_backends(session.clone());
        let api = Arc::new(RequestClient::new(config.clone(), credentials.clone())?);
        let push = PushChannel::new(config.clone(), credentials.clone());
        let dispatcher = Dispatcher::new(push.clone(), api.clone());

        Ok(Self {
            config,
            session,
            credentials,
            api,
            push,
            dispatcher,
        })
    }

    /// Authenticate and store the returned bearer token through the
    /// credential chain. A response without a recognizable token leaves the
    /// session anonymous; the login call itself still succeeded.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let response = self.api.login(username, password).await?;
        if let Some(token) = response.bearer_token() {
            self.credentials.store(token);
        }
        Ok(response)
    }

    /// Tear down the session: best-effort clear of every credential tier.
    pub fn logout(&self) {
        self.credentials.clear();
    }

    pub fn connect(&self) {
        self.push.clone().connect();
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.push.status()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.push.watch_status()
    }

    pub fn subscribe(&self, channel_id: &str) {
        self.dispatcher.subscribe(channel_id);
    }

    pub async fn send_message(&self, channel_id: &str, body: &str) -> SendOutcome {
        self.dispatcher.send_message(channel_id, body).await
    }

    pub fn invalidations(&self) -> broadcast::Receiver<Invalidation> {
        self.dispatcher.invalidations()
    }

    pub async fn channels(&self) -> Result<Vec<Channel>, ApiError> {
        self.api.list_channels().await
    }

    pub async fn users(&self) -> Result<Vec<UserSummary>, ApiError> {
        self.api.list_users().await
    }

    pub async fn channel_messages(&self, channel_id: &str) -> Result<Vec<MessageRecord>, ApiError> {
        self.api.channel_messages(channel_id).await
    }

    pub fn base_url(&self) -> String {
        self.config.base_url()
    }

    pub fn set_base_url(&self, url: &str) -> Result<(), ConfigError> {
        self.config.set_base_url(url)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_starts_anonymous_and_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        let client =
            ChatClient::with_config(ConfigStore::with_path(dir.path().join("config.json")))
                .unwrap();

        assert_eq!(client.connection_status(), ConnectionStatus::Disconnected);
        assert_eq!(client.session().token(), None);
        assert_eq!(client.base_url(), crate::config::DEFAULT_BASE_URL);
    }

    #[tokio::test]
    async fn set_base_url_takes_effect_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let client =
            ChatClient::with_config(ConfigStore::with_path(dir.path().join("config.json")))
                .unwrap();

        client.set_base_url("http://192.168.1.4:9000/").unwrap();
        assert_eq!(client.base_url(), "http://192.168.1.4:9000");
    }
}
