mod api;
mod client;
mod config;
mod credentials;
mod dispatch;
mod logging;
mod push;
mod redact;
mod session;
pub mod types;

pub use api::{ApiError, RequestClient};
pub use client::ChatClient;
pub use config::{ConfigError, ConfigStore, DEFAULT_BASE_URL};
pub use credentials::{
    BackendError, CredentialBackend, CredentialStore, KeyringBackend, TokenFileBackend,
};
pub use dispatch::{Dispatcher, MessagePoster, PushSend};
pub use logging::init_logging;
pub use push::{EventSink, NotSentReason, PushChannel, SendAttempt};
pub use redact::redact_secrets;
pub use session::Session;
pub use types::{
    Channel, ConnectionStatus, Invalidation, LoginResponse, MessageRecord, SendOutcome,
    UserSummary,
};
