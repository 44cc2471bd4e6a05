use crate::session::Session;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl From<keyring::Error> for BackendError {
    fn from(err: keyring::Error) -> Self {
        Self(err.to_string())
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        Self(err.to_string())
    }
}

/// One persistent storage tier in the credential chain. Absence of a stored
/// token is `Ok(None)`; only an unavailable or failing backend is an error.
pub trait CredentialBackend: Send + Sync {
    fn label(&self) -> &'static str;
    fn load(&self) -> Result<Option<String>, BackendError>;
    fn store(&self, token: &str) -> Result<(), BackendError>;
    fn clear(&self) -> Result<(), BackendError>;
}

const KEYRING_SERVICE: &str = "io.tidechat.desktop";
const KEYRING_USER: &str = "session_token";

/// Secure tier: the OS keychain / secret service.
pub struct KeyringBackend {
    entry: Option<keyring::Entry>,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self {
            entry: keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).ok(),
        }
    }

    fn entry(&self) -> Result<&keyring::Entry, BackendError> {
        self.entry
            .as_ref()
            .ok_or_else(|| BackendError("keychain unavailable".to_string()))
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialBackend for KeyringBackend {
    fn label(&self) -> &'static str {
        "keyring"
    }

    fn load(&self) -> Result<Option<String>, BackendError> {
        match self.entry()?.get_password() {
            Ok(pwd) => {
                let trimmed = pwd.trim().to_string();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(trimmed))
                }
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, token: &str) -> Result<(), BackendError> {
        self.entry()?.set_password(token)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), BackendError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

const TOKEN_FILE: &str = "token";

/// Legacy tier: a plaintext token file under the user config dir. Kept so
/// installs that predate keychain storage keep resolving, and as the write
/// target when the keychain rejects calls.
pub struct TokenFileBackend {
    path: Option<PathBuf>,
}

impl TokenFileBackend {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Default location: `<config dir>/tidechat/token`.
    pub fn default_location() -> Self {
        Self::new(dirs::config_dir().map(|d| d.join(crate::config::CONFIG_DIR).join(TOKEN_FILE)))
    }

    fn path(&self) -> Result<&PathBuf, BackendError> {
        self.path
            .as_ref()
            .ok_or_else(|| BackendError("config dir unavailable".to_string()))
    }
}

impl CredentialBackend for TokenFileBackend {
    fn label(&self) -> &'static str {
        "token-file"
    }

    fn load(&self) -> Result<Option<String>, BackendError> {
        match std::fs::read_to_string(self.path()?) {
            Ok(raw) => {
                let trimmed = raw.trim().to_string();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(trimmed))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, token: &str) -> Result<(), BackendError> {
        let path = self.path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, token)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), BackendError> {
        match std::fs::remove_file(self.path()?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Prioritized chain of credential tiers: secure keychain, legacy token
/// file, then the process-local [`Session`]. An earlier tier always wins
/// deterministically; tiers are consulted to completion, never raced.
#[derive(Clone)]
pub struct CredentialStore {
    secure: Arc<dyn CredentialBackend>,
    legacy: Arc<dyn CredentialBackend>,
    session: Session,
}

impl CredentialStore {
    pub fn new(
        secure: Arc<dyn CredentialBackend>,
        legacy: Arc<dyn CredentialBackend>,
        session: Session,
    ) -> Self {
        Self {
            secure,
            legacy,
            session,
        }
    }

    pub fn with_default_backends(session: Session) -> Self {
        Self::new(
            Arc::new(KeyringBackend::new()),
            Arc::new(TokenFileBackend::default_location()),
            session,
        )
    }

    /// First tier that yields a non-empty value wins. A failing tier is
    /// logged and treated as absent; terminal absence is `None`, never an
    /// error. Anonymous operation is a valid state.
    pub fn resolve(&self) -> Option<String> {
        for backend in [&self.secure, &self.legacy] {
            match backend.load() {
                Ok(Some(token)) => return Some(token),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(backend = backend.label(), error = %e, "credential tier unavailable");
                }
            }
        }
        self.session.token()
    }

    /// Write to the secure tier, falling back to the legacy tier on failure.
    /// The session tier is always updated so `resolve` succeeds for the rest
    /// of the process lifetime even if both persistent writes failed.
    pub fn store(&self, token: &str) {
        if let Err(e) = self.secure.store(token) {
            tracing::warn!(backend = self.secure.label(), error = %e, "secure credential write failed");
            if let Err(e) = self.legacy.store(token) {
                tracing::warn!(backend = self.legacy.label(), error = %e, "legacy credential write failed");
            }
        }
        self.session.set_token(Some(token.to_string()));
    }

    /// Best-effort clear of every tier; a failing tier never prevents
    /// clearing the others.
    pub fn clear(&self) {
        for backend in [&self.secure, &self.legacy] {
            if let Err(e) = backend.clear() {
                tracing::warn!(backend = backend.label(), error = %e, "credential clear failed");
            }
        }
        self.session.clear();
    }
}
