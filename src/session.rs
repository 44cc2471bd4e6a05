use parking_lot::Mutex;
use std::sync::Arc;

/// Process-local volatile credential tier.
///
/// Created empty when the client runtime is constructed, populated on login
/// and emptied on logout. It guarantees the current session keeps working
/// even when every persistent storage tier is unavailable; it never outlives
/// the process.
#[derive(Clone, Default)]
pub struct Session {
    token: Arc<Mutex<Option<String>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    pub fn set_token(&self, value: Option<String>) {
        let mut guard = self.token.lock();
        *guard = value.and_then(|v| {
            let trimmed = v.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        });
    }

    pub fn clear(&self) {
        self.set_token(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_token_normalizes_whitespace_to_none() {
        let session = Session::new();
        session.set_token(Some("  tok-1  ".to_string()));
        assert_eq!(session.token().as_deref(), Some("tok-1"));

        session.set_token(Some("   ".to_string()));
        assert_eq!(session.token(), None);
    }

    #[test]
    fn clear_empties_the_slot() {
        let session = Session::new();
        session.set_token(Some("tok".to_string()));
        session.clear();
        assert_eq!(session.token(), None);
    }

    #[test]
    fn clones_share_the_same_slot() {
        let session = Session::new();
        let other = session.clone();
        session.set_token(Some("tok".to_string()));
        assert_eq!(other.token().as_deref(), Some("tok"));
    }
}
