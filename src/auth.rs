use std::sync::{Arc, RwLock};

use log::warn;

/// Shared handle to the bearer token. Every request reads the token from
/// here and an authentication failure clears it for all holders.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    token: Arc<RwLock<Option<String>>>,
}

impl AuthSession {
    pub fn new(token: Option<String>) -> Self {
        Self { token: Arc::new(RwLock::new(token.filter(|t| !t.is_empty()))) }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token.into());
        }
    }

    pub fn expire(&self) {
        if let Ok(mut slot) = self.token.write() {
            if slot.take().is_some() {
                warn!("session expired, login required");
            }
        }
    }
}
