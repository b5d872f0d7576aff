//! Startup-time credential allow-list.
//!
//! Built once from configuration and injected into the orchestrator; there is
//! no ambient global state. Authorization runs before any side effect.

use std::collections::HashMap;

use crate::domain::error::{DeployError, Result};

/// Allow-listed requester identities and their secrets.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    allowed: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, E, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (E, S)>,
        E: Into<String>,
        S: Into<String>,
    {
        let allowed = pairs
            .into_iter()
            .map(|(email, secret)| (email.into(), secret.into()))
            .collect();
        Self { allowed }
    }

    pub fn allow(&mut self, email: impl Into<String>, secret: impl Into<String>) {
        self.allowed.insert(email.into(), secret.into());
    }

    /// Check a presented credential against the allow-list. Unknown identity
    /// and wrong secret are indistinguishable to the caller.
    pub fn authorize(&self, email: &str, secret: &str) -> Result<()> {
        match self.allowed.get(email) {
            Some(expected) if expected == secret => Ok(()),
            _ => Err(DeployError::Unauthorized(email.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}
