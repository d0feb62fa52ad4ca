//! # Worker Authorization
//!
//! The dispatcher only needs a yes/no decision per request. [`Authorizer`]
//! is that seam; [`TokenAuthority`] is an in-process bearer-token issuer that
//! workers log in against.

use dashmap::DashMap;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DispatchError;

pub trait Authorizer: Send + Sync {
    fn authorize(&self, credential: Option<&str>) -> bool;
}

/// Accepts every request, with or without a credential.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _credential: Option<&str>) -> bool {
        true
    }
}

/// Issues opaque bearer tokens to registered accounts.
#[derive(Debug, Default)]
pub struct TokenAuthority {
    accounts: HashMap<String, String>,
    tokens: DashMap<String, String>,
}

impl TokenAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single account, typically the shared worker identity.
    pub fn with_account(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.accounts.insert(login.into(), password.into());
        self
    }

    pub fn login(&self, login: &str, password: &str) -> Result<String, DispatchError> {
        match self.accounts.get(login) {
            Some(expected) if expected == password => {
                let token = Uuid::new_v4().to_string();
                self.tokens.insert(token.clone(), login.to_string());
                debug!(login, "Issued worker token");
                Ok(token)
            }
            _ => {
                warn!(login, "Rejected worker login");
                Err(DispatchError::Unauthorized)
            }
        }
    }

    /// Invalidate a previously issued token.
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    /// Invalidate every issued token.
    pub fn revoke_all(&self) {
        self.tokens.clear();
    }

    pub fn active_tokens(&self) -> usize {
        self.tokens.len()
    }
}

impl Authorizer for TokenAuthority {
    fn authorize(&self, credential: Option<&str>) -> bool {
        credential.is_some_and(|token| self.tokens.contains_key(token))
    }
}
