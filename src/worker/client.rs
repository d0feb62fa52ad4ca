//! Transport seam between a worker and the coordinator it serves.

use async_trait::async_trait;
use std::sync::Arc;

use crate::auth::TokenAuthority;
use crate::error::DispatchError;
use crate::models::{SubmitResultRequest, TaskPayload};
use crate::orchestration::Coordinator;

/// What a worker needs from a coordinator: credentials, a poll and a
/// result submission. Payloads use the wire shapes from [`crate::models`].
#[async_trait]
pub trait DispatchClient: Send + Sync {
    /// Obtain a fresh credential. Called on start and after `Unauthorized`.
    async fn login(&self) -> Result<Option<String>, DispatchError>;

    async fn poll_task(&self, credential: Option<&str>) -> Result<TaskPayload, DispatchError>;

    async fn submit_result(
        &self,
        credential: Option<&str>,
        request: &SubmitResultRequest,
    ) -> Result<(), DispatchError>;
}

/// Talks to a coordinator in the same process.
#[derive(Clone)]
pub struct LocalDispatchClient {
    coordinator: Coordinator,
    authority: Option<Arc<TokenAuthority>>,
    login: String,
    password: String,
}

impl LocalDispatchClient {
    /// Client for a coordinator that accepts anonymous requests.
    pub fn anonymous(coordinator: Coordinator) -> Self {
        Self {
            coordinator,
            authority: None,
            login: String::new(),
            password: String::new(),
        }
    }

    /// Client that logs in against `authority` with the given account.
    pub fn authenticated(
        coordinator: Coordinator,
        authority: Arc<TokenAuthority>,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            coordinator,
            authority: Some(authority),
            login: login.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl DispatchClient for LocalDispatchClient {
    async fn login(&self) -> Result<Option<String>, DispatchError> {
        match &self.authority {
            Some(authority) => authority.login(&self.login, &self.password).map(Some),
            None => Ok(None),
        }
    }

    async fn poll_task(&self, credential: Option<&str>) -> Result<TaskPayload, DispatchError> {
        self.coordinator
            .get_task(credential)
            .map(|task| task.to_payload())
    }

    async fn submit_result(
        &self,
        credential: Option<&str>,
        request: &SubmitResultRequest,
    ) -> Result<(), DispatchError> {
        self.coordinator
            .submit_result(credential, request.id, request.result)
    }
}
