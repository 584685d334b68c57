use async_trait::async_trait;

use crate::{
    error::BackendError,
    types::{LoginRequest, SessionResult},
};

/// Backend session endpoints used by the login flow.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// `POST /api/users/login` with the verified identity.
    async fn login(&self, request: &LoginRequest) -> Result<SessionResult, BackendError>;

    /// `GET /api/users/logout`. The response body carries nothing useful.
    async fn logout(&self) -> Result<(), BackendError>;
}
