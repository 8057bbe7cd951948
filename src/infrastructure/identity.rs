use crate::domain::ids::UserId;
use crate::domain::ports::IdentityProvider;
use crate::error::ReservationError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Asks the identity collaborator who owns a bearer token.
///
/// Sends `GET <url>` with the bearer and expects `{"id": "<user id>"}`.
#[derive(Debug, Clone)]
pub struct RemoteIdentityProvider {
    http: Client,
    url: String,
}

#[derive(Deserialize)]
struct IdentityUser {
    id: String,
}

impl RemoteIdentityProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ReservationError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReservationError::Internal(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentityProvider {
    async fn authenticate(&self, bearer: &str) -> Result<UserId, ReservationError> {
        if bearer.is_empty() {
            return Err(ReservationError::Unauthorized);
        }
        let response = self
            .http
            .get(&self.url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "identity lookup failed");
                ReservationError::IdentityUnavailable(e.to_string())
            })?;
        let status = response.status();
        if status.is_server_error() {
            warn!(%status, "identity service error");
            return Err(ReservationError::IdentityUnavailable(status.to_string()));
        }
        if !status.is_success() {
            return Err(ReservationError::Unauthorized);
        }
        let user: IdentityUser = response
            .json()
            .await
            .map_err(|_| ReservationError::Unauthorized)?;
        if user.id.is_empty() {
            return Err(ReservationError::Unauthorized);
        }
        Ok(UserId(user.id))
    }
}

/// Development-only provider that treats the bearer itself as the user id.
///
/// Only wired up in sandbox mode; never use it in front of real payments.
#[derive(Debug, Clone, Default)]
pub struct DevIdentityProvider;

#[async_trait]
impl IdentityProvider for DevIdentityProvider {
    async fn authenticate(&self, bearer: &str) -> Result<UserId, ReservationError> {
        let bearer = bearer.trim();
        if bearer.is_empty() {
            Err(ReservationError::Unauthorized)
        } else {
            Ok(UserId::new(bearer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dev_identity() {
        let provider = DevIdentityProvider;
        assert_eq!(
            provider.authenticate("renter-7").await.unwrap(),
            UserId::new("renter-7")
        );
        assert_eq!(
            provider.authenticate("  ").await,
            Err(ReservationError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn test_unreachable_identity_service_is_unavailable() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let provider =
            RemoteIdentityProvider::new(format!("http://{addr}/user"), Duration::from_secs(2))
                .unwrap();

        let err = provider.authenticate("token").await.unwrap_err();
        assert!(matches!(err, ReservationError::IdentityUnavailable(_)));
        assert_eq!(err.status_code(), 503);
    }
}
