//! Runtime configuration.

use crate::error::ConfigError;
use std::time::Duration;

pub const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.razorpay.com";
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;

/// Credentials and transport settings for the payment gateway.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Public key id, handed to clients to open the hosted payment UI.
    pub key_id: String,
    /// Shared secret for basic auth and payment signatures.
    pub key_secret: String,
    pub base_url: String,
    /// Upper bound for any single gateway call.
    pub timeout: Duration,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("key_id", &self.key_id)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GatewayConfig {
    pub fn new(
        key_id: Option<String>,
        key_secret: Option<String>,
        base_url: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let key_id = key_id
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingKeyId)?;
        let key_secret = key_secret
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingSecret)?;
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_GATEWAY_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeout_secs = timeout_secs.unwrap_or(DEFAULT_GATEWAY_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "gateway_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Self {
            key_id,
            key_secret,
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
