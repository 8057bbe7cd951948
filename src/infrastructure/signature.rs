//! Verification of payment confirmations reported by the client.
//!
//! The gateway signs `"{order_id}|{payment_id}"` with HMAC-SHA256 using the
//! merchant key secret and hands the hex digest to the client. Anything the
//! client reports is only trusted once that digest checks out.

use crate::error::ConfigError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Holds the keyed MAC used to check payment signatures.
#[derive(Clone)]
pub struct SignatureVerifier {
    mac: HmacSha256,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    /// Fails only when the secret is empty, which is a deployment error.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
            ConfigError::Invalid {
                field: "key_secret",
                reason: e.to_string(),
            }
        })?;
        Ok(Self { mac })
    }

    /// Hex signature the gateway issues for this order/payment pair.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        hex::encode(self.digest(order_id, payment_id))
    }

    /// Constant-time check of `claimed_signature`. Anything other than
    /// lowercase hex of the right length is simply a mismatch.
    pub fn verify(&self, order_id: &str, payment_id: &str, claimed_signature: &str) -> bool {
        if !claimed_signature
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return false;
        }
        let Ok(claimed) = hex::decode(claimed_signature) else {
            return false;
        };
        let expected = self.digest(order_id, payment_id);
        if claimed.len() != expected.len() {
            return false;
        }
        expected.ct_eq(&claimed).into()
    }

    fn digest(&self, order_id: &str, payment_id: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// One-shot form of [`SignatureVerifier::verify`].
pub fn verify(
    order_id: &str,
    payment_id: &str,
    claimed_signature: &str,
    secret: &str,
) -> Result<bool, ConfigError> {
    Ok(SignatureVerifier::new(secret)?.verify(order_id, payment_id, claimed_signature))
}
