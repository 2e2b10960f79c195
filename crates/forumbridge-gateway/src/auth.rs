// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification.
//!
//! Discourse signs each delivery with HMAC-SHA256 over the raw request body,
//! sent as `X-Discourse-Event-Signature: sha256=<hex>`. When no secret is
//! configured, deliveries are accepted unsigned.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-discourse-event-signature";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Webhook authentication configuration.
#[derive(Clone, Default)]
pub struct WebhookAuth {
    /// Shared secret. `None` disables verification.
    pub secret: Option<String>,
}

impl std::fmt::Debug for WebhookAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookAuth")
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl WebhookAuth {
    /// Checks `signature` (the raw header value) against `body`.
    ///
    /// Always true when no secret is configured. The comparison is constant-time.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> bool {
        let Some(secret) = self.secret.as_deref() else {
            return true;
        };
        let Some(hex_digest) = signature.and_then(|s| s.trim().strip_prefix(SIGNATURE_PREFIX))
        else {
            return false;
        };
        let Ok(expected) = hex::decode(hex_digest) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }
}

/// Computes the header value Discourse would send for `body`.
pub fn sign(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(secret: Option<&str>) -> WebhookAuth {
        WebhookAuth {
            secret: secret.map(str::to_string),
        }
    }

    #[test]
    fn unsigned_accepted_without_secret() {
        assert!(auth(None).verify(b"{}", None));
    }

    #[test]
    fn valid_signature_accepted() {
        let body = br#"{"post":{"id":1}}"#;
        let signature = sign("s3cret", body).unwrap();
        assert!(auth(Some("s3cret")).verify(body, Some(&signature)));
    }

    #[test]
    fn wrong_or_missing_signature_rejected() {
        let body = br#"{"post":{"id":1}}"#;
        let signature = sign("other", body).unwrap();
        let auth = auth(Some("s3cret"));
        assert!(!auth.verify(body, Some(&signature)));
        assert!(!auth.verify(body, None));
        assert!(!auth.verify(body, Some("sha256=zz")));
        assert!(!auth.verify(body, Some("deadbeef")));
    }

    #[test]
    fn debug_redacts_secret() {
        let debug = format!("{:?}", auth(Some("s3cret")));
        assert!(!debug.contains("s3cret"));
    }
}
