//! Time-limited tracking tokens.
//!
//! A token binds a chat id to the unix second it was issued at:
//!
//! ```text
//! sig = base64url_nopad(HMAC-SHA256(secret, "{user_id}:{issued_at}"))
//! ```
//!
//! The form backend holds the same secret and echoes the token back when the
//! user submits the form.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::types::UserId;

type HmacSha256 = Hmac<Sha256>;

/// Default validity window of a tracking token (48 hours).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(48 * 60 * 60);

/// Gets the current Unix timestamp in seconds.
#[must_use]
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// A signed `(user_id, issued_at)` pair ready to be put into a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    /// Chat the token was issued for.
    pub user_id: UserId,

    /// Unix timestamp (seconds) of issuance.
    pub issued_at: i64,

    /// URL-safe base64 signature without padding.
    pub signature: String,
}

impl SignedToken {
    /// Returns the token as `c`, `ts` and `sig` query parameters.
    #[must_use]
    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("c", self.user_id.to_string()),
            ("ts", self.issued_at.to_string()),
            ("sig", self.signature.clone()),
        ]
    }
}

/// Issues and verifies tracking tokens and webhook body signatures.
#[derive(Clone)]
pub struct LinkSigner {
    secret: Arc<SecretString>,
    ttl: Duration,
}

impl LinkSigner {
    /// Creates a signer with the default 48 hour token TTL.
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret: Arc::new(secret),
            ttl: DEFAULT_TOKEN_TTL,
        }
    }

    /// Sets the token validity window.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the configured token validity window.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `user_id` stamped with the current time.
    #[must_use]
    pub fn issue(&self, user_id: UserId) -> SignedToken {
        self.issue_at(user_id, now_unix())
    }

    /// Issues a token for `user_id` stamped with `issued_at`.
    #[must_use]
    pub fn issue_at(&self, user_id: UserId, issued_at: i64) -> SignedToken {
        SignedToken {
            user_id,
            issued_at,
            signature: self.sign(user_id, issued_at),
        }
    }

    /// Computes the token signature for `(user_id, issued_at)`.
    #[must_use]
    pub fn sign(&self, user_id: UserId, issued_at: i64) -> String {
        let mut mac = self.mac();
        mac.update(canonical(user_id, issued_at).as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Verifies a token against the configured TTL and the current clock.
    #[must_use]
    pub fn verify(&self, user_id: UserId, issued_at: i64, signature: &str) -> bool {
        self.verify_at(user_id, issued_at, signature, self.ttl, now_unix())
    }

    /// Verifies a token as of `now` with an explicit `ttl`.
    ///
    /// Fails closed: a token issued more than `ttl` away from `now` (in either
    /// direction), a signature that is not valid unpadded base64url, or a
    /// signature that does not match all yield `false`. The comparison is
    /// constant-time.
    #[must_use]
    pub fn verify_at(
        &self,
        user_id: UserId,
        issued_at: i64,
        signature: &str,
        ttl: Duration,
        now: i64,
    ) -> bool {
        if now.abs_diff(issued_at) > ttl.as_secs() {
            return false;
        }

        let Ok(provided) = URL_SAFE_NO_PAD.decode(signature.as_bytes()) else {
            return false;
        };

        let mut mac = self.mac();
        mac.update(canonical(user_id, issued_at).as_bytes());
        mac.verify_slice(&provided).is_ok()
    }

    /// Computes the HMAC-SHA256 of a raw webhook body.
    #[must_use]
    pub fn sign_body(&self, body: &[u8]) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(body);
        mac.finalize().into_bytes().to_vec()
    }

    /// Checks `provided` against the HMAC-SHA256 of `body` in constant time.
    #[must_use]
    pub fn verify_body(&self, body: &[u8], provided: &[u8]) -> bool {
        let mut mac = self.mac();
        mac.update(body);
        mac.verify_slice(provided).is_ok()
    }

    #[allow(clippy::expect_used)]
    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC can take key of any size")
    }
}

impl fmt::Debug for LinkSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkSigner")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

fn canonical(user_id: UserId, issued_at: i64) -> String {
    format!("{user_id}:{issued_at}")
}
