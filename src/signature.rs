//! Inbound webhook signature verification.
//!
//! Slack signs each request with `v0=` + HMAC-SHA256 over
//! `v0:{timestamp}:{raw_body}` using the app's signing secret, and stamps
//! the request time in a separate header. Verification never errors:
//! malformed headers simply fail the check and the caller rejects the
//! request.
//!
//! Protocol: <https://api.slack.com/authentication/verifying-requests-from-slack>

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed skew between the request timestamp and now, in seconds.
/// Requests outside this window are treated as replays.
pub const REPLAY_WINDOW_SECS: i64 = 300;

const SIGNATURE_PREFIX: &str = "v0=";

/// Verifies that inbound requests were signed with the shared secret.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    signing_secret: String,
}

impl SignatureVerifier {
    /// Create a verifier for the given signing secret.
    #[must_use]
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
        }
    }

    /// Whether the timestamp header is numeric and within the replay window.
    ///
    /// A missing or non-numeric header is stale, never an error.
    #[must_use]
    pub fn is_fresh(&self, timestamp: &str) -> bool {
        let Ok(ts) = timestamp.trim().parse::<i64>() else {
            return false;
        };
        (chrono::Utc::now().timestamp() - ts).abs() <= REPLAY_WINDOW_SECS
    }

    /// Whether the signature header matches the HMAC of the raw body.
    ///
    /// The comparison is constant-time (`Mac::verify_slice`); a malformed
    /// signature (missing prefix, bad hex) fails the check without erroring.
    #[must_use]
    pub fn signature_matches(&self, body: &str, timestamp: &str, signature: &str) -> bool {
        let Some(hex_digest) = signature.strip_prefix(SIGNATURE_PREFIX) else {
            return false;
        };
        let Ok(provided) = hex::decode(hex_digest) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(self.signing_secret.as_bytes()) else {
            return false;
        };
        mac.update(format!("v0:{timestamp}:{body}").as_bytes());
        mac.verify_slice(&provided).is_ok()
    }

    /// Full verification: freshness window plus signature match.
    #[must_use]
    pub fn verify(&self, body: &str, timestamp: &str, signature: &str) -> bool {
        self.is_fresh(timestamp) && self.signature_matches(body, timestamp, signature)
    }
}
