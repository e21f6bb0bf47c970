use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Secret hashed once at startup so lookups that find no stored digest
/// still pay for a full bcrypt verification.
const DUMMY_SECRET: &str = "bpay-absent-credential";

// =============================================================================
// Credential Verifier
// =============================================================================

/// Salted one-way hashing for user passwords and saving PINs
///
/// Both secret classes go through the same bcrypt discipline. Verification
/// answers only "matches" or "does not match": a missing digest, a corrupt
/// digest and a wrong secret are indistinguishable to the caller, and all
/// three cost the same amount of work.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    cost: u32,
    dummy_digest: String,
}

impl CredentialVerifier {
    /// Build a verifier with the given bcrypt cost (4..=31)
    pub fn new(cost: u32) -> Result<Self> {
        let dummy_digest = bcrypt::hash(DUMMY_SECRET, cost)?;
        Ok(Self { cost, dummy_digest })
    }

    /// Hash a secret with a fresh random salt
    pub fn hash(&self, secret: &str) -> Result<String> {
        Ok(bcrypt::hash(secret, self.cost)?)
    }

    /// Verify a secret against a stored digest
    ///
    /// `None` means no record exists; the dummy digest is checked instead and
    /// the result is always a mismatch.
    pub fn verify(&self, digest: Option<&str>, secret: &str) -> bool {
        match digest {
            Some(digest) => bcrypt::verify(secret, digest).unwrap_or_else(|e| {
                tracing::warn!("Stored credential digest is unreadable: {}", e);
                false
            }),
            None => {
                let _ = bcrypt::verify(secret, &self.dummy_digest);
                false
            }
        }
    }
}

// =============================================================================
// HMAC Signing
// =============================================================================

/// Hex-encoded SHA-256 of the input
///
/// Used to bind signed markers to a stored digest without embedding it.
pub fn fingerprint(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute a hex-encoded HMAC-SHA256 signature
pub fn sign_hmac(data: &str, secret: &str) -> Result<String> {
    let mut mac = match <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("Failed to create HMAC instance");
            return Err(AppError::Signing(e.to_string()));
        }
    };

    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify HMAC-SHA256 signature
///
/// The comparison runs in constant time.
///
/// # Arguments
/// * `data` - The data that was signed
/// * `signature` - The hex-encoded HMAC signature
/// * `secret` - The server-side secret key (from environment)
pub fn verify_hmac(data: &str, signature: &str, secret: &str) -> bool {
    // Create HMAC instance with secret key
    let mut mac = match <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            tracing::error!("Failed to create HMAC instance");
            return false;
        }
    };

    mac.update(data.as_bytes());

    let sig_bytes = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => {
            tracing::warn!("Invalid hex signature format");
            return false;
        }
    };

    mac.verify_slice(&sig_bytes).is_ok()
}
