//! Venue B request signing: RSA-PSS over SHA-256.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::pss::SigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::RsaPrivateKey;
use sha2::Sha256;

use crate::error::{Error, Result};

/// A loaded venue-B signing key, opaque to callers beyond [`sign`].
pub struct SigningKeyHandle {
    key: SigningKey<Sha256>,
}

impl SigningKeyHandle {
    /// Load a PEM-encoded RSA private key from disk, accepting either
    /// PKCS#8 or PKCS#1 encoding.
    pub fn load_from_pem_file(path: &Path) -> Result<Self> {
        let pem = fs::read_to_string(path)?;
        let private_key = RsaPrivateKey::from_pkcs8_pem(&pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(&pem))
            .map_err(|e| Error::Signing(format!("failed to parse private key: {e}")))?;
        Ok(Self {
            key: SigningKey::<Sha256>::new(private_key),
        })
    }

    /// Sign `<timestamp_ms> || "GET" || <upgrade_path>` and return the
    /// base64-encoded PSS signature.
    #[must_use]
    pub fn sign(&self, timestamp_ms: i64, upgrade_path: &str) -> String {
        let message = format!("{timestamp_ms}GET{upgrade_path}");
        let mut rng = rand::rngs::OsRng;
        let signature = self.key.sign_with_rng(&mut rng, message.as_bytes());
        BASE64.encode(signature.to_bytes())
    }
}

/// Produces the three connection headers the venue expects on upgrade.
pub struct SignedHandshake {
    pub key_id: String,
    pub signature_b64: String,
    pub timestamp_ms: i64,
}

#[must_use]
pub fn build_handshake(key: &SigningKeyHandle, key_id: &str, upgrade_path: &str, now_ms: i64) -> SignedHandshake {
    SignedHandshake {
        key_id: key_id.to_string(),
        signature_b64: key.sign(now_ms, upgrade_path),
        timestamp_ms: now_ms,
    }
}
