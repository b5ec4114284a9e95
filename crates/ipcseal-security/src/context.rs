use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;
#[cfg(not(feature = "encryption"))]
use tracing::warn;
use zeroize::Zeroizing;

#[cfg(feature = "encryption")]
use chacha20poly1305::{aead::Aead, Key, XChaCha20Poly1305, XNonce};

use crate::config::SecurityConfig;
use crate::error::{Result, SecurityError};
use crate::meta::EnvelopeMeta;

type HmacSha256 = Hmac<Sha256>;

/// Separator between canonical metadata and the encoded payload.
const SIGNATURE_SEPARATOR: u8 = b'.';

/// XChaCha20 nonce length, prepended to every ciphertext.
#[cfg(feature = "encryption")]
const NONCE_LEN: usize = 24;

/// Shared-secret holder: signs and verifies envelopes, optionally encrypts
/// payloads.
///
/// Immutable after construction. Every process that exchanges messages must
/// build its context from the same secret.
pub struct SecurityContext {
    secret: Zeroizing<Vec<u8>>,
    #[cfg(feature = "encryption")]
    cipher: Option<XChaCha20Poly1305>,
}

impl SecurityContext {
    /// Create a signing-only context.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self> {
        Self::with_config(secret, SecurityConfig::default())
    }

    /// Create a context with explicit configuration.
    ///
    /// When encryption is requested the payload key is SHA-256 of the secret.
    /// If this build lacks the `encryption` feature the context falls back to
    /// signing only and logs a warning.
    pub fn with_config(secret: impl Into<Vec<u8>>, config: SecurityConfig) -> Result<Self> {
        let secret = Zeroizing::new(secret.into());
        if secret.is_empty() {
            return Err(SecurityError::EmptySecret);
        }

        #[cfg(feature = "encryption")]
        {
            use chacha20poly1305::KeyInit;
            use sha2::Digest;

            let cipher = config.enable_encryption.then(|| {
                let mut key = Zeroizing::new([0u8; 32]);
                key.copy_from_slice(&Sha256::digest(secret.as_slice()));
                XChaCha20Poly1305::new(Key::from_slice(key.as_slice()))
            });
            debug!(encryption = cipher.is_some(), "security context ready");
            Ok(Self { secret, cipher })
        }

        #[cfg(not(feature = "encryption"))]
        {
            if config.enable_encryption {
                warn!("payload encryption requested but not compiled in; signing only");
            }
            debug!(encryption = false, "security context ready");
            Ok(Self { secret })
        }
    }

    /// Whether payloads are encrypted before signing.
    pub fn encryption_enabled(&self) -> bool {
        #[cfg(feature = "encryption")]
        {
            self.cipher.is_some()
        }
        #[cfg(not(feature = "encryption"))]
        {
            false
        }
    }

    /// Sign `meta` and the already base64-encoded payload.
    ///
    /// Signature input is `canonical(meta) || b'.' || payload_b64`; the
    /// HMAC-SHA256 digest is returned base64-encoded. Deterministic.
    pub fn sign(&self, meta: &EnvelopeMeta, payload_b64: &str) -> Result<String> {
        let mac = self.mac_over(meta, payload_b64)?;
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Check `signature_b64` against `meta` and `payload_b64` in constant time.
    ///
    /// Any malformed input yields `false`; this never fails.
    pub fn verify(&self, meta: &EnvelopeMeta, payload_b64: &str, signature_b64: &str) -> bool {
        let Ok(signature) = STANDARD.decode(signature_b64) else {
            return false;
        };
        let Ok(mac) = self.mac_over(meta, payload_b64) else {
            return false;
        };
        mac.verify_slice(&signature).is_ok()
    }

    /// Encrypt a payload. Identity when encryption is off.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        #[cfg(feature = "encryption")]
        if let Some(cipher) = &self.cipher {
            let mut nonce = [0u8; NONCE_LEN];
            rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce);

            let ciphertext = cipher
                .encrypt(XNonce::from_slice(&nonce), plaintext)
                .map_err(|e| SecurityError::EncryptionFailed(e.to_string()))?;

            let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
            sealed.extend_from_slice(&nonce);
            sealed.extend_from_slice(&ciphertext);
            return Ok(sealed);
        }

        Ok(plaintext.to_vec())
    }

    /// Decrypt a payload produced by [`encrypt`](Self::encrypt). Identity when
    /// encryption is off.
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        #[cfg(feature = "encryption")]
        if let Some(cipher) = &self.cipher {
            if sealed.len() < NONCE_LEN {
                return Err(SecurityError::DecryptionFailed);
            }
            let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
            return cipher
                .decrypt(XNonce::from_slice(nonce), ciphertext)
                .map_err(|_| SecurityError::DecryptionFailed);
        }

        Ok(sealed.to_vec())
    }

    fn mac_over(&self, meta: &EnvelopeMeta, payload_b64: &str) -> Result<HmacSha256> {
        let meta_json = meta.canonical_bytes()?;
        // HMAC accepts keys of any length; only an empty secret is refused upstream.
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| SecurityError::EmptySecret)?;
        mac.update(&meta_json);
        mac.update(&[SIGNATURE_SEPARATOR]);
        mac.update(payload_b64.as_bytes());
        Ok(mac)
    }
}

impl fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityContext")
            .field(
                "secret",
                &format_args!("<redacted:{} bytes>", self.secret.len()),
            )
            .field("encryption", &self.encryption_enabled())
            .finish()
    }
}
