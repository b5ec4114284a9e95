use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ipcseal_security::{EnvelopeMeta, SecurityContext};

use crate::error::{ChannelError, Result};

/// The signed record every transport carries.
///
/// Serialized as compact JSON:
/// `{"meta":{"client_id":..,"ts":..},"payload":"<b64>","hmac":"<b64>"}`.
/// `payload` is the base64 of the (possibly encrypted) message bytes and
/// `hmac` is the signature over `meta` and `payload`. Fields are private so
/// an envelope is only ever produced by [`seal`](Self::seal) or parsed off
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    meta: EnvelopeMeta,
    payload: String,
    hmac: String,
}

impl Envelope {
    /// Encrypt (when enabled), encode and sign `message` as `client_id`,
    /// stamped with the current time.
    pub fn seal(security: &SecurityContext, client_id: &str, message: &[u8]) -> Result<Self> {
        Self::seal_with_meta(security, EnvelopeMeta::now(client_id), message)
    }

    /// Like [`seal`](Self::seal) with caller-provided metadata.
    pub fn seal_with_meta(
        security: &SecurityContext,
        meta: EnvelopeMeta,
        message: &[u8],
    ) -> Result<Self> {
        let body = security.encrypt(message)?;
        let payload = STANDARD.encode(body);
        let hmac = security.sign(&meta, &payload)?;
        Ok(Self {
            meta,
            payload,
            hmac,
        })
    }

    /// Verify the signature, then decode and decrypt the payload.
    ///
    /// Verification runs before any payload processing.
    pub fn open(self, security: &SecurityContext) -> Result<(EnvelopeMeta, Vec<u8>)> {
        if !security.verify(&self.meta, &self.payload, &self.hmac) {
            warn!("envelope signature mismatch");
            return Err(ChannelError::VerificationFailed);
        }
        let body = STANDARD
            .decode(self.payload.as_bytes())
            .map_err(|_| ChannelError::VerificationFailed)?;
        let message = security.decrypt(&body)?;
        debug!(client_id = %self.meta.client_id, len = message.len(), "envelope opened");
        Ok((self.meta, message))
    }

    /// Serialize to the compact wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ChannelError::Security(e.into()))
    }

    /// Parse the wire form. Anything that is not a well-formed envelope is a
    /// verification failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|err| {
            debug!(error = %err, "malformed envelope");
            ChannelError::VerificationFailed
        })
    }

    pub fn meta(&self) -> &EnvelopeMeta {
        &self.meta
    }

    /// Base64 of the (possibly encrypted) body.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Base64 HMAC-SHA256 signature.
    pub fn hmac(&self) -> &str {
        &self.hmac
    }
}

/// Seal `message` and return its wire bytes.
pub fn package(security: &SecurityContext, client_id: &str, message: &[u8]) -> Result<Vec<u8>> {
    Envelope::seal(security, client_id, message)?.to_bytes()
}

/// Parse, verify and open wire bytes produced by [`package`].
pub fn unpackage(security: &SecurityContext, bytes: &[u8]) -> Result<(EnvelopeMeta, Vec<u8>)> {
    Envelope::from_bytes(bytes)?.open(security)
}
