/// Errors that can occur in the security layer.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    /// The shared secret was empty.
    #[error("shared secret must not be empty")]
    EmptySecret,

    /// Metadata could not be encoded into canonical form.
    #[error("failed to encode envelope metadata: {0}")]
    Encode(#[from] serde_json::Error),

    /// Payload encryption failed.
    #[error("payload encryption failed: {0}")]
    EncryptionFailed(String),

    /// Ciphertext was truncated, tampered with, or sealed under another key.
    #[error("payload decryption failed")]
    DecryptionFailed,
}

pub type Result<T> = std::result::Result<T, SecurityError>;
