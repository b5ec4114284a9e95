/// Controls optional security behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityConfig {
    /// Encrypt payloads before signing. Only takes effect when the
    /// `encryption` feature is compiled in.
    pub enable_encryption: bool,
}
