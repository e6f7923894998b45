/// Feature availability on this device, detected once when the bridge is
/// constructed.
///
/// Operations consult these flags instead of re-checking the platform on
/// every call; an absent capability surfaces
/// [`AuthKitError::Unsupported`](crate::AuthKitError::Unsupported).
#[derive(Debug, Clone, Copy, uniffi::Record)]
pub struct Capabilities {
    /// Biometric-gated key operations are available.
    pub biometrics_supported: bool,
    /// OS web-authentication sessions are available.
    pub web_auth_supported: bool,
}
