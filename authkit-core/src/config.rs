/// Static configuration for the bridge.
///
/// The namespace keeps AuthKit's secure-storage tags from colliding with
/// unrelated items the host application stores. Biometric keys are tagged
/// `"<key_namespace>.keys.biometric.<kid>"`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct BridgeConfig {
    /// Namespace prefix for secure-storage tags, e.g. `"com.authgear"`.
    pub key_namespace: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            key_namespace: "com.authgear".to_string(),
        }
    }
}
