//! The exported bridge surface.

use std::sync::Arc;

use crate::assertion::AssertionSigner;
use crate::biometric::{BiometricConstraint, BiometricPolicyGate};
use crate::capabilities::Capabilities;
use crate::config::BridgeConfig;
use crate::key_manager::BiometricKeyManager;
use crate::platform::{
    BiometricAuthenticator, KeyVault, SecretItemBackend, WebAuthPresenter,
};
use crate::secret_store::SecureItemStore;
use crate::web_auth::WebAuthSession;
use crate::AuthKitError;

/// The main entry point for host applications.
///
/// Constructed once with the platform implementations; capability detection
/// happens here and the resulting flags are consulted by every operation
/// instead of repeated platform checks.
#[derive(uniffi::Object)]
pub struct AuthKitBridge {
    key_manager: BiometricKeyManager,
    signer: AssertionSigner,
    secrets: SecureItemStore,
    web_auth: WebAuthSession,
    capabilities: Capabilities,
}

#[uniffi::export]
impl AuthKitBridge {
    /// Creates a bridge over the platform implementations.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(
        config: BridgeConfig,
        authenticator: Arc<dyn BiometricAuthenticator>,
        vault: Arc<dyn KeyVault>,
        secrets: Arc<dyn SecretItemBackend>,
        presenter: Arc<dyn WebAuthPresenter>,
    ) -> Arc<Self> {
        let capabilities = Capabilities {
            biometrics_supported: authenticator.supported(),
            web_auth_supported: presenter.supported(),
        };
        log::info!(
            "bridge initialized (biometrics: {}, web auth: {})",
            capabilities.biometrics_supported,
            capabilities.web_auth_supported
        );

        let gate = BiometricPolicyGate::new(authenticator, capabilities.biometrics_supported);
        let key_manager =
            BiometricKeyManager::new(gate, Arc::clone(&vault), config.key_namespace);

        Arc::new(Self {
            key_manager,
            signer: AssertionSigner::new(vault),
            secrets: SecureItemStore::new(secrets),
            web_auth: WebAuthSession::new(presenter, capabilities.web_auth_supported),
            capabilities,
        })
    }

    /// The capability flags detected at construction.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Non-interactive check that biometric authentication can be evaluated.
    ///
    /// # Errors
    /// [`AuthKitError::Unsupported`] or [`AuthKitError::PolicyUnavailable`].
    pub fn is_biometric_supported(&self) -> Result<bool, AuthKitError> {
        self.key_manager.gate().is_supported()
    }

    /// Creates a biometric key for `kid` and returns a signed assertion
    /// over `payload_json` bound to it.
    ///
    /// The user authenticates first (showing `reason`); only then is a key
    /// pair generated and persisted under the given constraint.
    ///
    /// # Errors
    /// `Cancelled`, `PolicyUnavailable`, `GenerationFailed`,
    /// `PersistenceFailed`, `SigningFailed`, `Unsupported`, or
    /// `InvalidInput`/`Serialization` for a malformed payload.
    #[allow(clippy::needless_pass_by_value)]
    pub async fn create_assertion(
        &self,
        kid: String,
        payload_json: String,
        constraint: BiometricConstraint,
        reason: String,
    ) -> Result<String, AuthKitError> {
        let payload = parse_payload(&payload_json)?;
        let handle = self
            .key_manager
            .create(&kid, constraint, &reason)
            .await
            .inspect_err(|err| {
                log::warn!("create_assertion({kid}) failed: {err} [{}]", err.code());
            })?;
        self.signer.sign(&handle, &payload).await
    }

    /// Signs an assertion over `payload_json` with the existing key for
    /// `kid`. The signing call itself raises the key's re-authentication
    /// prompt.
    ///
    /// # Errors
    /// `NotFound`, `Cancelled`, `SigningFailed`, `Unsupported`, or
    /// `InvalidInput`/`Serialization` for a malformed payload.
    #[allow(clippy::needless_pass_by_value)]
    pub async fn sign_assertion(
        &self,
        kid: String,
        payload_json: String,
    ) -> Result<String, AuthKitError> {
        let payload = parse_payload(&payload_json)?;
        let handle = self.key_manager.locate(&kid)?;
        self.signer
            .sign(&handle, &payload)
            .await
            .inspect_err(|err| {
                log::warn!("sign_assertion({kid}) failed: {err} [{}]", err.code());
            })
    }

    /// Removes the biometric key for `kid`; absence is success.
    ///
    /// # Errors
    /// [`AuthKitError::OsFailure`] on a genuine storage fault.
    #[allow(clippy::needless_pass_by_value)]
    pub fn remove_key(&self, kid: String) -> Result<(), AuthKitError> {
        self.key_manager.delete(&kid)
    }

    /// Upserts a secret value by name.
    ///
    /// # Errors
    /// [`AuthKitError::OsFailure`].
    #[allow(clippy::needless_pass_by_value)]
    pub fn store_secret(&self, name: String, value: String) -> Result<(), AuthKitError> {
        self.secrets.set(&name, &value)
    }

    /// Reads a secret by name; `None` exactly when absent.
    ///
    /// # Errors
    /// [`AuthKitError::OsFailure`].
    #[allow(clippy::needless_pass_by_value)]
    pub fn fetch_secret(&self, name: String) -> Result<Option<String>, AuthKitError> {
        self.secrets.get(&name)
    }

    /// Deletes a secret by name; absence is success.
    ///
    /// # Errors
    /// [`AuthKitError::OsFailure`].
    #[allow(clippy::needless_pass_by_value)]
    pub fn delete_secret(&self, name: String) -> Result<(), AuthKitError> {
        self.secrets.delete(&name)
    }

    /// Opens an interactive web-authentication session and returns the
    /// redirect URL it ended with.
    ///
    /// # Errors
    /// `Unsupported`, `Cancelled`, `InvalidInput`, or `OsFailure`.
    #[allow(clippy::needless_pass_by_value)]
    pub async fn authenticate(
        &self,
        url: String,
        redirect_uri: String,
        prefer_ephemeral: bool,
    ) -> Result<String, AuthKitError> {
        self.web_auth
            .authenticate(&url, &redirect_uri, prefer_ephemeral)
            .await
    }

    /// Opens `url` in an ephemeral browser session; returns when the user
    /// closes it.
    ///
    /// # Errors
    /// `Unsupported` or `OsFailure`.
    #[allow(clippy::needless_pass_by_value)]
    pub async fn open_url(&self, url: String) -> Result<(), AuthKitError> {
        self.web_auth.open_url(&url).await
    }

    /// Generates a random UUID string.
    #[must_use]
    #[allow(clippy::unused_self)] // associated functions are not supported with Uniffi exports
    pub fn generate_uuid(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Payloads cross the FFI as JSON text; anything but a JSON object is
/// rejected before any interactive prompt fires.
fn parse_payload(payload_json: &str) -> Result<serde_json::Value, AuthKitError> {
    let value: serde_json::Value =
        serde_json::from_str(payload_json).map_err(|e| AuthKitError::serialization(&e))?;
    if !value.is_object() {
        return Err(AuthKitError::InvalidInput {
            parameter: "payload".to_string(),
            reason: "payload must be a JSON object".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_must_be_an_object() {
        assert!(parse_payload(r#"{"challenge":"abc"}"#).is_ok());
        assert!(matches!(
            parse_payload("[1,2,3]"),
            Err(AuthKitError::InvalidInput { .. })
        ));
        assert!(matches!(
            parse_payload("not json"),
            Err(AuthKitError::Serialization { .. })
        ));
    }
}
