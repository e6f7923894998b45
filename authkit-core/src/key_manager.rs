//! Lifecycle of biometric-gated RSA signing keys.

use std::sync::Arc;

use rand::rngs::OsRng;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::RsaPrivateKey;
use zeroize::Zeroize;

use crate::biometric::{BiometricConstraint, BiometricPolicyGate};
use crate::platform::{AccessPolicy, KeyVault, PlatformStatus};
use crate::AuthKitError;

/// Key size of every key pair this subsystem generates. The fixed-offset
/// JWK derivation in [`crate::jwk`] depends on this shape.
const KEY_BITS: usize = 2048;

/// A located or freshly created biometric key.
///
/// Carries the vault tag for signing and the vault's public-key export for
/// JWK derivation; the private half never leaves the vault.
#[derive(Debug)]
pub struct KeyHandle {
    /// Caller-chosen key identifier.
    pub kid: String,
    /// Application tag addressing the key in the vault.
    pub tag: String,
    /// PKCS#1 `RSAPublicKey` DER export of the public half.
    pub public_key_der: Vec<u8>,
}

/// Owns the create/locate/delete lifecycle of biometric keys.
pub struct BiometricKeyManager {
    gate: BiometricPolicyGate,
    vault: Arc<dyn KeyVault>,
    namespace: String,
}

impl BiometricKeyManager {
    /// Creates a manager storing keys under the given namespace.
    #[must_use]
    pub fn new(
        gate: BiometricPolicyGate,
        vault: Arc<dyn KeyVault>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            gate,
            vault,
            namespace: namespace.into(),
        }
    }

    /// The deterministic vault tag for a key identifier.
    #[must_use]
    pub fn tag_for(&self, kid: &str) -> String {
        format!("{}.keys.biometric.{kid}", self.namespace)
    }

    /// Creates a fresh biometric key for `kid`.
    ///
    /// Authentication comes first: no key material is generated unless the
    /// prompt succeeds. The generated RSA-2048 private key is persisted under
    /// an access policy requiring the given constraint, a set device
    /// passcode, and device-local storage.
    ///
    /// # Errors
    /// The gate's own failures ([`AuthKitError::Cancelled`],
    /// [`AuthKitError::PolicyUnavailable`], [`AuthKitError::Unsupported`]),
    /// [`AuthKitError::GenerationFailed`] if key generation fails, or
    /// [`AuthKitError::PersistenceFailed`] if storage fails; in that case
    /// nothing remains reachable in the vault.
    pub async fn create(
        &self,
        kid: &str,
        constraint: BiometricConstraint,
        reason: &str,
    ) -> Result<KeyHandle, AuthKitError> {
        self.gate.evaluate(constraint, reason).await?;

        let private = RsaPrivateKey::new(&mut OsRng, KEY_BITS).map_err(|e| {
            AuthKitError::GenerationFailed {
                message: e.to_string(),
            }
        })?;
        let der = private
            .to_pkcs1_der()
            .map_err(|e| AuthKitError::GenerationFailed {
                message: e.to_string(),
            })?;

        let tag = self.tag_for(kid);
        let policy = AccessPolicy {
            constraint,
            require_passcode_set: true,
            this_device_only: true,
        };

        let mut key_bytes = der.as_bytes().to_vec();
        let stored = self
            .vault
            .store_private_key(tag.clone(), key_bytes.clone(), policy);
        key_bytes.zeroize();
        if let Err(status) = stored {
            // A failed store must not leave a partially added key behind.
            let _ = self.vault.delete_key(tag.clone());
            return Err(status.into_persistence_failure());
        }

        self.handle_from_vault(kid, tag)
    }

    /// Locates the persisted key for `kid` without prompting; the signing
    /// call is what triggers the key's own access-control prompt.
    ///
    /// # Errors
    /// [`AuthKitError::NotFound`] if no key is stored for `kid`,
    /// [`AuthKitError::OsFailure`] on a storage fault.
    pub fn locate(&self, kid: &str) -> Result<KeyHandle, AuthKitError> {
        let tag = self.tag_for(kid);
        match self.vault.public_key_der(tag.clone()) {
            Ok(public_key_der) => Ok(KeyHandle {
                kid: kid.to_string(),
                tag,
                public_key_der,
            }),
            Err(PlatformStatus::NotFound) => Err(AuthKitError::NotFound {
                kid: kid.to_string(),
            }),
            Err(status) => Err(status.into_os_failure()),
        }
    }

    /// Removes the persisted key for `kid`; absence is success.
    ///
    /// # Errors
    /// [`AuthKitError::OsFailure`] on a genuine storage fault.
    pub fn delete(&self, kid: &str) -> Result<(), AuthKitError> {
        match self.vault.delete_key(self.tag_for(kid)) {
            Ok(()) | Err(PlatformStatus::NotFound) => Ok(()),
            Err(status) => Err(status.into_os_failure()),
        }
    }

    /// The policy gate backing create operations.
    #[must_use]
    pub const fn gate(&self) -> &BiometricPolicyGate {
        &self.gate
    }

    /// Re-reads the public half from the vault so the handle always
    /// describes a key that is reachable in storage.
    fn handle_from_vault(&self, kid: &str, tag: String) -> Result<KeyHandle, AuthKitError> {
        match self.vault.public_key_der(tag.clone()) {
            Ok(public_key_der) => Ok(KeyHandle {
                kid: kid.to_string(),
                tag,
                public_key_der,
            }),
            // The key was just stored; its absence means the vault broke the
            // storage contract.
            Err(PlatformStatus::NotFound) => Err(AuthKitError::Unreachable),
            Err(status) => Err(status.into_os_failure()),
        }
    }
}
