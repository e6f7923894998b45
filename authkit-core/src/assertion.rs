//! Compact JWT assertion construction and signing.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::jwk::{derive_jwk, Jwk, JWK_ALG};
use crate::key_manager::KeyHandle;
use crate::platform::{KeyVault, SignCompletion, SignOutcome};
use crate::AuthKitError;

/// `typ` value of every assertion header produced here.
pub const ASSERTION_TYP: &str = "vnd.authgear.biometric-request";

/// JWT header embedding the derived JWK. Field order is the wire order.
#[derive(Debug, Serialize)]
struct AssertionHeader {
    typ: String,
    kid: String,
    alg: String,
    jwk: Jwk,
}

/// Builds and signs compact JWT assertions bound to a vault key.
pub struct AssertionSigner {
    vault: Arc<dyn KeyVault>,
}

impl AssertionSigner {
    /// Creates a signer over the given vault.
    #[must_use]
    pub const fn new(vault: Arc<dyn KeyVault>) -> Self {
        Self { vault }
    }

    /// Signs `payload` into a compact `header.payload.signature` token.
    ///
    /// The platform signing call is where the key's access-control policy
    /// raises its re-authentication prompt; cancellation or failure there
    /// fails the whole operation with no partial output.
    ///
    /// Header and payload segments use the standard base64 alphabet while
    /// the JWK's `n`/`e` are base64url. Existing verifiers depend on this
    /// split; do not unify the alphabets.
    ///
    /// # Errors
    /// [`AuthKitError::SigningFailed`] on a cryptographic or encoding fault,
    /// [`AuthKitError::Cancelled`] if the user dismissed the prompt,
    /// [`AuthKitError::Unreachable`] if the platform dropped the completion
    /// unresolved.
    pub async fn sign(
        &self,
        handle: &KeyHandle,
        payload: &serde_json::Value,
    ) -> Result<String, AuthKitError> {
        let jwk = derive_jwk(&handle.public_key_der, &handle.kid)?;
        let header = AssertionHeader {
            typ: ASSERTION_TYP.to_string(),
            kid: handle.kid.clone(),
            alg: JWK_ALG.to_string(),
            jwk,
        };

        let header_json = serde_json::to_vec(&header).map_err(|e| AuthKitError::serialization(&e))?;
        let payload_json = serde_json::to_vec(payload).map_err(|e| AuthKitError::serialization(&e))?;
        let signing_input = format!(
            "{}.{}",
            STANDARD.encode(header_json),
            STANDARD.encode(payload_json)
        );
        let digest = Sha256::digest(signing_input.as_bytes());

        let (completion, outcome) = SignCompletion::channel();
        self.vault
            .sign_digest(handle.tag.clone(), digest.to_vec(), completion);

        let signature = match outcome.await {
            Ok(SignOutcome::Signature { bytes }) => bytes,
            Ok(SignOutcome::Cancelled) => return Err(AuthKitError::Cancelled),
            Ok(SignOutcome::Failure { code, message }) => {
                return Err(AuthKitError::SigningFailed {
                    message: format!("{message} ({code})"),
                })
            }
            Err(_) => return Err(AuthKitError::Unreachable),
        };

        Ok(format!("{signing_input}.{}", STANDARD.encode(signature)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biometric::{BiometricConstraint, BiometricPolicyGate};
    use crate::key_manager::BiometricKeyManager;
    use crate::platform::memory::{PromptBehavior, SoftwareKeyVault, StubAuthenticator};

    async fn handle_and_vault() -> (KeyHandle, Arc<SoftwareKeyVault>) {
        let vault = Arc::new(SoftwareKeyVault::new());
        let gate = BiometricPolicyGate::new(
            Arc::new(StubAuthenticator::new(PromptBehavior::Approve)),
            true,
        );
        let manager = BiometricKeyManager::new(
            gate,
            Arc::clone(&vault) as Arc<dyn KeyVault>,
            "com.example.app",
        );
        let handle = manager
            .create("kid-1", BiometricConstraint::BiometryAny, "verify")
            .await
            .unwrap();
        (handle, vault)
    }

    #[tokio::test]
    async fn test_sign_produces_three_segments() {
        let (handle, vault) = handle_and_vault().await;
        let signer = AssertionSigner::new(vault);
        let payload = serde_json::json!({ "challenge": "abc" });

        let token = signer.sign(&handle, &payload).await.unwrap();
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);

        let header: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(segments[0]).unwrap()).unwrap();
        assert_eq!(header["typ"], ASSERTION_TYP);
        assert_eq!(header["kid"], "kid-1");
        assert_eq!(header["alg"], "RS256");
        assert_eq!(header["jwk"]["kid"], "kid-1");
    }

    #[tokio::test]
    async fn test_cancelled_signing_prompt_fails_whole_operation() {
        let (handle, vault) = handle_and_vault().await;
        vault.set_behavior(PromptBehavior::Cancel);
        let signer = AssertionSigner::new(vault);

        let err = signer
            .sign(&handle, &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthKitError::Cancelled));
    }
}
