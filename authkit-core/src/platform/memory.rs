//! In-memory implementations of the platform traits.
//!
//! These implementations are NOT secure for production use. They exist so
//! the bridge pipeline can be exercised without an OS: the software vault
//! performs real RSA signing, and the stubs script the interactive prompts.

// Allow certain clippy lints for test-only code
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::Sha256;

use super::{
    AccessPolicy, BiometricAuthenticator, BiometricAvailability, KeyVault, PlatformStatus,
    PromptCompletion, PromptOutcome, SecretItemBackend, SessionCompletion, SessionOutcome,
    SignCompletion, SignOutcome, WebAuthPresenter, WebAuthRequest,
};
use crate::biometric::BiometricConstraint;

/// `errSecDuplicateItem`.
const STATUS_DUPLICATE_ITEM: i64 = -25299;
/// `errSecParam`.
const STATUS_PARAM: i64 = -50;
/// `LAError.biometryNotEnrolled`.
const STATUS_NOT_ENROLLED: i64 = -7;
/// `LAError.authenticationFailed`.
const STATUS_AUTH_FAILED: i64 = -1;

/// Scripted response for interactive prompts raised by the in-memory
/// platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptBehavior {
    /// The user authenticates successfully.
    Approve,
    /// The user dismisses the prompt.
    Cancel,
    /// The policy cannot be evaluated (nothing enrolled).
    Unavailable,
    /// Authentication fails outright.
    Fail,
}

/// In-memory secret-item backend backed by a `HashMap`.
pub struct MemorySecretStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().unwrap().len()
    }

    /// Returns `true` if no items are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().unwrap().is_empty()
    }
}

impl Default for MemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretItemBackend for MemorySecretStore {
    fn update(&self, name: String, value: String) -> Result<(), PlatformStatus> {
        let mut items = self.items.write().unwrap();
        match items.get_mut(&name) {
            Some(existing) => {
                *existing = value;
                Ok(())
            }
            None => Err(PlatformStatus::NotFound),
        }
    }

    fn insert(&self, name: String, value: String) -> Result<(), PlatformStatus> {
        let mut items = self.items.write().unwrap();
        if items.contains_key(&name) {
            return Err(PlatformStatus::Failure {
                code: STATUS_DUPLICATE_ITEM,
                message: "item already exists".to_string(),
            });
        }
        items.insert(name, value);
        Ok(())
    }

    fn fetch(&self, name: String) -> Result<String, PlatformStatus> {
        self.items
            .read()
            .unwrap()
            .get(&name)
            .cloned()
            .ok_or(PlatformStatus::NotFound)
    }

    fn remove(&self, name: String) -> Result<(), PlatformStatus> {
        match self.items.write().unwrap().remove(&name) {
            Some(_) => Ok(()),
            None => Err(PlatformStatus::NotFound),
        }
    }
}

struct StoredKey {
    private: RsaPrivateKey,
    policy: AccessPolicy,
}

/// Software key vault performing real RSA signing in memory.
///
/// Keys are gated the way an OS keystore would gate them: signing with a key
/// whose policy carries a biometric constraint consults the scripted
/// [`PromptBehavior`]; keys stored with
/// [`BiometricConstraint::NoConstraint`] sign without any prompt.
pub struct SoftwareKeyVault {
    keys: RwLock<HashMap<String, StoredKey>>,
    behavior: Mutex<PromptBehavior>,
}

impl SoftwareKeyVault {
    /// Creates an empty vault that approves every prompt.
    #[must_use]
    pub fn new() -> Self {
        Self::with_behavior(PromptBehavior::Approve)
    }

    /// Creates an empty vault with a scripted prompt response.
    #[must_use]
    pub fn with_behavior(behavior: PromptBehavior) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            behavior: Mutex::new(behavior),
        }
    }

    /// Re-scripts the prompt response for subsequent signing calls.
    pub fn set_behavior(&self, behavior: PromptBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Returns `true` if a key is stored under `tag`.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.keys.read().unwrap().contains_key(tag)
    }
}

impl Default for SoftwareKeyVault {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyVault for SoftwareKeyVault {
    fn store_private_key(
        &self,
        tag: String,
        key_der: Vec<u8>,
        policy: AccessPolicy,
    ) -> Result<(), PlatformStatus> {
        let private =
            RsaPrivateKey::from_pkcs1_der(&key_der).map_err(|e| PlatformStatus::Failure {
                code: STATUS_PARAM,
                message: format!("invalid private key encoding: {e}"),
            })?;
        self.keys
            .write()
            .unwrap()
            .insert(tag, StoredKey { private, policy });
        Ok(())
    }

    fn public_key_der(&self, tag: String) -> Result<Vec<u8>, PlatformStatus> {
        let keys = self.keys.read().unwrap();
        let key = keys.get(&tag).ok_or(PlatformStatus::NotFound)?;
        let der = key
            .private
            .to_public_key()
            .to_pkcs1_der()
            .map_err(|e| PlatformStatus::Failure {
                code: STATUS_PARAM,
                message: format!("public key export failed: {e}"),
            })?;
        Ok(der.as_bytes().to_vec())
    }

    fn delete_key(&self, tag: String) -> Result<(), PlatformStatus> {
        match self.keys.write().unwrap().remove(&tag) {
            Some(_) => Ok(()),
            None => Err(PlatformStatus::NotFound),
        }
    }

    fn sign_digest(&self, tag: String, digest: Vec<u8>, completion: Arc<SignCompletion>) {
        let keys = self.keys.read().unwrap();
        let Some(key) = keys.get(&tag) else {
            completion.resolve(SignOutcome::Failure {
                code: STATUS_PARAM,
                message: format!("no key under tag `{tag}`"),
            });
            return;
        };

        // The prompt only fires for keys whose policy demands one.
        let gated = key.policy.constraint != BiometricConstraint::NoConstraint;
        if gated {
            match *self.behavior.lock().unwrap() {
                PromptBehavior::Approve => {}
                PromptBehavior::Cancel => {
                    completion.resolve(SignOutcome::Cancelled);
                    return;
                }
                PromptBehavior::Unavailable => {
                    completion.resolve(SignOutcome::Failure {
                        code: STATUS_NOT_ENROLLED,
                        message: "no biometric enrollment".to_string(),
                    });
                    return;
                }
                PromptBehavior::Fail => {
                    completion.resolve(SignOutcome::Failure {
                        code: STATUS_AUTH_FAILED,
                        message: "authentication failed".to_string(),
                    });
                    return;
                }
            }
        }

        match key.private.sign(Pkcs1v15Sign::new::<Sha256>(), &digest) {
            Ok(bytes) => completion.resolve(SignOutcome::Signature { bytes }),
            Err(e) => completion.resolve(SignOutcome::Failure {
                code: STATUS_PARAM,
                message: format!("signing failed: {e}"),
            }),
        }
    }
}

/// Scripted biometric authenticator.
pub struct StubAuthenticator {
    behavior: Mutex<PromptBehavior>,
}

impl StubAuthenticator {
    /// Creates an authenticator with a scripted prompt response.
    #[must_use]
    pub fn new(behavior: PromptBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
        }
    }

    /// Re-scripts the prompt response.
    pub fn set_behavior(&self, behavior: PromptBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }
}

impl BiometricAuthenticator for StubAuthenticator {
    fn supported(&self) -> bool {
        true
    }

    fn availability(&self) -> BiometricAvailability {
        match *self.behavior.lock().unwrap() {
            PromptBehavior::Unavailable => BiometricAvailability::Unavailable {
                code: STATUS_NOT_ENROLLED,
                message: "no biometric enrollment".to_string(),
            },
            _ => BiometricAvailability::Available,
        }
    }

    fn evaluate(
        &self,
        _constraint: BiometricConstraint,
        _reason: String,
        completion: Arc<PromptCompletion>,
    ) {
        match *self.behavior.lock().unwrap() {
            PromptBehavior::Approve => completion.resolve(PromptOutcome::Granted),
            PromptBehavior::Cancel => completion.resolve(PromptOutcome::Cancelled),
            PromptBehavior::Unavailable => completion.resolve(PromptOutcome::Unavailable {
                code: STATUS_NOT_ENROLLED,
                message: "no biometric enrollment".to_string(),
            }),
            PromptBehavior::Fail => completion.resolve(PromptOutcome::Unavailable {
                code: STATUS_AUTH_FAILED,
                message: "authentication failed".to_string(),
            }),
        }
    }
}

/// Scripted web-authentication presenter.
pub struct StubPresenter {
    outcome: Mutex<SessionOutcome>,
    last_request: Mutex<Option<WebAuthRequest>>,
}

impl StubPresenter {
    /// Creates a presenter that resolves every session with `outcome`.
    #[must_use]
    pub fn new(outcome: SessionOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            last_request: Mutex::new(None),
        }
    }

    /// The most recent request presented, if any.
    #[must_use]
    pub fn last_request(&self) -> Option<WebAuthRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

impl WebAuthPresenter for StubPresenter {
    fn supported(&self) -> bool {
        true
    }

    fn present(&self, request: WebAuthRequest, completion: Arc<SessionCompletion>) {
        *self.last_request.lock().unwrap() = Some(request);
        completion.resolve(self.outcome.lock().unwrap().clone());
    }
}

#[cfg(test)]
mod tests {
    use rsa::pkcs1::EncodeRsaPrivateKey;

    use super::*;

    fn test_policy(constraint: BiometricConstraint) -> AccessPolicy {
        AccessPolicy {
            constraint,
            require_passcode_set: true,
            this_device_only: true,
        }
    }

    #[test]
    fn test_memory_secret_store_semantics() {
        let store = MemorySecretStore::new();
        assert!(store.is_empty());

        assert!(matches!(
            store.update("a".into(), "1".into()),
            Err(PlatformStatus::NotFound)
        ));
        store.insert("a".into(), "1".into()).unwrap();
        assert!(matches!(
            store.insert("a".into(), "2".into()),
            Err(PlatformStatus::Failure { .. })
        ));
        store.update("a".into(), "2".into()).unwrap();
        assert_eq!(store.fetch("a".into()).unwrap(), "2");
        assert_eq!(store.len(), 1);

        store.remove("a".into()).unwrap();
        assert!(matches!(
            store.remove("a".into()),
            Err(PlatformStatus::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_vault_gates_signing_on_policy() {
        let vault = SoftwareKeyVault::with_behavior(PromptBehavior::Cancel);
        let key = RsaPrivateKey::new(&mut rand::rngs::OsRng, 2048).unwrap();
        let der = key.to_pkcs1_der().unwrap();

        vault
            .store_private_key(
                "t1".into(),
                der.as_bytes().to_vec(),
                test_policy(BiometricConstraint::BiometryAny),
            )
            .unwrap();
        vault
            .store_private_key(
                "t2".into(),
                der.as_bytes().to_vec(),
                test_policy(BiometricConstraint::NoConstraint),
            )
            .unwrap();

        let (completion, rx) = SignCompletion::channel();
        vault.sign_digest("t1".into(), vec![0u8; 32], completion);
        assert!(matches!(rx.await, Ok(SignOutcome::Cancelled)));

        // An ungated key signs even while the prompt script says cancel.
        let (completion, rx) = SignCompletion::channel();
        vault.sign_digest("t2".into(), vec![0u8; 32], completion);
        assert!(matches!(rx.await, Ok(SignOutcome::Signature { .. })));
    }

    #[tokio::test]
    async fn test_vault_unknown_tag_fails() {
        let vault = SoftwareKeyVault::new();
        let (completion, rx) = SignCompletion::channel();
        vault.sign_digest("missing".into(), vec![0u8; 32], completion);
        assert!(matches!(rx.await, Ok(SignOutcome::Failure { .. })));
        assert!(matches!(
            vault.delete_key("missing".into()),
            Err(PlatformStatus::NotFound)
        ));
    }
}
