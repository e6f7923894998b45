//! Platform abstraction traits for the bridge.
//!
//! All OS-mediated operations sit behind traits the host application
//! implements and hands to [`AuthKitBridge::new`](crate::bridge::AuthKitBridge::new):
//!
//! - [`BiometricAuthenticator`]: interactive biometric re-authentication
//! - [`KeyVault`]: custody of biometric-gated private keys and the signing primitive
//! - [`SecretItemBackend`]: the raw secure-storage item primitive
//! - [`WebAuthPresenter`]: OS browser-based authentication sessions
//!
//! Expected platform implementations:
//!
//! ## iOS (Swift)
//! - `BiometricAuthenticator`: `LAContext.evaluatePolicy`
//! - `KeyVault`: Keychain key items with `SecAccessControl`, `SecKeyCreateSignature`
//! - `SecretItemBackend`: generic-password Keychain items
//! - `WebAuthPresenter`: `ASWebAuthenticationSession`
//!
//! ## Android (Kotlin)
//! - `BiometricAuthenticator`: `BiometricPrompt`
//! - `KeyVault`: Android Keystore with `setUserAuthenticationRequired`
//! - `SecretItemBackend`: `EncryptedSharedPreferences`
//! - `WebAuthPresenter`: Custom Tabs
//!
//! Interactive calls take a completion handle and must resolve it exactly
//! once, from the platform's callback context. The Rust side keeps only the
//! awaiting end alive; the platform owns the handle (and with it the
//! in-flight session) until its completion fires.

pub mod memory;

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::biometric::BiometricConstraint;
use crate::AuthKitError;

/// Raw status reported by an OS secure-storage primitive.
#[derive(Debug, Clone, thiserror::Error, uniffi::Error)]
pub enum PlatformStatus {
    /// The requested item does not exist.
    #[error("item not found")]
    NotFound,
    /// Any other negative status from the OS.
    #[error("platform failure: {message} ({code})")]
    Failure {
        /// Platform status code (e.g. an `OSStatus`).
        code: i64,
        /// Platform status message.
        message: String,
    },
}

/// `errSecItemNotFound`, reported when a raw primitive surfaces
/// [`PlatformStatus::NotFound`] where absence is a genuine fault.
const STATUS_ITEM_NOT_FOUND: i64 = -25300;

impl PlatformStatus {
    pub(crate) fn into_os_failure(self) -> AuthKitError {
        match self {
            Self::NotFound => AuthKitError::OsFailure {
                code: STATUS_ITEM_NOT_FOUND,
                message: "item not found".to_string(),
            },
            Self::Failure { code, message } => AuthKitError::OsFailure { code, message },
        }
    }

    pub(crate) fn into_persistence_failure(self) -> AuthKitError {
        match self {
            Self::NotFound => AuthKitError::PersistenceFailed {
                code: STATUS_ITEM_NOT_FOUND,
                message: "item not found".to_string(),
            },
            Self::Failure { code, message } => {
                AuthKitError::PersistenceFailed { code, message }
            }
        }
    }
}

/// Access-control policy attached to a stored private key.
///
/// The OS enforces the policy when the private key is used for signing; the
/// key manager always requires a device passcode and device-local storage.
#[derive(Debug, Clone, uniffi::Record)]
pub struct AccessPolicy {
    /// Re-authentication constraint gating private-key use.
    pub constraint: BiometricConstraint,
    /// The key is usable only while the device has a passcode set.
    pub require_passcode_set: bool,
    /// The key never leaves this device (no backup/restore transfer).
    pub this_device_only: bool,
}

/// Outcome of an interactive biometric prompt.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum PromptOutcome {
    /// The user authenticated successfully.
    Granted,
    /// The user dismissed the prompt.
    Cancelled,
    /// The policy cannot be evaluated on this device.
    Unavailable {
        /// Platform status code.
        code: i64,
        /// Platform status message.
        message: String,
    },
}

/// Outcome of a platform signing call.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum SignOutcome {
    /// The raw signature bytes.
    Signature {
        /// RSASSA-PKCS1-v1_5 signature over the submitted digest.
        bytes: Vec<u8>,
    },
    /// The user dismissed the re-authentication prompt.
    Cancelled,
    /// The signing primitive failed.
    Failure {
        /// Platform status code.
        code: i64,
        /// Platform status message.
        message: String,
    },
}

/// Outcome of an OS web-authentication session.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum SessionOutcome {
    /// The session ended by redirecting to the callback scheme.
    Redirect {
        /// The full redirect URL.
        url: String,
    },
    /// The user dismissed the session.
    Cancelled,
    /// The session failed.
    Failure {
        /// Platform status code.
        code: i64,
        /// Platform status message.
        message: String,
    },
}

/// Availability of biometric authentication, checked without prompting.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum BiometricAvailability {
    /// Biometric authentication can be evaluated.
    Available,
    /// Biometric authentication cannot be evaluated (no enrollment, no
    /// hardware, lockout).
    Unavailable {
        /// Platform status code.
        code: i64,
        /// Platform status message.
        message: String,
    },
}

/// Parameters for an OS web-authentication session.
#[derive(Debug, Clone, uniffi::Record)]
pub struct WebAuthRequest {
    /// The URL to present.
    pub url: String,
    /// Callback scheme the session should intercept, if any.
    pub callback_scheme: Option<String>,
    /// Prefer an ephemeral browser session (no shared cookies).
    pub prefer_ephemeral: bool,
}

/// One-shot delivery slot shared by the completion handles.
///
/// The sender is consumed by the first delivery; later deliveries are
/// ignored, which gives the exactly-once contract even against misbehaving
/// platform callbacks.
struct CompletionSlot<T> {
    tx: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> CompletionSlot<T> {
    fn channel() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    fn deliver(&self, value: T) {
        let tx = self.tx.lock().ok().and_then(|mut guard| guard.take());
        if let Some(tx) = tx {
            // The receiver may already be gone; nothing left to do then.
            let _ = tx.send(value);
        }
    }
}

/// Continuation for an interactive biometric prompt.
///
/// Resolve exactly once, from the platform's callback context. Only the
/// first call has any effect.
#[derive(uniffi::Object)]
pub struct PromptCompletion {
    slot: CompletionSlot<PromptOutcome>,
}

#[uniffi::export]
impl PromptCompletion {
    /// Delivers the prompt outcome.
    pub fn resolve(&self, outcome: PromptOutcome) {
        self.slot.deliver(outcome);
    }
}

impl PromptCompletion {
    pub(crate) fn channel() -> (Arc<Self>, oneshot::Receiver<PromptOutcome>) {
        let (slot, rx) = CompletionSlot::channel();
        (Arc::new(Self { slot }), rx)
    }
}

/// Continuation for a platform signing call.
#[derive(uniffi::Object)]
pub struct SignCompletion {
    slot: CompletionSlot<SignOutcome>,
}

#[uniffi::export]
impl SignCompletion {
    /// Delivers the signing outcome. Only the first call has any effect.
    pub fn resolve(&self, outcome: SignOutcome) {
        self.slot.deliver(outcome);
    }
}

impl SignCompletion {
    pub(crate) fn channel() -> (Arc<Self>, oneshot::Receiver<SignOutcome>) {
        let (slot, rx) = CompletionSlot::channel();
        (Arc::new(Self { slot }), rx)
    }
}

/// Continuation for an OS web-authentication session.
#[derive(uniffi::Object)]
pub struct SessionCompletion {
    slot: CompletionSlot<SessionOutcome>,
}

#[uniffi::export]
impl SessionCompletion {
    /// Delivers the session outcome. Only the first call has any effect.
    pub fn resolve(&self, outcome: SessionOutcome) {
        self.slot.deliver(outcome);
    }
}

impl SessionCompletion {
    pub(crate) fn channel() -> (Arc<Self>, oneshot::Receiver<SessionOutcome>) {
        let (slot, rx) = CompletionSlot::channel();
        (Arc::new(Self { slot }), rx)
    }
}

/// OS-mediated biometric re-authentication.
#[uniffi::export(with_foreign)]
pub trait BiometricAuthenticator: Send + Sync {
    /// Whether this platform supports biometric authentication at all.
    ///
    /// Consulted once at bridge construction; `false` makes every biometric
    /// operation report `Unsupported`.
    fn supported(&self) -> bool;

    /// Non-interactive enrollment/hardware check.
    fn availability(&self) -> BiometricAvailability;

    /// Raises the interactive prompt, showing `reason` to the user.
    ///
    /// Must resolve `completion` exactly once after the user responds. The
    /// implementation owns any in-flight prompt object until then.
    fn evaluate(
        &self,
        constraint: BiometricConstraint,
        reason: String,
        completion: Arc<PromptCompletion>,
    );
}

/// Custody of biometric-gated private keys in OS secure storage.
///
/// Keys are addressed by an application tag derived from the key identifier.
/// All synchronous methods are blocking calls into the OS primitive and must
/// not run on a context where blocking is disallowed.
#[uniffi::export(with_foreign)]
pub trait KeyVault: Send + Sync {
    /// Persists a private key (PKCS#1 DER) under `tag` with `policy`.
    ///
    /// # Errors
    /// Any non-success storage status.
    fn store_private_key(
        &self,
        tag: String,
        key_der: Vec<u8>,
        policy: AccessPolicy,
    ) -> Result<(), PlatformStatus>;

    /// Exports the public half of the key stored under `tag` as PKCS#1
    /// `RSAPublicKey` DER.
    ///
    /// # Errors
    /// [`PlatformStatus::NotFound`] if no key is stored under `tag`.
    fn public_key_der(&self, tag: String) -> Result<Vec<u8>, PlatformStatus>;

    /// Removes the key stored under `tag`.
    ///
    /// # Errors
    /// [`PlatformStatus::NotFound`] if absent; callers treat that as success.
    fn delete_key(&self, tag: String) -> Result<(), PlatformStatus>;

    /// Signs a SHA-256 digest with the private key stored under `tag`
    /// (RSASSA-PKCS1-v1_5).
    ///
    /// This is the point where the key's access-control policy triggers an
    /// interactive re-authentication prompt. Must resolve `completion`
    /// exactly once.
    fn sign_digest(&self, tag: String, digest: Vec<u8>, completion: Arc<SignCompletion>);
}

/// The raw secure-storage item primitive underneath the secret store.
///
/// Semantics mirror the OS keychain: `update` and `fetch` report
/// [`PlatformStatus::NotFound`] for absent items; `insert` fails on
/// duplicates. Upsert and idempotent-delete behavior is layered on top by
/// [`SecureItemStore`](crate::secret_store::SecureItemStore).
#[uniffi::export(with_foreign)]
pub trait SecretItemBackend: Send + Sync {
    /// Replaces the value of an existing item.
    ///
    /// # Errors
    /// [`PlatformStatus::NotFound`] if the item does not exist.
    fn update(&self, name: String, value: String) -> Result<(), PlatformStatus>;

    /// Adds a new item.
    ///
    /// # Errors
    /// A failure status if the item already exists.
    fn insert(&self, name: String, value: String) -> Result<(), PlatformStatus>;

    /// Reads an item's value.
    ///
    /// # Errors
    /// [`PlatformStatus::NotFound`] if the item does not exist.
    fn fetch(&self, name: String) -> Result<String, PlatformStatus>;

    /// Removes an item.
    ///
    /// # Errors
    /// [`PlatformStatus::NotFound`] if the item does not exist.
    fn remove(&self, name: String) -> Result<(), PlatformStatus>;
}

/// OS browser-based authentication session presenter.
#[uniffi::export(with_foreign)]
pub trait WebAuthPresenter: Send + Sync {
    /// Whether this platform can present web-authentication sessions.
    fn supported(&self) -> bool;

    /// Presents the session and resolves `completion` exactly once with the
    /// redirect, cancellation, or failure. The implementation owns the
    /// session object until its completion fires.
    fn present(&self, request: WebAuthRequest, completion: Arc<SessionCompletion>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completion_resolves_exactly_once() {
        let (completion, rx) = PromptCompletion::channel();
        completion.resolve(PromptOutcome::Granted);
        completion.resolve(PromptOutcome::Cancelled);
        assert!(matches!(rx.await, Ok(PromptOutcome::Granted)));
    }

    #[tokio::test]
    async fn test_dropped_completion_closes_channel() {
        let (completion, rx) = SignCompletion::channel();
        drop(completion);
        assert!(rx.await.is_err());
    }
}
