//! End-to-end tests of the bridge pipeline over the in-memory platform.

use std::sync::Arc;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256};

use authkit_core::biometric::BiometricConstraint;
use authkit_core::bridge::AuthKitBridge;
use authkit_core::platform::memory::{
    MemorySecretStore, PromptBehavior, SoftwareKeyVault, StubAuthenticator, StubPresenter,
};
use authkit_core::platform::{BiometricAuthenticator, KeyVault, SessionOutcome};
use authkit_core::{AuthKitError, BridgeConfig};

struct Fixture {
    bridge: Arc<AuthKitBridge>,
    authenticator: Arc<StubAuthenticator>,
    vault: Arc<SoftwareKeyVault>,
}

fn fixture(prompt: PromptBehavior, session: SessionOutcome) -> Fixture {
    let authenticator = Arc::new(StubAuthenticator::new(prompt));
    let vault = Arc::new(SoftwareKeyVault::with_behavior(prompt));
    let bridge = AuthKitBridge::new(
        BridgeConfig::default(),
        Arc::clone(&authenticator) as Arc<dyn BiometricAuthenticator>,
        Arc::clone(&vault) as Arc<dyn KeyVault>,
        Arc::new(MemorySecretStore::new()),
        Arc::new(StubPresenter::new(session)),
    );
    Fixture {
        bridge,
        authenticator,
        vault,
    }
}

fn approve_all() -> Fixture {
    fixture(
        PromptBehavior::Approve,
        SessionOutcome::Redirect {
            url: "app://callback?code=1".to_string(),
        },
    )
}

/// RS256-verifies a produced assertion against the `(n, e)` embedded in its
/// own header JWK.
fn verify_assertion(token: &str) {
    let segments: Vec<&str> = token.split('.').collect();
    assert_eq!(segments.len(), 3);

    let header: serde_json::Value =
        serde_json::from_slice(&STANDARD.decode(segments[0]).unwrap()).unwrap();
    let n = URL_SAFE_NO_PAD
        .decode(header["jwk"]["n"].as_str().unwrap())
        .unwrap();
    let e = URL_SAFE_NO_PAD
        .decode(header["jwk"]["e"].as_str().unwrap())
        .unwrap();
    let public_key =
        RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e)).unwrap();

    let signing_input = format!("{}.{}", segments[0], segments[1]);
    let digest = Sha256::digest(signing_input.as_bytes());
    let signature = STANDARD.decode(segments[2]).unwrap();
    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &signature)
        .expect("assertion must verify against its own JWK");
}

#[tokio::test]
async fn test_create_assertion_produces_verifiable_jwt() {
    let f = approve_all();
    let token = f
        .bridge
        .create_assertion(
            "kid-1".to_string(),
            r#"{"challenge":"abc","action":"login"}"#.to_string(),
            BiometricConstraint::BiometryAny,
            "verify it's you".to_string(),
        )
        .await
        .unwrap();

    let segments: Vec<&str> = token.split('.').collect();
    let header: serde_json::Value =
        serde_json::from_slice(&STANDARD.decode(segments[0]).unwrap()).unwrap();
    assert_eq!(header["typ"], "vnd.authgear.biometric-request");
    assert_eq!(header["kid"], "kid-1");
    assert_eq!(header["alg"], "RS256");
    assert_eq!(header["jwk"]["kid"], "kid-1");
    assert_eq!(header["jwk"]["kty"], "RSA");
    assert_eq!(header["jwk"]["alg"], "RS256");
    assert!(!header["jwk"]["n"].as_str().unwrap().contains('='));
    assert!(!header["jwk"]["e"].as_str().unwrap().contains('='));

    verify_assertion(&token);
}

#[tokio::test]
async fn test_sign_assertion_reuses_created_key() {
    let f = approve_all();
    f.bridge
        .create_assertion(
            "kid-1".to_string(),
            "{}".to_string(),
            BiometricConstraint::BiometryCurrentSet,
            "verify".to_string(),
        )
        .await
        .unwrap();

    let token = f
        .bridge
        .sign_assertion("kid-1".to_string(), r#"{"challenge":"xyz"}"#.to_string())
        .await
        .unwrap();
    verify_assertion(&token);
}

#[tokio::test]
async fn test_sign_assertion_without_key_is_not_found() {
    let f = approve_all();
    let err = f
        .bridge
        .sign_assertion("never-created".to_string(), "{}".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthKitError::NotFound { .. }));
}

#[tokio::test]
async fn test_remove_key_is_idempotent() {
    let f = approve_all();
    f.bridge
        .create_assertion(
            "kid-1".to_string(),
            "{}".to_string(),
            BiometricConstraint::UserPresence,
            "verify".to_string(),
        )
        .await
        .unwrap();

    f.bridge.remove_key("kid-1".to_string()).unwrap();
    f.bridge.remove_key("kid-1".to_string()).unwrap();

    let err = f
        .bridge
        .sign_assertion("kid-1".to_string(), "{}".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthKitError::NotFound { .. }));
}

#[tokio::test]
async fn test_cancelled_prompt_leaves_no_partial_key() {
    let f = fixture(PromptBehavior::Cancel, SessionOutcome::Cancelled);
    let err = f
        .bridge
        .create_assertion(
            "kid-1".to_string(),
            "{}".to_string(),
            BiometricConstraint::BiometryAny,
            "verify".to_string(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthKitError::Cancelled));
    assert!(!f.vault.contains("com.authgear.keys.biometric.kid-1"));

    // Even with the prompt now approving, there is no key to sign with.
    f.authenticator.set_behavior(PromptBehavior::Approve);
    f.vault.set_behavior(PromptBehavior::Approve);
    let err = f
        .bridge
        .sign_assertion("kid-1".to_string(), "{}".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthKitError::NotFound { .. }));
}

#[tokio::test]
async fn test_payload_transport_roundtrip_is_byte_identical() {
    let f = approve_all();
    let payload = r#"{"b":2,"a":{"nested":[1,2,3]},"c":"text"}"#;
    let token = f
        .bridge
        .create_assertion(
            "kid-1".to_string(),
            payload.to_string(),
            BiometricConstraint::BiometryAny,
            "verify".to_string(),
        )
        .await
        .unwrap();

    let segments: Vec<&str> = token.split('.').collect();
    let decoded = STANDARD.decode(segments[1]).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
    let reserialized = serde_json::to_vec(&value).unwrap();
    assert_eq!(STANDARD.encode(reserialized), segments[1]);
}

#[tokio::test]
async fn test_secret_store_contract() {
    let f = approve_all();
    f.bridge
        .store_secret("k".to_string(), "v".to_string())
        .unwrap();
    assert_eq!(
        f.bridge.fetch_secret("k".to_string()).unwrap(),
        Some("v".to_string())
    );

    f.bridge
        .store_secret("k".to_string(), "v2".to_string())
        .unwrap();
    assert_eq!(
        f.bridge.fetch_secret("k".to_string()).unwrap(),
        Some("v2".to_string())
    );

    f.bridge.delete_secret("k".to_string()).unwrap();
    assert_eq!(f.bridge.fetch_secret("k".to_string()).unwrap(), None);
    f.bridge.delete_secret("k".to_string()).unwrap();
}

#[tokio::test]
async fn test_web_auth_redirect_and_capabilities() {
    let f = approve_all();
    assert!(f.bridge.capabilities().biometrics_supported);
    assert!(f.bridge.capabilities().web_auth_supported);
    assert!(f.bridge.is_biometric_supported().unwrap());

    let url = f
        .bridge
        .authenticate(
            "https://example.com/authorize".to_string(),
            "app://callback".to_string(),
            true,
        )
        .await
        .unwrap();
    assert_eq!(url, "app://callback?code=1");
}

#[tokio::test]
async fn test_web_auth_cancellation() {
    let f = fixture(PromptBehavior::Approve, SessionOutcome::Cancelled);
    let err = f
        .bridge
        .authenticate(
            "https://example.com/authorize".to_string(),
            "app://callback".to_string(),
            false,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthKitError::Cancelled));

    // openURL treats the user closing the browser as success.
    f.bridge
        .open_url("https://example.com/settings".to_string())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unenrolled_biometry_is_policy_unavailable() {
    let f = fixture(PromptBehavior::Unavailable, SessionOutcome::Cancelled);
    assert!(matches!(
        f.bridge.is_biometric_supported().unwrap_err(),
        AuthKitError::PolicyUnavailable { .. }
    ));

    let err = f
        .bridge
        .create_assertion(
            "kid-1".to_string(),
            "{}".to_string(),
            BiometricConstraint::BiometryAny,
            "verify".to_string(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthKitError::PolicyUnavailable { .. }));
}

#[tokio::test]
async fn test_generate_uuid_is_unique() {
    let f = approve_all();
    let a = f.bridge.generate_uuid();
    let b = f.bridge.generate_uuid();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}
