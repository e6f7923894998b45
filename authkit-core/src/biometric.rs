//! Biometric constraints and the interactive policy gate.

use std::sync::Arc;

use strum::EnumString;

use crate::platform::{BiometricAuthenticator, BiometricAvailability, PromptCompletion, PromptOutcome};
use crate::AuthKitError;

/// Re-authentication constraint for a biometric key.
///
/// The set is exhaustive; parsing an unrecognized symbolic name is an
/// explicit error rather than a silent fallback to `NoConstraint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum BiometricConstraint {
    /// Any enrolled biometry may authenticate.
    BiometryAny,
    /// Only the biometry set enrolled at key-creation time may authenticate.
    BiometryCurrentSet,
    /// Device-owner presence (biometry or passcode).
    UserPresence,
    /// No re-authentication constraint. Wire name: `none`.
    #[strum(serialize = "none")]
    NoConstraint,
}

impl BiometricConstraint {
    /// Parses a symbolic constraint name (`biometryAny`, `biometryCurrentSet`,
    /// `userPresence`, `none`).
    ///
    /// # Errors
    /// [`AuthKitError::InvalidInput`] for any other name.
    pub fn parse(value: &str) -> Result<Self, AuthKitError> {
        value.parse::<Self>().map_err(|_| AuthKitError::InvalidInput {
            parameter: "constraint".to_string(),
            reason: format!("unrecognized constraint `{value}`"),
        })
    }
}

/// Parses a symbolic constraint name from the host application.
///
/// Hosts that carry constraints as configuration strings (`biometryAny`,
/// `biometryCurrentSet`, `userPresence`, `none`) resolve them through this
/// call before invoking the bridge.
///
/// # Errors
/// [`AuthKitError::InvalidInput`] for any other name.
#[uniffi::export]
#[allow(clippy::needless_pass_by_value)]
pub fn parse_biometric_constraint(name: String) -> Result<BiometricConstraint, AuthKitError> {
    BiometricConstraint::parse(&name)
}

/// Maps a constraint to a native biometric requirement and prompts the user.
///
/// The gate suspends the caller until the user responds; the prompt object
/// stays alive on the platform side until its completion fires.
#[derive(Clone)]
pub struct BiometricPolicyGate {
    authenticator: Arc<dyn BiometricAuthenticator>,
    supported: bool,
}

impl BiometricPolicyGate {
    /// Creates a gate over the platform authenticator. `supported` is the
    /// capability flag detected at bridge construction.
    #[must_use]
    pub const fn new(authenticator: Arc<dyn BiometricAuthenticator>, supported: bool) -> Self {
        Self {
            authenticator,
            supported,
        }
    }

    /// Non-interactive pre-check.
    ///
    /// # Errors
    /// [`AuthKitError::Unsupported`] if the platform has no biometric
    /// capability; [`AuthKitError::PolicyUnavailable`] if biometry exists but
    /// cannot currently be evaluated (e.g. nothing enrolled).
    pub fn is_supported(&self) -> Result<bool, AuthKitError> {
        if !self.supported {
            return Err(AuthKitError::Unsupported);
        }
        match self.authenticator.availability() {
            BiometricAvailability::Available => Ok(true),
            BiometricAvailability::Unavailable { code, message } => {
                Err(AuthKitError::PolicyUnavailable { code, message })
            }
        }
    }

    /// Prompts the user, showing `reason`, and resolves once they respond.
    ///
    /// # Errors
    /// [`AuthKitError::Cancelled`] if the user dismissed the prompt,
    /// [`AuthKitError::PolicyUnavailable`] if the policy cannot be evaluated,
    /// [`AuthKitError::Unsupported`] without biometric capability,
    /// [`AuthKitError::Unreachable`] if the platform dropped the completion
    /// without resolving it.
    pub async fn evaluate(
        &self,
        constraint: BiometricConstraint,
        reason: &str,
    ) -> Result<(), AuthKitError> {
        if !self.supported {
            return Err(AuthKitError::Unsupported);
        }
        let (completion, outcome) = PromptCompletion::channel();
        self.authenticator
            .evaluate(constraint, reason.to_string(), completion);
        match outcome.await {
            Ok(PromptOutcome::Granted) => Ok(()),
            Ok(PromptOutcome::Cancelled) => Err(AuthKitError::Cancelled),
            Ok(PromptOutcome::Unavailable { code, message }) => {
                Err(AuthKitError::PolicyUnavailable { code, message })
            }
            Err(_) => Err(AuthKitError::Unreachable),
        }
    }
}
