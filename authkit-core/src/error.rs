use thiserror::Error;

/// Error outputs from `AuthKit`.
///
/// Every failure crossing the bridge carries a symbolic code (the variant),
/// a human-readable message (`Display`) and structured details (the variant
/// fields). Nothing fails silently.
#[derive(Debug, Clone, Error, uniffi::Error)]
pub enum AuthKitError {
    /// The user dismissed an interactive prompt. Not a fault.
    #[error("the user cancelled the operation")]
    Cancelled,
    /// The capability is absent on this platform.
    #[error("this operation is not supported on this platform")]
    Unsupported,
    /// Biometric authentication cannot be evaluated (no enrollment or no hardware).
    #[error("biometric authentication is unavailable: {message} ({code})")]
    PolicyUnavailable {
        /// Platform status code.
        code: i64,
        /// Platform status message.
        message: String,
    },
    /// No key is persisted under the given key identifier.
    #[error("no biometric key found for `{kid}`")]
    NotFound {
        /// The key identifier that was looked up.
        kid: String,
    },
    /// Generating a fresh key pair failed.
    #[error("key generation failed: {message}")]
    GenerationFailed {
        /// Underlying error message.
        message: String,
    },
    /// Storing a generated key failed. No partial key state remains.
    #[error("key persistence failed: {message} ({code})")]
    PersistenceFailed {
        /// Platform status code.
        code: i64,
        /// Platform status message.
        message: String,
    },
    /// A cryptographic or encoding step of assertion signing failed.
    #[error("signing failed: {message}")]
    SigningFailed {
        /// Underlying error message.
        message: String,
    },
    /// A generic secure-storage fault.
    #[error("secure storage failure: {message} ({code})")]
    OsFailure {
        /// Platform status code.
        code: i64,
        /// Platform status message.
        message: String,
    },
    /// The presented input is not valid for the requested operation.
    #[error("invalid input `{parameter}`: {reason}")]
    InvalidInput {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of the issue.
        reason: String,
    },
    /// Unexpected error serializing information.
    #[error("serialization error: {message}")]
    Serialization {
        /// Underlying error message.
        message: String,
    },
    /// An invariant was violated. Surfaced rather than swallowed.
    #[error("unreachable state")]
    Unreachable,
}

impl AuthKitError {
    /// The stable symbolic code for this error, as surfaced to callers.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::Unsupported => "UNSUPPORTED",
            Self::PolicyUnavailable { .. } => "POLICY_UNAVAILABLE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::GenerationFailed { .. } => "GENERATION_FAILED",
            Self::PersistenceFailed { .. } => "PERSISTENCE_FAILED",
            Self::SigningFailed { .. } => "SIGNING_FAILED",
            Self::OsFailure { .. } => "OS_FAILURE",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::Serialization { .. } => "SERIALIZATION_ERROR",
            Self::Unreachable => "UNREACHABLE",
        }
    }

    /// Wraps a JSON error into [`AuthKitError::Serialization`].
    #[must_use]
    pub fn serialization(err: &serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_details() {
        let err = AuthKitError::OsFailure {
            code: -25293,
            message: "authentication failed".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "secure storage failure: authentication failed (-25293)"
        );
        assert_eq!(err.code(), "OS_FAILURE");

        let err = AuthKitError::NotFound {
            kid: "kid-1".to_string(),
        };
        assert!(format!("{err}").contains("kid-1"));
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
