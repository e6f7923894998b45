//! OS-mediated web-authentication sessions.

use std::sync::Arc;

use crate::platform::{SessionCompletion, SessionOutcome, WebAuthPresenter, WebAuthRequest};
use crate::AuthKitError;

/// Runs interactive browser sessions through the platform presenter.
///
/// The presenter owns the in-flight session object until its completion
/// fires; this side only awaits the single delivery.
pub struct WebAuthSession {
    presenter: Arc<dyn WebAuthPresenter>,
    supported: bool,
}

impl WebAuthSession {
    /// Creates a session runner. `supported` is the capability flag detected
    /// at bridge construction.
    #[must_use]
    pub const fn new(presenter: Arc<dyn WebAuthPresenter>, supported: bool) -> Self {
        Self {
            presenter,
            supported,
        }
    }

    /// Presents `url` and awaits the redirect to `redirect_uri`'s scheme.
    ///
    /// # Errors
    /// [`AuthKitError::Unsupported`] without the capability,
    /// [`AuthKitError::InvalidInput`] for a redirect URI without a scheme,
    /// [`AuthKitError::Cancelled`] if the user dismissed the session,
    /// [`AuthKitError::OsFailure`] on a session fault.
    pub async fn authenticate(
        &self,
        url: &str,
        redirect_uri: &str,
        prefer_ephemeral: bool,
    ) -> Result<String, AuthKitError> {
        if !self.supported {
            return Err(AuthKitError::Unsupported);
        }
        let scheme = redirect_uri
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .filter(|scheme| !scheme.is_empty())
            .ok_or_else(|| AuthKitError::InvalidInput {
                parameter: "redirect_uri".to_string(),
                reason: "missing URL scheme".to_string(),
            })?;

        let request = WebAuthRequest {
            url: url.to_string(),
            callback_scheme: Some(scheme.to_string()),
            prefer_ephemeral,
        };
        match self.present(request).await? {
            SessionOutcome::Redirect { url } => Ok(url),
            SessionOutcome::Cancelled => Err(AuthKitError::Cancelled),
            SessionOutcome::Failure { code, message } => {
                Err(AuthKitError::OsFailure { code, message })
            }
        }
    }

    /// Opens `url` in an ephemeral session with no callback interception;
    /// the session ends when the user closes it, which is success here.
    ///
    /// # Errors
    /// [`AuthKitError::Unsupported`] without the capability,
    /// [`AuthKitError::OsFailure`] on a session fault,
    /// [`AuthKitError::Unreachable`] if the session reports a redirect no
    /// callback scheme could have produced.
    pub async fn open_url(&self, url: &str) -> Result<(), AuthKitError> {
        if !self.supported {
            return Err(AuthKitError::Unsupported);
        }
        let request = WebAuthRequest {
            url: url.to_string(),
            callback_scheme: None,
            prefer_ephemeral: true,
        };
        match self.present(request).await? {
            SessionOutcome::Cancelled => Ok(()),
            SessionOutcome::Failure { code, message } => {
                Err(AuthKitError::OsFailure { code, message })
            }
            SessionOutcome::Redirect { .. } => Err(AuthKitError::Unreachable),
        }
    }

    async fn present(&self, request: WebAuthRequest) -> Result<SessionOutcome, AuthKitError> {
        let (completion, outcome) = SessionCompletion::channel();
        self.presenter.present(request, completion);
        outcome.await.map_err(|_| AuthKitError::Unreachable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::StubPresenter;

    fn session(outcome: SessionOutcome) -> (WebAuthSession, Arc<StubPresenter>) {
        let presenter = Arc::new(StubPresenter::new(outcome));
        (
            WebAuthSession::new(Arc::clone(&presenter) as Arc<dyn WebAuthPresenter>, true),
            presenter,
        )
    }

    #[tokio::test]
    async fn test_authenticate_returns_redirect() {
        let (session, presenter) = session(SessionOutcome::Redirect {
            url: "app://callback?code=1".to_string(),
        });
        let url = session
            .authenticate("https://example.com/authorize", "app://callback", false)
            .await
            .unwrap();
        assert_eq!(url, "app://callback?code=1");

        let request = presenter.last_request().unwrap();
        assert_eq!(request.callback_scheme.as_deref(), Some("app"));
        assert!(!request.prefer_ephemeral);
    }

    #[tokio::test]
    async fn test_authenticate_requires_scheme() {
        let (session, _) = session(SessionOutcome::Cancelled);
        let err = session
            .authenticate("https://example.com", "no-scheme-here", false)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthKitError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_open_url_cancellation_is_success() {
        let (session, presenter) = session(SessionOutcome::Cancelled);
        session.open_url("https://example.com/settings").await.unwrap();

        let request = presenter.last_request().unwrap();
        assert!(request.callback_scheme.is_none());
        assert!(request.prefer_ephemeral);
    }
}
