//! Session lifecycle: login, logout, current user, and the observable
//! authenticated/unauthenticated state that view code reacts to.
//!
//! The controller is the only writer of the credential store and of the
//! in-memory session. Other components report an expired session through
//! [`SessionController::expire_session`] instead of touching either.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::credential_store::CredentialStore;
use crate::error::{ClientError, classify_authenticated, classify_login};
use crate::gateway::{AuthRequirement, CURRENT_USER_PATH, LOGIN_PATH, RequestGateway};
use crate::types::{LoginRequest, LoginResponse, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    Authenticating,
    Authenticated,
}

impl SessionPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub user: Option<UserProfile>,
}

impl SessionState {
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self {
            phase: SessionPhase::Unauthenticated,
            user: None,
        }
    }

    #[must_use]
    pub fn authenticated(user: UserProfile) -> Self {
        Self {
            phase: SessionPhase::Authenticated,
            user: Some(user),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::unauthenticated()
    }
}

struct SessionInner {
    gateway: RequestGateway,
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<SessionState>,
    /// Bumped on every logout or expiry. A request that started under an
    /// older epoch may not sign the session back in.
    epoch: AtomicU64,
}

#[derive(Clone)]
pub struct SessionController {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionController {
    #[must_use]
    pub fn new(gateway: RequestGateway, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionState::unauthenticated());
        Self {
            inner: Arc::new(SessionInner {
                gateway,
                store,
                state,
                epoch: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Every phase change is published here, including the downgrade caused
    /// by an expired session anywhere in the client.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Startup routine: if a token survived from an earlier run, try to turn
    /// it back into a session. Failure is silent and leaves the session
    /// empty.
    pub async fn restore(&self) -> SessionState {
        let has_token = match self.inner.store.load() {
            Ok(token) => token.is_some_and(|token| !token.trim().is_empty()),
            Err(error) => {
                tracing::warn!(%error, "credential store unreadable at startup");
                false
            }
        };
        if !has_token {
            return self.state();
        }

        self.transition(SessionState {
            phase: SessionPhase::Authenticating,
            user: None,
        });
        if let Err(error) = self.current_user().await {
            tracing::info!(
                kind = error.kind(),
                %error,
                "stored session could not be restored"
            );
            self.transition(SessionState::unauthenticated());
        }
        self.state()
    }

    /// The new token is validated against `/api/me` before it is persisted,
    /// so a failure anywhere leaves the store exactly as it was.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, ClientError> {
        if username.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "username must not be empty".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(ClientError::InvalidRequest(
                "password must not be empty".to_string(),
            ));
        }

        let previous = self.state();
        self.transition(SessionState {
            phase: SessionPhase::Authenticating,
            user: previous.user.clone(),
        });

        let (token, profile) = match self.exchange_credentials(username, password).await {
            Ok(exchanged) => exchanged,
            Err(error) => {
                tracing::warn!(kind = error.kind(), %error, "login failed");
                self.transition(previous);
                return Err(error);
            }
        };

        if let Err(error) = self.inner.store.save(&token) {
            tracing::warn!(%error, "failed to persist session token");
            self.transition(previous);
            return Err(ClientError::Storage {
                message: error.to_string(),
            });
        }

        tracing::info!(username = %profile.username, "logged in");
        self.transition(SessionState::authenticated(profile.clone()));
        Ok(profile)
    }

    async fn exchange_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(String, UserProfile), ClientError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self
            .inner
            .gateway
            .post_json(LOGIN_PATH, &request, &AuthRequirement::None)
            .await
            .map_err(classify_login)?;

        if response.token.trim().is_empty() {
            return Err(ClientError::Remote {
                status: 200,
                message: "login response did not include a token".to_string(),
            });
        }

        let profile: UserProfile = self
            .inner
            .gateway
            .get_json(
                CURRENT_USER_PATH,
                &AuthRequirement::Explicit(response.token.clone()),
            )
            .await
            .map_err(classify_login)?;

        Ok((response.token, profile))
    }

    /// Fetches the profile for the stored token. A 401/403 clears the
    /// session and the store and surfaces `SessionExpired`. If the session
    /// is cleared while the request is in flight, the profile is still
    /// returned but the session stays signed out.
    pub async fn current_user(&self) -> Result<UserProfile, ClientError> {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let result = self
            .inner
            .gateway
            .get_json::<UserProfile>(CURRENT_USER_PATH, &AuthRequirement::AccessToken)
            .await;

        match result {
            Ok(profile) => {
                if !self.transition_within(epoch, SessionState::authenticated(profile.clone())) {
                    tracing::debug!("session cleared while fetching the current user");
                }
                Ok(profile)
            }
            Err(error) => {
                let error = classify_authenticated(error);
                if error.requires_reauthentication() {
                    self.expire_session();
                }
                Err(error)
            }
        }
    }

    pub fn logout(&self) {
        self.clear_session("logout");
    }

    /// Called by any component whose authenticated request came back
    /// 401/403.
    pub fn expire_session(&self) {
        self.clear_session("session_expired");
    }

    fn clear_session(&self, reason: &'static str) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        if let Err(error) = self.inner.store.clear() {
            tracing::warn!(reason, %error, "failed to clear credential store");
        }
        self.transition(SessionState::unauthenticated());
    }

    fn transition(&self, next: SessionState) {
        let next_phase = next.phase;
        let previous = self.inner.state.send_replace(next);
        log_transition(previous.phase, next_phase);
    }

    /// Publishes `next` only if no logout or expiry happened since `epoch`
    /// was read. The check runs under the channel's write lock, and
    /// `clear_session` bumps the epoch before publishing, so a clear can
    /// never be overwritten.
    fn transition_within(&self, epoch: u64, next: SessionState) -> bool {
        let mut published = false;
        self.inner.state.send_if_modified(|state| {
            if self.inner.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            let previous = std::mem::replace(state, next);
            log_transition(previous.phase, state.phase);
            published = true;
            true
        });
        published
    }
}

fn log_transition(from: SessionPhase, to: SessionPhase) {
    if from != to {
        tracing::info!(from = from.as_str(), to = to.as_str(), "session transition");
    }
}
