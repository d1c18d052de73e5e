use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, broadcast};

use super::scheduler::RefreshScheduler;
use crate::constants::DEFAULT_REFRESH_LEAD_SECS;
use crate::error::{AuthError, AuthResult};
use crate::gateway::RequestGateway;
use crate::models::session::{
    AuthDataResponse, LoginRequest, LogoutRequest, LogoutResponse, RefreshRequest,
    RefreshResponse, Session, UserProfile,
};
use crate::storage::CredentialStore;
use crate::token::introspection;

/// Signal emitted when the session ends outside an explicit logout,
/// for the UI layer to react to.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Ended { reason: String },
}

/// State shared between the controller and its refresh scheduler.
#[derive(Debug)]
pub(crate) struct SessionInner {
    gateway: Arc<RequestGateway>,
    store: Arc<CredentialStore>,
    refresh_lead_secs: i64,
    logged_in: AtomicBool,
    // Serializes the credential writes of login, refresh and logout.
    // Refresh takes it with try_lock, which is also what makes
    // concurrent refreshes single-flight.
    session_lock: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionInner {
    pub(crate) fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    pub(crate) fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub(crate) fn refresh_lead_secs(&self) -> i64 {
        self.refresh_lead_secs
    }

    /// One refresh attempt. Returns `Ok(false)` when coalesced behind
    /// an attempt already in flight, or when the session ended while
    /// the call was out and the result was discarded.
    pub(crate) async fn refresh_once(&self) -> AuthResult<bool> {
        let Ok(_guard) = self.session_lock.try_lock() else {
            debug!("Refresh already in flight, coalescing");
            return Ok(false);
        };

        let refresh_token = self
            .store
            .refresh_token()
            .await?
            .ok_or_else(|| AuthError::Validation("No refresh credential stored".to_string()))?;

        let response: RefreshResponse = self
            .gateway
            .post_json("/auth/refresh", &RefreshRequest { token: refresh_token })
            .await?;

        if !self.is_logged_in() {
            debug!("Session ended during refresh, discarding result");
            return Ok(false);
        }

        self.store.set_access_token(&response.token).await?;
        self.store.set_refresh_token(&response.token).await?;
        debug!("Access token refreshed");
        Ok(true)
    }

    pub(crate) async fn end_session(&self, reason: &str) {
        self.logged_in.store(false, Ordering::SeqCst);
        if let Err(e) = self.store.clear_all().await {
            warn!("Failed to clear credential store on session end: {}", e);
        }
        let _ = self.events.send(SessionEvent::Ended {
            reason: reason.to_string(),
        });
    }
}

/// Orchestrates login, logout, session derivation and refresh.
/// Constructed with its collaborators so tests and multi-account
/// setups can supply their own.
#[derive(Debug)]
pub struct SessionController {
    inner: Arc<SessionInner>,
    scheduler: Arc<RefreshScheduler>,
}

impl SessionController {
    pub fn new(gateway: Arc<RequestGateway>, store: Arc<CredentialStore>) -> Self {
        Self::with_refresh_lead(gateway, store, DEFAULT_REFRESH_LEAD_SECS)
    }

    pub fn with_refresh_lead(
        gateway: Arc<RequestGateway>,
        store: Arc<CredentialStore>,
        refresh_lead_secs: i64,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(SessionInner {
                gateway,
                store,
                refresh_lead_secs,
                logged_in: AtomicBool::new(false),
                session_lock: Mutex::new(()),
                events,
            }),
            scheduler: Arc::new(RefreshScheduler::new()),
        }
    }

    /// Validates the credentials locally, exchanges them for a token,
    /// persists the session and arms the refresh scheduler. Nothing is
    /// persisted when the exchange fails.
    pub async fn login(&self, identifier: &str, secret: &str) -> AuthResult<UserProfile> {
        if identifier.trim().is_empty() || secret.trim().is_empty() {
            return Err(AuthError::Validation(
                "Identifier and secret are required".to_string(),
            ));
        }

        let request = LoginRequest {
            identifier: identifier.to_string(),
            secret: secret.to_string(),
        };
        let auth: AuthDataResponse = self.inner.gateway.post_json("/auth/login", &request).await?;

        if let Err(e) = self.persist_login(&auth).await {
            // Leave no partial session behind.
            let _ = self.inner.store.clear_all().await;
            return Err(e);
        }

        self.scheduler.arm(&self.inner);
        info!("Login succeeded for {}", auth.user.account_id);
        Ok(auth.user)
    }

    async fn persist_login(&self, auth: &AuthDataResponse) -> AuthResult<()> {
        let _guard = self.inner.session_lock.lock().await;
        self.inner.store.set_access_token(&auth.token).await?;
        // Without a dedicated refresh token the access token itself is
        // the refresh credential (sliding expiration).
        let refresh_credential = auth
            .refresh_token
            .clone()
            .unwrap_or_else(|| auth.token.clone());
        self.inner.store.set_refresh_token(&refresh_credential).await?;
        self.inner.store.set_user_profile(&auth.user).await?;
        self.inner.logged_in.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Ends the session. Local teardown is unconditional: the remote
    /// call is attempted, its failure logged and swallowed, and the
    /// store cleared either way. Never fails.
    pub async fn logout(&self) {
        self.scheduler.cancel();
        // Flipped before taking the lock so a refresh already in
        // flight discards its result instead of re-persisting.
        self.inner.logged_in.store(false, Ordering::SeqCst);
        let _guard = self.inner.session_lock.lock().await;

        if let Ok(Some(token)) = self.inner.store.access_token().await {
            let result = self
                .inner
                .gateway
                .post_json::<_, LogoutResponse>("/auth/logout", &LogoutRequest { token })
                .await;
            if let Err(e) = result {
                warn!("Remote logout failed, clearing local session anyway: {}", e);
            }
        }

        if let Err(e) = self.inner.store.clear_all().await {
            warn!("Failed to clear credential store on logout: {}", e);
        }
        info!("Session ended");
    }

    /// Derives the current session from the store alone; no network.
    /// A malformed stored token or profile yields an anonymous session
    /// and clears the stored credentials. Unexpected errors also yield
    /// an anonymous session.
    pub async fn current_session(&self) -> Session {
        match self.derive_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!("Session derivation failed: {}", e);
                Session::anonymous()
            }
        }
    }

    async fn derive_session(&self) -> AuthResult<Session> {
        let token = self.inner.store.access_token().await?;
        let user = match self.inner.store.user_profile().await {
            Ok(user) => user,
            Err(e) => {
                warn!("Stored profile unreadable ({}), clearing credentials", e);
                self.inner.store.clear_all().await?;
                return Ok(Session::anonymous());
            }
        };

        match (token, user) {
            (Some(token), Some(user)) => {
                if !introspection::is_well_formed(&token) {
                    warn!("Stored token is malformed, clearing credentials");
                    self.inner.store.clear_all().await?;
                    return Ok(Session::anonymous());
                }
                Ok(Session {
                    expires_at: introspection::decode_exp(&token),
                    refresh_token: self.inner.store.refresh_token().await?,
                    access_token: Some(token),
                    user: Some(user),
                    last_activity: Some(Utc::now()),
                })
            }
            (None, None) => Ok(Session::anonymous()),
            // Half-present credentials cannot authenticate; heal them
            // away so the next derivation starts clean.
            _ => {
                self.inner.store.clear_all().await?;
                Ok(Session::anonymous())
            }
        }
    }

    /// Single-flight refresh. On success the scheduler is re-armed;
    /// on failure the error surfaces and the scheduler (when it is the
    /// caller) performs the full teardown.
    pub async fn refresh(&self) -> AuthResult<()> {
        self.inner.refresh_once().await?;
        if self.inner.is_logged_in() {
            self.scheduler.arm(&self.inner);
        }
        Ok(())
    }

    /// Fetches the authoritative profile from the server and updates
    /// the cached copy. Session derivation itself never goes to the
    /// network; this is for explicit profile screens.
    pub async fn remote_profile(&self) -> AuthResult<UserProfile> {
        let token = self
            .inner
            .store
            .access_token()
            .await?
            .ok_or_else(|| AuthError::AuthenticationFailed("Not logged in".to_string()))?;
        let profile: UserProfile = self
            .inner
            .gateway
            .get_json("/auth/user", Some(token.as_str()))
            .await?;
        self.inner.store.set_user_profile(&profile).await?;
        Ok(profile)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn is_refresh_armed(&self) -> bool {
        self.scheduler.is_armed()
    }

    /// Tears down the in-memory session without touching durable
    /// credentials; the session resumes from the store on the next
    /// construction. `logout` is the credential-clearing path.
    pub async fn destroy(&self) {
        self.scheduler.cancel();
        self.inner.logged_in.store(false, Ordering::SeqCst);
    }
}
