//! Session guard with single-flight token refresh.

use crate::auth_fsm::{AuthMachine, AuthMachineInput, AuthState, AuthStateChangedPayload};
use crate::{AuthError, AuthResult, Session, SessionPolicy};
use chrono::Utc;
use notebook_storage::StateVault;
use parking_lot::Mutex;
use remote_authority::{Credentials, RemoteAuthority, RemoteError, UserIdentity};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Callback type for auth state change notifications.
pub type AuthStateCallback = Box<dyn Fn(AuthStateChangedPayload) + Send + Sync>;

/// Invoked whenever cached entity content must be discarded: before a new
/// identity is installed, and on forced sign-out.
pub type ResetHook = Box<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum AuthFlow {
    SignIn,
    SignUp,
}

/// Owner of the credential pair and the remote client's bearer token.
pub struct SessionGuard {
    remote: Arc<dyn RemoteAuthority>,
    vault: StateVault,
    policy: SessionPolicy,
    session: Mutex<Session>,
    fsm: Mutex<AuthMachine>,
    /// Serializes refreshes so concurrent callers share one round-trip.
    refresh_lock: tokio::sync::Mutex<()>,
    reset_hook: Mutex<Option<ResetHook>>,
    state_callback: Mutex<Option<AuthStateCallback>>,
}

impl SessionGuard {
    /// Create a guard, restoring any persisted session.
    ///
    /// A restored authenticated session re-installs its access token right
    /// away; whether it is still fresh is decided by the next `authorize()`.
    pub fn new(remote: Arc<dyn RemoteAuthority>, vault: StateVault, policy: SessionPolicy) -> Self {
        let restored = match vault.load_session::<Session>() {
            Ok(session) => session.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted session");
                Session::default()
            }
        };

        let mut fsm = AuthMachine::new();
        if restored.authenticated {
            remote.set_access_token(restored.access_token.clone());
            let _ = fsm.consume(&AuthMachineInput::Restored);
            debug!(username = %restored.username, "Restored persisted session");
        }

        Self {
            remote,
            vault,
            policy,
            session: Mutex::new(restored),
            fsm: Mutex::new(fsm),
            refresh_lock: tokio::sync::Mutex::new(()),
            reset_hook: Mutex::new(None),
            state_callback: Mutex::new(None),
        }
    }

    pub fn set_reset_hook(&self, hook: ResetHook) {
        *self.reset_hook.lock() = Some(hook);
    }

    /// Set a callback to be notified of auth state changes.
    pub fn set_state_callback(&self, callback: AuthStateCallback) {
        *self.state_callback.lock() = Some(callback);
    }

    pub fn state(&self) -> AuthState {
        AuthState::from(self.fsm.lock().state())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.lock().authenticated
    }

    pub fn identity(&self) -> Option<UserIdentity> {
        self.session.lock().identity()
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.session.lock().clone()
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Transition the FSM and notify callback if state changed.
    fn transition(&self, input: &AuthMachineInput) -> AuthResult<AuthState> {
        let mut fsm = self.fsm.lock();
        let old_state = AuthState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = AuthState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Auth state transition"
            );
            self.notify_state_change(new_state);
        }

        Ok(new_state)
    }

    fn notify_state_change(&self, state: AuthState) {
        let cb = self.state_callback.lock();
        if let Some(callback) = cb.as_ref() {
            let username = self.identity().map(|user| user.username);
            callback(AuthStateChangedPayload { state, username });
        }
    }

    fn persist(&self, session: &Session) {
        let result = if session.authenticated {
            self.vault.save_session(session)
        } else {
            self.vault.clear_session()
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session");
        }
    }

    fn run_reset_hook(&self) {
        if let Some(hook) = self.reset_hook.lock().as_ref() {
            hook();
        }
    }

    fn clear_credentials(&self) {
        self.remote.set_access_token(None);
        let cleared = Session::default();
        *self.session.lock() = cleared.clone();
        self.persist(&cleared);
    }

    /// Sign-out triggered by an unusable refresh credential: clears the
    /// credentials and every entity store.
    fn force_sign_out(&self, reason: &str) {
        info!(reason, "Session expired, signing out");
        self.clear_credentials();
        self.run_reset_hook();
        let _ = self.transition(&AuthMachineInput::RefreshExpired);
    }

    fn needs_refresh(&self) -> AuthResult<bool> {
        let session = self.session.lock();
        if !session.authenticated {
            return Err(AuthError::NotSignedIn);
        }
        Ok(session.access_expired(Utc::now(), self.policy.expiry_margin))
    }

    /// Ensure the installed access token is fresh.
    ///
    /// Returns immediately when it is. Otherwise exchanges the refresh token
    /// for a new access token; an expired or rejected refresh token forces a
    /// sign-out and yields [`AuthError::SessionExpired`]. A network failure
    /// leaves the session in place and yields the transient remote error.
    pub async fn authorize(&self) -> AuthResult<()> {
        if !self.needs_refresh()? {
            return Ok(());
        }

        let _refreshing = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        if !self.needs_refresh()? {
            return Ok(());
        }

        let refresh_token = {
            let session = self.session.lock();
            if session.refresh_expired(Utc::now()) {
                None
            } else {
                session.refresh_token.clone()
            }
        };
        let Some(refresh_token) = refresh_token else {
            self.force_sign_out("refresh credential expired");
            return Err(AuthError::SessionExpired);
        };

        let _ = self.transition(&AuthMachineInput::AccessExpired);

        match self.remote.refresh(&refresh_token).await {
            Ok(grant) => {
                let installed = {
                    let mut session = self.session.lock();
                    if session.refresh_token.as_deref() == Some(refresh_token.as_str()) {
                        session.install_access(grant.access.clone(), &self.policy, Utc::now());
                        Some(session.clone())
                    } else {
                        None
                    }
                };

                let Some(session) = installed else {
                    // Signed out (or in as someone else) while the refresh was in flight.
                    debug!("Discarding refresh result for a replaced session");
                    return Err(AuthError::NotSignedIn);
                };

                self.remote.set_access_token(Some(grant.access));
                self.persist(&session);
                let _ = self.transition(&AuthMachineInput::RefreshSuccess);
                info!(username = %session.username, "Access token refreshed");
                Ok(())
            }
            Err(e) if e.is_unauthorized() => {
                self.force_sign_out("refresh credential rejected");
                Err(AuthError::SessionExpired)
            }
            Err(e) => {
                let _ = self.transition(&AuthMachineInput::RefreshAborted);
                warn!(error = %e, "Token refresh failed");
                Err(AuthError::Remote(e))
            }
        }
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> AuthResult<UserIdentity> {
        self.authenticate(credentials, AuthFlow::SignIn).await
    }

    pub async fn sign_up(&self, credentials: &Credentials) -> AuthResult<UserIdentity> {
        self.authenticate(credentials, AuthFlow::SignUp).await
    }

    async fn authenticate(
        &self,
        credentials: &Credentials,
        flow: AuthFlow,
    ) -> AuthResult<UserIdentity> {
        let was_signed_in = self.is_authenticated();
        let _ = self.transition(&AuthMachineInput::SignInAttempt);

        let result = match flow {
            AuthFlow::SignIn => self.remote.login(credentials).await,
            AuthFlow::SignUp => self.remote.register(credentials).await,
        };

        let grant = match result {
            Ok(grant) => grant,
            Err(e) => {
                let input = if was_signed_in {
                    AuthMachineInput::SignInAborted
                } else {
                    AuthMachineInput::SignInFailed
                };
                let _ = self.transition(&input);
                warn!(
                    flow = ?flow,
                    username = %credentials.username,
                    error = %e,
                    "Authentication failed"
                );
                return Err(match e {
                    RemoteError::Unauthorized { message, .. } => {
                        AuthError::InvalidCredentials(message)
                    }
                    RemoteError::Status { status, message } if (400..500).contains(&status) => {
                        AuthError::InvalidCredentials(message)
                    }
                    other => AuthError::Remote(other),
                });
            }
        };

        // Previous session's content must not leak into the new one.
        self.run_reset_hook();

        let session = Session::from_grant(&grant, &self.policy, Utc::now());
        self.remote.set_access_token(session.access_token.clone());
        *self.session.lock() = session.clone();
        self.persist(&session);
        let _ = self.transition(&AuthMachineInput::SignInSuccess);

        info!(flow = ?flow, username = %session.username, "Signed in");
        Ok(grant.user)
    }

    /// Best-effort remote logout, then unconditionally drop the credentials.
    pub async fn sign_out(&self) {
        let was_signed_in = self.is_authenticated();
        let _ = self.transition(&AuthMachineInput::SignOutRequested);

        if was_signed_in {
            if let Err(e) = self.remote.logout().await {
                warn!(error = %e, "Remote logout failed, clearing session anyway");
            }
        }

        self.clear_credentials();
        let _ = self.transition(&AuthMachineInput::SignOutComplete);
        info!("Signed out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use entity_store::{
        NewNote, NewSection, NewTag, Note, NoteId, NotePatch, Section, SectionId, SectionPatch,
        Tag, TagId, TagPatch,
    };
    use notebook_storage::MemoryStorage;
    use remote_authority::{AuthGrant, RefreshGrant, RemoteResult};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Auth-only remote with scripted responses.
    #[derive(Default)]
    struct ScriptedAuth {
        login_results: Mutex<VecDeque<RemoteResult<AuthGrant>>>,
        refresh_results: Mutex<VecDeque<RemoteResult<RefreshGrant>>>,
        logout_fails: bool,
        refresh_calls: AtomicUsize,
        logout_calls: AtomicUsize,
        token: Mutex<Option<String>>,
    }

    impl ScriptedAuth {
        fn token(&self) -> Option<String> {
            self.token.lock().clone()
        }
    }

    fn not_found<T>() -> RemoteResult<T> {
        Err(RemoteError::Status {
            status: 404,
            message: "not scripted".into(),
        })
    }

    #[async_trait]
    impl RemoteAuthority for ScriptedAuth {
        fn set_access_token(&self, token: Option<String>) {
            *self.token.lock() = token;
        }
        async fn register(&self, credentials: &Credentials) -> RemoteResult<AuthGrant> {
            self.login(credentials).await
        }
        async fn login(&self, _credentials: &Credentials) -> RemoteResult<AuthGrant> {
            self.login_results
                .lock()
                .pop_front()
                .unwrap_or_else(not_found)
        }
        async fn logout(&self) -> RemoteResult<()> {
            self.logout_calls.fetch_add(1, Ordering::SeqCst);
            if self.logout_fails {
                Err(RemoteError::Timeout)
            } else {
                Ok(())
            }
        }
        async fn refresh(&self, _refresh_token: &str) -> RemoteResult<RefreshGrant> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.refresh_results
                .lock()
                .pop_front()
                .unwrap_or_else(not_found)
        }
        async fn health(&self) -> RemoteResult<()> {
            Ok(())
        }
        async fn fetch_sections(&self) -> RemoteResult<Vec<Section>> {
            not_found()
        }
        async fn create_section(&self, _: &NewSection) -> RemoteResult<Section> {
            not_found()
        }
        async fn update_section(&self, _: SectionId, _: &SectionPatch) -> RemoteResult<Section> {
            not_found()
        }
        async fn delete_section(&self, _: SectionId) -> RemoteResult<()> {
            not_found()
        }
        async fn fetch_tags(&self, _: SectionId) -> RemoteResult<Vec<Tag>> {
            not_found()
        }
        async fn create_tag(&self, _: &NewTag) -> RemoteResult<Tag> {
            not_found()
        }
        async fn update_tag(&self, _: TagId, _: &TagPatch) -> RemoteResult<Tag> {
            not_found()
        }
        async fn delete_tag(&self, _: TagId) -> RemoteResult<()> {
            not_found()
        }
        async fn fetch_notes(&self, _: SectionId) -> RemoteResult<Vec<Note>> {
            not_found()
        }
        async fn create_note(&self, _: &NewNote) -> RemoteResult<Note> {
            not_found()
        }
        async fn update_note(&self, _: NoteId, _: &NotePatch) -> RemoteResult<Note> {
            not_found()
        }
        async fn delete_note(&self, _: NoteId) -> RemoteResult<()> {
            not_found()
        }
    }

    fn grant(username: &str) -> AuthGrant {
        AuthGrant {
            user: UserIdentity {
                username: username.into(),
                email: format!("{}@example.com", username),
            },
            access_token: format!("{}-access", username),
            refresh_token: format!("{}-refresh", username),
        }
    }

    fn guard_with(remote: Arc<ScriptedAuth>) -> (SessionGuard, StateVault, Arc<AtomicUsize>) {
        let vault = StateVault::new(Arc::new(MemoryStorage::new()));
        let guard = SessionGuard::new(remote, vault.clone(), SessionPolicy::default());
        let resets = Arc::new(AtomicUsize::new(0));
        let counter = resets.clone();
        guard.set_reset_hook(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (guard, vault, resets)
    }

    /// Persist a signed-in session whose access token is already stale.
    fn stale_session(vault: &StateVault, refresh_valid: bool) {
        let now = Utc::now();
        let session = Session {
            username: "ada".into(),
            email: "ada@example.com".into(),
            access_token: Some("old-access".into()),
            access_expiry: Some(now - Duration::seconds(1)),
            refresh_token: Some("ada-refresh".into()),
            refresh_expiry: Some(if refresh_valid {
                now + Duration::hours(1)
            } else {
                now - Duration::seconds(1)
            }),
            authenticated: true,
        };
        vault.save_session(&session).unwrap();
    }

    #[tokio::test]
    async fn test_sign_in_resets_stores_then_installs_identity() {
        let remote = Arc::new(ScriptedAuth::default());
        remote.login_results.lock().push_back(Ok(grant("ada")));
        let (guard, vault, resets) = guard_with(remote.clone());

        let user = guard
            .sign_in(&Credentials::sign_in("ada", "pw"))
            .await
            .unwrap();

        assert_eq!(user.username, "ada");
        assert_eq!(resets.load(Ordering::SeqCst), 1);
        assert_eq!(guard.state(), AuthState::SignedIn);
        assert_eq!(remote.token().as_deref(), Some("ada-access"));
        assert!(vault.load_session::<Session>().unwrap().unwrap().authenticated);
    }

    #[tokio::test]
    async fn test_rejected_credentials_leave_state_untouched() {
        let remote = Arc::new(ScriptedAuth::default());
        remote.login_results.lock().push_back(Ok(grant("ada")));
        remote
            .login_results
            .lock()
            .push_back(Err(RemoteError::Unauthorized {
                status: 401,
                message: "bad password".into(),
            }));
        let (guard, _vault, resets) = guard_with(remote.clone());

        guard.sign_in(&Credentials::sign_in("ada", "pw")).await.unwrap();
        let before = guard.session();

        let err = guard
            .sign_in(&Credentials::sign_in("bob", "nope"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials(_)));
        assert_eq!(guard.session(), before);
        assert_eq!(guard.state(), AuthState::SignedIn);
        assert_eq!(resets.load(Ordering::SeqCst), 1);
        assert_eq!(remote.token().as_deref(), Some("ada-access"));
    }

    #[tokio::test]
    async fn test_authorize_is_noop_while_fresh() {
        let remote = Arc::new(ScriptedAuth::default());
        remote.login_results.lock().push_back(Ok(grant("ada")));
        let (guard, _vault, _) = guard_with(remote.clone());
        guard.sign_in(&Credentials::sign_in("ada", "pw")).await.unwrap();

        guard.authorize().await.unwrap();
        guard.authorize().await.unwrap();

        assert_eq!(remote.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_authorize_in_guest_mode_fails() {
        let remote = Arc::new(ScriptedAuth::default());
        let (guard, _vault, _) = guard_with(remote);
        assert!(matches!(guard.authorize().await, Err(AuthError::NotSignedIn)));
    }

    #[tokio::test]
    async fn test_concurrent_authorize_refreshes_once() {
        let remote = Arc::new(ScriptedAuth::default());
        remote.refresh_results.lock().push_back(Ok(RefreshGrant {
            access: "new-access".into(),
        }));
        let vault = StateVault::new(Arc::new(MemoryStorage::new()));
        stale_session(&vault, true);
        let guard = SessionGuard::new(remote.clone(), vault, SessionPolicy::default());
        assert_eq!(remote.token().as_deref(), Some("old-access"));

        let (a, b) = tokio::join!(guard.authorize(), guard.authorize());
        a.unwrap();
        b.unwrap();

        assert_eq!(remote.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(remote.token().as_deref(), Some("new-access"));
        assert_eq!(guard.state(), AuthState::SignedIn);
    }

    #[tokio::test]
    async fn test_expired_refresh_forces_sign_out() {
        let remote = Arc::new(ScriptedAuth::default());
        let vault = StateVault::new(Arc::new(MemoryStorage::new()));
        stale_session(&vault, false);
        let guard = SessionGuard::new(remote.clone(), vault.clone(), SessionPolicy::default());
        let resets = Arc::new(AtomicUsize::new(0));
        let counter = resets.clone();
        guard.set_reset_hook(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let err = guard.authorize().await.unwrap_err();

        assert!(matches!(err, AuthError::SessionExpired));
        assert_eq!(remote.refresh_calls.load(Ordering::SeqCst), 0);
        assert_eq!(resets.load(Ordering::SeqCst), 1);
        assert!(!guard.is_authenticated());
        assert_eq!(guard.state(), AuthState::SignedOut);
        assert!(remote.token().is_none());
        assert!(vault.load_session::<Session>().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_network_failure_keeps_session() {
        let remote = Arc::new(ScriptedAuth::default());
        remote
            .refresh_results
            .lock()
            .push_back(Err(RemoteError::Timeout));
        let vault = StateVault::new(Arc::new(MemoryStorage::new()));
        stale_session(&vault, true);
        let guard = SessionGuard::new(remote.clone(), vault, SessionPolicy::default());

        let err = guard.authorize().await.unwrap_err();

        assert!(matches!(err, AuthError::Remote(RemoteError::Timeout)));
        assert!(guard.is_authenticated());
        assert_eq!(guard.state(), AuthState::SignedIn);
        assert_eq!(remote.token().as_deref(), Some("old-access"));
    }

    #[tokio::test]
    async fn test_sign_out_survives_remote_failure() {
        let remote = Arc::new(ScriptedAuth {
            logout_fails: true,
            ..ScriptedAuth::default()
        });
        remote.login_results.lock().push_back(Ok(grant("ada")));
        let (guard, vault, _) = guard_with(remote.clone());
        guard.sign_in(&Credentials::sign_in("ada", "pw")).await.unwrap();

        guard.sign_out().await;

        assert_eq!(remote.logout_calls.load(Ordering::SeqCst), 1);
        assert!(!guard.is_authenticated());
        assert!(remote.token().is_none());
        assert_eq!(guard.state(), AuthState::SignedOut);
        assert!(vault.load_session::<Session>().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_state_callback_sees_transitions() {
        let remote = Arc::new(ScriptedAuth::default());
        remote.login_results.lock().push_back(Ok(grant("ada")));
        let (guard, _vault, _) = guard_with(remote);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        guard.set_state_callback(Box::new(move |payload| sink.lock().push(payload.state)));

        guard.sign_in(&Credentials::sign_in("ada", "pw")).await.unwrap();

        assert_eq!(
            *seen.lock(),
            vec![AuthState::SigningIn, AuthState::SignedIn]
        );
    }
}
