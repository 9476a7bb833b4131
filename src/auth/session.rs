use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::{
    auth::{
        credentials::{CredentialStore, ROLE_KEY, TOKEN_KEY, USER_ID_KEY},
        policy::RedirectTarget,
        validation::RegistrationValidator,
    },
    errors::{AppError, Result},
    models::{AccountRole, LoginRequest, LoginResponse, RegisterRequest, Session, SessionPhase, UserId},
    services::gateway::ResourceGateway,
};

/// Shared view of the signed-in identity.
///
/// The gateway reads credentials from it and reports rejected tokens back to
/// it; only the session controller establishes identities.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    session: RwLock<Session>,
    pending_logins: AtomicUsize,
    store: Arc<dyn CredentialStore>,
}

impl SessionHandle {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                session: RwLock::new(Session::guest()),
                pending_logins: AtomicUsize::new(0),
                store,
            }),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.inner.session.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.session.read().token().map(str::to_owned)
    }

    pub fn phase(&self) -> SessionPhase {
        if self.inner.pending_logins.load(Ordering::SeqCst) > 0 {
            SessionPhase::Authenticating
        } else if self.inner.session.read().is_authenticated() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Guest
        }
    }

    /// Forced logout after the remote authority rejected `token`. A rejection
    /// of a token that has since been replaced is ignored.
    pub(crate) fn invalidate_if_current(&self, token: &str) {
        let is_current = self.inner.session.read().token() == Some(token);
        if is_current {
            tracing::info!("Credential rejected by server, returning to guest");
            self.reset();
        } else {
            tracing::debug!("Ignoring rejection of a superseded credential");
        }
    }

    fn reset(&self) {
        *self.inner.session.write() = Session::guest();
        if let Err(e) = self.inner.store.clear() {
            tracing::warn!(error = %e, "Failed to clear credential store");
        }
    }

    fn restore(&self) -> Result<Session> {
        let store = &self.inner.store;

        let session = match store.get(TOKEN_KEY)? {
            Some(token) => {
                let role = match store.get(ROLE_KEY)? {
                    Some(raw) => raw.parse::<AccountRole>().unwrap_or_else(|e| {
                        tracing::warn!(error = %e, "Stored role unreadable, assuming user");
                        AccountRole::User
                    }),
                    None => AccountRole::User,
                };
                let user_id = store
                    .get(USER_ID_KEY)?
                    .and_then(|raw| raw.parse::<UserId>().ok());

                Session::authenticated(token, role, user_id)
            }
            None => Session::guest(),
        };

        *self.inner.session.write() = session.clone();
        Ok(session)
    }

    /// Persists first so memory never claims an identity the store lost.
    fn establish(&self, response: LoginResponse) -> Result<Session> {
        let store = &self.inner.store;

        let persisted = store
            .clear()
            .and_then(|_| store.set(TOKEN_KEY, &response.token))
            .and_then(|_| store.set(ROLE_KEY, response.role.as_str()))
            .and_then(|_| match response.user_id {
                Some(id) => store.set(USER_ID_KEY, &id.to_string()),
                None => Ok(()),
            });

        if let Err(e) = persisted {
            self.reset();
            return Err(e);
        }

        let session = Session::authenticated(response.token, response.role, response.user_id);
        *self.inner.session.write() = session.clone();
        Ok(session)
    }

    fn begin_login(&self) -> LoginAttempt<'_> {
        self.inner.pending_logins.fetch_add(1, Ordering::SeqCst);
        LoginAttempt { handle: self }
    }
}

struct LoginAttempt<'a> {
    handle: &'a SessionHandle,
}

impl Drop for LoginAttempt<'_> {
    fn drop(&mut self) {
        self.handle.inner.pending_logins.fetch_sub(1, Ordering::SeqCst);
    }
}

/// What a successful login tells the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub role: AccountRole,
    pub user_id: Option<UserId>,
    pub landing: RedirectTarget,
}

pub struct SessionController {
    handle: SessionHandle,
    gateway: ResourceGateway,
}

impl SessionController {
    pub fn new(gateway: ResourceGateway) -> Self {
        Self {
            handle: gateway.session().clone(),
            gateway,
        }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn gateway(&self) -> &ResourceGateway {
        &self.gateway
    }

    pub fn snapshot(&self) -> Session {
        self.handle.snapshot()
    }

    pub fn phase(&self) -> SessionPhase {
        self.handle.phase()
    }

    pub fn is_authenticated(&self) -> bool {
        self.handle.snapshot().is_authenticated()
    }

    pub fn restore_from_storage(&self) -> Result<Session> {
        let session = self.handle.restore()?;
        tracing::debug!(
            authenticated = session.is_authenticated(),
            role = ?session.role(),
            "Session restored from credential store"
        );
        Ok(session)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let _attempt = self.handle.begin_login();

        // At most one identity: drop whatever was held before asking again.
        if self.handle.snapshot().is_authenticated() {
            tracing::debug!("Dropping previous identity before login");
            self.handle.reset();
        }

        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response = match self
            .gateway
            .post_json_anonymous::<_, LoginResponse>("/login", &request)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.handle.reset();
                tracing::info!(username, error = %e, "Login failed");
                return Err(match e {
                    AppError::Unauthorized
                    | AppError::Forbidden
                    | AppError::NotFound
                    | AppError::ValidationFailed(_) => AppError::AuthRejected,
                    other => other,
                });
            }
        };

        let (role, user_id) = (response.role, response.user_id);
        self.handle.establish(response)?;

        tracing::info!(username, role = %role, "Signed in");

        Ok(LoginOutcome {
            role,
            user_id,
            landing: RedirectTarget::landing_for(role.into()),
        })
    }

    /// Always ends in the guest state; telling the server is best-effort.
    pub async fn logout(&self) {
        if self.handle.token().is_some() {
            if let Err(e) = self.gateway.post_empty("/logout").await {
                tracing::warn!(error = %e, "Server logout failed, clearing local session anyway");
            }
        }

        self.handle.reset();
        tracing::info!("Signed out");
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<()> {
        RegistrationValidator::validate(request)?;

        self.gateway
            .post_empty_anonymous("/register", request)
            .await?;

        tracing::info!(username = %request.username, "Account registered");
        Ok(())
    }
}
