//! Session gate consumed by every outgoing request.
//!
//! Authentication itself is delegated to an external service; this module
//! only holds the resulting bearer session, attaches it to requests and
//! reacts to the two process-wide auth signals.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ClientConfig;
use crate::events::{AppEvent, AuthEvent, EventBus, Notice};
use crate::models::UserRole;
use crate::util::unix_timestamp_now;

const EXPIRY_SKEW_SECONDS: i64 = 60;

pub const TOKEN_EXPIRED_MESSAGE: &str = "Votre session a expiré. Veuillez vous reconnecter.";
pub const UNAUTHORIZED_MESSAGE: &str =
    "Accès non autorisé. Veuillez vous reconnecter avec un compte habilité.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    /// Unix seconds; `None` when the issuer did not say.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS)
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to parse stored session: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

pub trait SessionPersistence: Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Process-local session store; the session is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<AuthSession>>,
}

impl SessionPersistence for MemorySessionStore {
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        Ok(self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> AuthResult<()> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// The two signals the request layer raises but does not handle itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSignal {
    TokenExpired,
    Unauthorized,
}

impl AuthSignal {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::TokenExpired => TOKEN_EXPIRED_MESSAGE,
            Self::Unauthorized => UNAUTHORIZED_MESSAGE,
        }
    }
}

impl fmt::Display for AuthSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// What the gate can attach to the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BearerToken {
    Present(String),
    Absent,
    Expired,
}

pub struct AuthGate {
    store: Arc<dyn SessionPersistence>,
    session: RwLock<Option<AuthSession>>,
    bus: EventBus,
    login_route: String,
    redirect_delay: Duration,
    signal_raised: AtomicBool,
    signal_epoch: AtomicU64,
}

impl AuthGate {
    pub fn new(store: Arc<dyn SessionPersistence>, bus: EventBus, config: &ClientConfig) -> Self {
        Self {
            store,
            session: RwLock::new(None),
            bus,
            login_route: config.login_route.clone(),
            redirect_delay: config.redirect_delay(),
            signal_raised: AtomicBool::new(false),
            signal_epoch: AtomicU64::new(0),
        }
    }

    /// Gate with an in-memory store and default settings.
    pub fn in_memory(bus: EventBus) -> Self {
        Self::new(
            Arc::new(MemorySessionStore::default()),
            bus,
            &ClientConfig::default(),
        )
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Load a persisted session; expired sessions are discarded.
    pub fn restore(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored) = self.store.load_session()? else {
            return Ok(None);
        };
        if stored.is_expired() {
            tracing::info!("Discarding expired persisted session");
            self.store.clear_session()?;
            return Ok(None);
        }
        self.set_session(Some(stored.clone()));
        Ok(Some(stored))
    }

    pub fn sign_in(&self, session: AuthSession) -> AuthResult<()> {
        self.store.save_session(&session)?;
        self.set_session(Some(session));
        self.signal_raised.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn sign_out(&self) -> AuthResult<()> {
        self.set_session(None);
        self.store.clear_session()
    }

    #[must_use]
    pub fn current_session(&self) -> Option<AuthSession> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<AuthUser> {
        self.current_session().map(|session| session.user)
    }

    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.current_user().is_some_and(|user| user.role.is_staff())
    }

    #[must_use]
    pub fn bearer_token(&self) -> BearerToken {
        match self.current_session() {
            None => BearerToken::Absent,
            Some(session) if session.is_expired() => BearerToken::Expired,
            Some(session) => BearerToken::Present(session.access_token),
        }
    }

    /// Whether a signal was handled and no new session has been established.
    #[must_use]
    pub fn session_ended(&self) -> bool {
        self.signal_raised.load(Ordering::SeqCst)
    }

    /// Number of signals handled so far. A request that started under an
    /// older epoch was pre-empted by the session ending.
    #[must_use]
    pub fn signal_epoch(&self) -> u64 {
        self.signal_epoch.load(Ordering::SeqCst)
    }

    /// Show the notice, invalidate the session and schedule the login redirect.
    ///
    /// Signals raised while a redirect is already scheduled are ignored.
    /// Returns `true` when this call performed the handling.
    pub fn handle_signal(&self, signal: AuthSignal) -> bool {
        if self.signal_raised.swap(true, Ordering::SeqCst) {
            tracing::debug!(?signal, "Auth signal already being handled");
            return false;
        }
        self.signal_epoch.fetch_add(1, Ordering::SeqCst);

        tracing::warn!(?signal, "Session invalidated by auth signal");
        let message = signal.message().to_string();
        let event = match signal {
            AuthSignal::TokenExpired => AuthEvent::TokenExpired {
                message: message.clone(),
            },
            AuthSignal::Unauthorized => AuthEvent::Unauthorized {
                message: message.clone(),
            },
        };
        self.bus.publish(AppEvent::Auth(event));
        self.bus.notify(Notice::warning(message));

        self.set_session(None);
        if let Err(error) = self.store.clear_session() {
            tracing::warn!("Failed to clear persisted session: {}", error);
        }

        self.schedule_redirect();
        true
    }

    fn schedule_redirect(&self) {
        let redirect = AppEvent::Auth(AuthEvent::LoginRedirect {
            route: self.login_route.clone(),
        });
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let bus = self.bus.clone();
                let delay = self.redirect_delay;
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    bus.publish(redirect);
                });
            }
            Err(_) => self.bus.publish(redirect),
        }
    }

    fn set_session(&self, session: Option<AuthSession>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthGate")
            .field("session", &self.current_session())
            .field("login_route", &self.login_route)
            .field("redirect_delay", &self.redirect_delay)
            .finish_non_exhaustive()
    }
}
