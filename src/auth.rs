use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::ApiError,
    models::{Role, SessionIdentity, User},
};

/// Name of the session cookie set on login and cleared on logout.
pub const SESSION_COOKIE: &str = "session_id";

// --- Identity Store ---

/// IdentityStore
///
/// Holds the fixed set of user records provisioned at startup. Records are
/// immutable for the lifetime of the process, so the store needs no lock and
/// is shared as a plain `Arc`.
pub struct IdentityStore {
    users: Vec<User>,
}

impl IdentityStore {
    /// The seed set this system ships with: one administrator and one
    /// regular member.
    pub fn seeded() -> Self {
        Self {
            users: vec![
                User {
                    id: 1,
                    username: "admin".to_string(),
                    password: "admin123".to_string(),
                    role: Role::Admin,
                },
                User {
                    id: 2,
                    username: "user".to_string(),
                    password: "user123".to_string(),
                    role: Role::Member,
                },
            ],
        }
    }

    /// Validates a credential pair against the stored records.
    ///
    /// A single exact-match lookup over both fields: an unknown username and
    /// a wrong password are indistinguishable in the result. Pure, no side
    /// effects, so the surrounding rate limiter can wrap it directly.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<&User, ApiError> {
        self.users
            .iter()
            .find(|user| user.username == username && user.password == password)
            .ok_or(ApiError::InvalidCredentials)
    }

    pub fn find_by_username(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|user| user.username == username)
    }
}

/// IdentityState
///
/// The concrete type used to share the identity store across the application state.
pub type IdentityState = Arc<IdentityStore>;

// --- Session Manager ---

/// A stored session: the identity snapshot plus its creation instant.
struct Session {
    identity: SessionIdentity,
    created_at: Instant,
}

/// SessionManager
///
/// Maps opaque tokens to identity snapshots. Tokens are v4 UUIDs from the
/// crypto RNG, so they are unguessable without being meaningful. Expiry is
/// checked lazily at resolve time; there is no background sweep.
///
/// The table is shared mutable state: every operation takes the mutex for
/// the whole mutation, and the lock is never held across an await point.
pub struct SessionManager {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a session for an authenticated user and returns its token.
    /// The identity (including the role) is snapshotted here and never
    /// re-read from the user record afterwards.
    pub fn create(&self, user: &User) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let session = Session {
            identity: SessionIdentity::from(user),
            created_at: Instant::now(),
        };
        self.sessions
            .lock()
            .expect("session table lock poisoned")
            .insert(token.clone(), session);
        token
    }

    /// Looks up a token. Absent tokens yield `None`; entries older than the
    /// TTL are evicted on the spot and also yield `None`.
    pub fn resolve(&self, token: &str) -> Option<SessionIdentity> {
        let mut sessions = self.sessions.lock().expect("session table lock poisoned");
        match sessions.get(token) {
            Some(session) if session.created_at.elapsed() < self.ttl => {
                Some(session.identity.clone())
            }
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    /// Removes a session. Destroying an absent token is not an error.
    pub fn destroy(&self, token: &str) {
        self.sessions
            .lock()
            .expect("session table lock poisoned")
            .remove(token);
    }
}

/// SessionState
///
/// The concrete type used to share the session manager across the application state.
pub type SessionState = Arc<SessionManager>;

// --- Cookie Handling ---

/// Builds the `Set-Cookie` value for a fresh session. `HttpOnly` keeps the
/// token away from page scripts; `Secure` is attached outside local mode.
pub fn session_cookie(token: &str, config: &AppConfig) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.session_ttl.as_secs()
    );
    if config.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Builds the `Set-Cookie` value that clears the session cookie on logout.
pub fn clear_session_cookie(config: &AppConfig) -> String {
    let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Extracts the session token from a request's `Cookie` header, if present.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

// --- Extractors ---

/// AuthUser
///
/// The resolved identity of an authenticated request. Implements
/// `FromRequestParts`, so any handler that takes it as an argument is only
/// ever invoked with a live session; requests without one are rejected with
/// 401 before the handler runs.
///
/// Resolution: read the session cookie, look the token up in the session
/// table. Missing cookie, unknown token, and expired token all collapse into
/// the same `Unauthenticated` rejection.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionIdentity);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionState::from_ref(state);

        let token = session_token(&parts.headers).ok_or(ApiError::Unauthenticated)?;
        let identity = sessions.resolve(&token).ok_or(ApiError::Unauthenticated)?;

        Ok(AuthUser(identity))
    }
}

/// OptionalAuthUser
///
/// Like [`AuthUser`] but never rejects: anonymous requests resolve to
/// `None`. Used where anonymity is allowed and only changes behavior
/// (comment authorship) or where the policy decision belongs to the handler.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<SessionIdentity>);

impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionState::from_ref(state);

        let identity = session_token(&parts.headers).and_then(|token| sessions.resolve(&token));

        Ok(OptionalAuthUser(identity))
    }
}
