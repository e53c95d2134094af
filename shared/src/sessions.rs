//! Cookie-scoped sessions.
//!
//! The browser holds `tracker_session=<id>.<signature>`; the id keys a
//! [`Session`] in a [`SessionStore`]. Expiry is fixed at sign-in and checked
//! lazily on each request, evicting the entry the first time it is seen stale.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use lambda_http::http::HeaderMap;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::types::{Session, UserRecord};

pub const SESSION_COOKIE: &str = "tracker_session";

type HmacSha256 = Hmac<Sha256>;

/// Storage for live sessions keyed by cookie session id
pub trait SessionStore: Send + Sync {
    fn get(&self, id: &str) -> Option<Session>;
    fn insert(&self, id: String, session: Session);
    fn remove(&self, id: &str) -> Option<Session>;
    /// Drop every session held by `email`
    fn remove_for_email(&self, email: &str);
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, id: &str) -> Option<Session> {
        self.lock().get(id).cloned()
    }

    fn insert(&self, id: String, session: Session) {
        self.lock().insert(id, session);
    }

    fn remove(&self, id: &str) -> Option<Session> {
        self.lock().remove(id)
    }

    fn remove_for_email(&self, email: &str) {
        self.lock().retain(|_, session| session.email != email);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Valid(Session),
    Expired,
    Missing,
}

/// 32 random bytes, URL-safe
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
    URL_SAFE_NO_PAD.encode(bytes)
}

pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    secret: Vec<u8>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, secret: &str, ttl: Duration) -> Self {
        Self {
            store,
            secret: secret.as_bytes().to_vec(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session for `user`, replacing any session they already hold.
    /// Returns the signed cookie value with it.
    pub fn create_session(
        &self,
        user: &UserRecord,
        attributed_name: Option<String>,
        now: DateTime<Utc>,
    ) -> (String, Session) {
        let session = Session {
            email: user.email.clone(),
            role: user.role,
            attributed_name,
            token: generate_token(),
            expires_at: now + self.ttl,
        };

        let id = generate_token();
        let cookie_value = format!("{}.{}", id, self.sign(&id));
        self.store.remove_for_email(&session.email);
        self.store.insert(id, session.clone());
        (cookie_value, session)
    }

    pub fn validate_session(&self, cookie_value: Option<&str>, now: DateTime<Utc>) -> SessionStatus {
        let Some(id) = cookie_value.and_then(|raw| self.verify(raw)) else {
            return SessionStatus::Missing;
        };
        let Some(session) = self.store.get(id) else {
            return SessionStatus::Missing;
        };

        if now > session.expires_at {
            tracing::info!("Session for {} expired at {}", session.email, session.expires_at);
            self.store.remove(id);
            return SessionStatus::Expired;
        }
        SessionStatus::Valid(session)
    }

    /// Drop whatever session the cookie points at. Safe to repeat.
    pub fn destroy_session(&self, cookie_value: Option<&str>) {
        if let Some(id) = cookie_value.and_then(|raw| self.verify(raw)) {
            self.store.remove(id);
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }

    fn sign(&self, id: &str) -> String {
        let mut mac = self.mac();
        mac.update(id.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Session id from a signed cookie value, if the signature holds
    fn verify<'a>(&self, raw: &'a str) -> Option<&'a str> {
        let (id, signature) = raw.rsplit_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let mut mac = self.mac();
        mac.update(id.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(id)
    }
}

/// Value of the session cookie from the request's `Cookie` headers
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all("Cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

pub fn set_cookie_header(value: &str, max_age_secs: i64, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{}",
        SESSION_COOKIE, value, max_age_secs, secure_flag
    )
}

pub fn clear_cookie_header(secure: bool) -> String {
    set_cookie_header("", 0, secure)
}
