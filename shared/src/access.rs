use chrono::{DateTime, Utc};
use lambda_http::http::HeaderMap;

use crate::error::ApiError;
use crate::sessions::{session_cookie, SessionManager, SessionStatus};
use crate::types::Session;

pub fn require_authenticated(status: SessionStatus) -> Result<Session, ApiError> {
    match status {
        SessionStatus::Valid(session) => Ok(session),
        SessionStatus::Expired => Err(ApiError::Authentication("Session expired".to_string())),
        SessionStatus::Missing => Err(ApiError::Authentication("Authentication required".to_string())),
    }
}

pub fn require_admin(session: &Session) -> Result<(), ApiError> {
    if session.role.is_admin() {
        Ok(())
    } else {
        tracing::warn!("Admin access denied for {}", session.email);
        Err(ApiError::Authorization("Admin access required".to_string()))
    }
}

/// Admins pass; anyone else only for their own attributed name, compared
/// exactly (case-sensitive).
pub fn require_owner_or_admin(session: &Session, target_name: &str) -> Result<(), ApiError> {
    if session.role.is_admin() || session.attributed_name.as_deref() == Some(target_name) {
        Ok(())
    } else {
        tracing::warn!("{} denied access to data of {:?}", session.email, target_name);
        Err(ApiError::Authorization("Access denied".to_string()))
    }
}

/// Resolve the caller's live session from the request cookie
pub fn authenticate(
    sessions: &SessionManager,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<Session, ApiError> {
    let cookie = session_cookie(headers);
    require_authenticated(sessions.validate_session(cookie.as_deref(), now))
}

pub fn authenticate_admin(
    sessions: &SessionManager,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<Session, ApiError> {
    let session = authenticate(sessions, headers, now)?;
    require_admin(&session)?;
    Ok(session)
}
