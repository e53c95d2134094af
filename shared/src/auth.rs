use chrono::Utc;
use lambda_http::{
    http::{HeaderMap, HeaderValue, StatusCode},
    Body, Response,
};

use crate::error::ApiError;
use crate::identity::{find_user_by_email, resolve_attributed_name};
use crate::responses::{json_response, ok_json, parse_json_body};
use crate::sessions::{clear_cookie_header, session_cookie, set_cookie_header, SessionStatus};
use crate::types::{EmailRequest, SessionUser, SignedInUser, SigninResponse, VerifyResponse};
use crate::AppState;

fn required_email(request: EmailRequest) -> Result<String, ApiError> {
    request
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::Validation("Email is required".to_string()))
}

fn with_cookie(mut resp: Response<Body>, cookie: String) -> Result<Response<Body>, ApiError> {
    let value = HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))?;
    resp.headers_mut().append("Set-Cookie", value);
    Ok(resp)
}

/// Sign in by roster email and start a session
pub async fn signin(state: &AppState, body: &Body) -> Result<Response<Body>, ApiError> {
    tracing::info!("Signin request received");

    let email = required_email(parse_json_body(body)?)?;
    let data = state.datastore.snapshot();
    if data.users.is_empty() {
        return Err(ApiError::NotFound("No users data found".to_string()));
    }

    let user = find_user_by_email(&data.users, &email).ok_or_else(|| {
        tracing::warn!("Signin rejected for unknown email: {}", email);
        ApiError::Authentication("User not found or not authorized".to_string())
    })?;

    let name = resolve_attributed_name(&data.users, &data.submissions, &user.email);
    let (cookie_value, session) = state.sessions.create_session(&user, name, Utc::now());
    tracing::info!(
        "Signed in {} as {:?} (attributed name: {:?})",
        session.email,
        session.role,
        session.attributed_name
    );

    let response = SigninResponse {
        success: true,
        user: SignedInUser {
            email: session.email,
            role: session.role,
            name: session.attributed_name,
            token: session.token,
        },
    };

    let cookie = set_cookie_header(
        &cookie_value,
        state.sessions.ttl().num_seconds(),
        state.config.cookie_secure,
    );
    with_cookie(ok_json(&response)?, cookie)
}

pub async fn signout(state: &AppState, headers: &HeaderMap) -> Result<Response<Body>, ApiError> {
    let cookie = session_cookie(headers);
    state.sessions.destroy_session(cookie.as_deref());

    let resp = ok_json(&serde_json::json!({
        "success": true,
        "message": "Signed out successfully",
    }))?;
    with_cookie(resp, clear_cookie_header(state.config.cookie_secure))
}

/// Report whether the caller's cookie names a live session
pub async fn verify(state: &AppState, headers: &HeaderMap) -> Result<Response<Body>, ApiError> {
    let cookie = session_cookie(headers);
    let (status, body) = match state.sessions.validate_session(cookie.as_deref(), Utc::now()) {
        SessionStatus::Valid(session) => (
            StatusCode::OK,
            VerifyResponse {
                authenticated: true,
                user: Some(SessionUser::from(&session)),
                error: None,
            },
        ),
        SessionStatus::Expired => (
            StatusCode::UNAUTHORIZED,
            VerifyResponse {
                authenticated: false,
                user: None,
                error: Some("Session expired".to_string()),
            },
        ),
        SessionStatus::Missing => (
            StatusCode::UNAUTHORIZED,
            VerifyResponse {
                authenticated: false,
                user: None,
                error: None,
            },
        ),
    };
    json_response(status, &body).map_err(|e| ApiError::Internal(e.to_string()))
}

pub async fn check_email(state: &AppState, body: &Body) -> Result<Response<Body>, ApiError> {
    let email = required_email(parse_json_body(body)?)?;
    let data = state.datastore.snapshot();
    let exists = find_user_by_email(&data.users, &email).is_some();
    ok_json(&serde_json::json!({ "exists": exists }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cookie_headers, state};

    fn email_body(email: &str) -> Body {
        Body::Text(serde_json::json!({ "email": email }).to_string())
    }

    fn json(resp: &Response<Body>) -> serde_json::Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    #[tokio::test]
    async fn test_signin_any_case_returns_stored_role() {
        let state = state();
        for email in ["boss@meti.services", "BOSS@METI.SERVICES", " Boss@Meti.Services "] {
            let resp = signin(&state, &email_body(email)).await.unwrap();
            assert_eq!(resp.status(), 200);
            let body = json(&resp);
            assert_eq!(body["success"], true);
            assert_eq!(body["user"]["role"], "admin");
            assert_eq!(body["user"]["email"], "boss@meti.services");
            assert!(resp.headers()["Set-Cookie"].to_str().unwrap().starts_with("tracker_session="));
        }
    }

    #[tokio::test]
    async fn test_signin_attributes_name() {
        let state = state();
        let resp = signin(&state, &email_body("me116268@meti.services")).await.unwrap();
        let body = json(&resp);
        assert_eq!(body["user"]["role"], "member");
        assert_eq!(body["user"]["name"], "ME116268 Dana");
        assert_eq!(body["user"]["token"].as_str().unwrap().len(), 43);
    }

    #[tokio::test]
    async fn test_signin_failures() {
        let state = state();
        let err = signin(&state, &email_body("ghost@meti.services")).await.unwrap_err();
        assert_eq!(err.status(), 401);

        let err = signin(&state, &Body::Text("{}".into())).await.unwrap_err();
        assert_eq!(err.status(), 400);

        let err = signin(&state, &Body::Text("nonsense".into())).await.unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn test_signin_with_empty_roster_is_not_found() {
        let state = crate::test_support::empty_state();
        let err = signin(&state, &email_body("boss@meti.services")).await.unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn test_verify_and_signout() {
        let state = state();
        let resp = signin(&state, &email_body("me116268@meti.services")).await.unwrap();
        let headers = cookie_headers(&resp);

        let resp = verify(&state, &headers).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body = json(&resp);
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["user"]["name"], "ME116268 Dana");

        let resp = signout(&state, &headers).await.unwrap();
        assert_eq!(json(&resp)["success"], true);
        assert!(resp.headers()["Set-Cookie"].to_str().unwrap().contains("Max-Age=0"));

        let resp = verify(&state, &headers).await.unwrap();
        assert_eq!(resp.status(), 401);
        assert_eq!(json(&resp)["authenticated"], false);

        // signing out twice is harmless
        assert_eq!(signout(&state, &headers).await.unwrap().status(), 200);
    }

    #[tokio::test]
    async fn test_check_email() {
        let state = state();
        let resp = check_email(&state, &email_body("BOSS@meti.services")).await.unwrap();
        assert_eq!(json(&resp)["exists"], true);

        let resp = check_email(&state, &email_body("ghost@meti.services")).await.unwrap();
        assert_eq!(json(&resp)["exists"], false);

        let err = check_email(&state, &Body::Empty).await.unwrap_err();
        assert_eq!(err.status(), 400);

        let empty = crate::test_support::empty_state();
        let resp = check_email(&empty, &email_body("boss@meti.services")).await.unwrap();
        assert_eq!(json(&resp)["exists"], false);
    }
}
