use chrono::Utc;
use lambda_http::{http::HeaderMap, Body, Response};

use crate::access::authenticate_admin;
use crate::error::ApiError;
use crate::responses::ok_json;
use crate::AppState;

/// The whole roster (admin only)
pub async fn list_users(state: &AppState, headers: &HeaderMap) -> Result<Response<Body>, ApiError> {
    authenticate_admin(&state.sessions, headers, Utc::now())?;

    let data = state.datastore.snapshot();
    if data.users.is_empty() {
        return Err(ApiError::NotFound("No users data found".to_string()));
    }
    ok_json(&data.users.to_records())
}

/// Re-read the workbook (admin only)
pub async fn reload_data(state: &AppState, headers: &HeaderMap) -> Result<Response<Body>, ApiError> {
    let session = authenticate_admin(&state.sessions, headers, Utc::now())?;
    tracing::info!("Workbook reload requested by {}", session.email);

    let data = state.datastore.reload();
    ok_json(&serde_json::json!({
        "success": true,
        "users": data.users.len(),
        "submissions": data.submissions.len(),
    }))
}
