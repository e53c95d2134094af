use chrono::Utc;
use lambda_http::{http::HeaderMap, Body, Response};

use crate::access::{authenticate, authenticate_admin, require_owner_or_admin};
use crate::error::ApiError;
use crate::responses::ok_json;
use crate::AppState;
use crate::datastore::columns;

fn no_data() -> ApiError {
    ApiError::NotFound("No data found".to_string())
}

/// Every submission row (admin only)
pub async fn list_all(state: &AppState, headers: &HeaderMap) -> Result<Response<Body>, ApiError> {
    authenticate_admin(&state.sessions, headers, Utc::now())?;

    let data = state.datastore.snapshot();
    if data.submissions.is_empty() {
        return Err(no_data());
    }
    ok_json(&data.submissions.to_records())
}

/// Rows whose `Name` is exactly `name`; owners and admins only
pub async fn list_by_name(
    state: &AppState,
    headers: &HeaderMap,
    name: &str,
) -> Result<Response<Body>, ApiError> {
    let session = authenticate(&state.sessions, headers, Utc::now())?;
    require_owner_or_admin(&session, name)?;
    list_rows_for(state, name)
}

/// Rows attributed to the caller
pub async fn list_mine(state: &AppState, headers: &HeaderMap) -> Result<Response<Body>, ApiError> {
    let session = authenticate(&state.sessions, headers, Utc::now())?;
    let name = session
        .attributed_name
        .ok_or_else(|| ApiError::Validation("User name not found".to_string()))?;
    list_rows_for(state, &name)
}

fn list_rows_for(state: &AppState, name: &str) -> Result<Response<Body>, ApiError> {
    let data = state.datastore.snapshot();
    if data.submissions.is_empty() {
        return Err(no_data());
    }
    let rows = data.submissions.rows_where_eq(columns::NAME, name);
    tracing::info!("{} submissions found for {:?}", rows.len(), name);
    ok_json(&rows.to_records())
}
