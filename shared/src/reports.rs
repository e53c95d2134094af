use chrono::Utc;
use lambda_http::{http::HeaderMap, Body, Response};

use crate::access::{authenticate, authenticate_admin, require_owner_or_admin};
use crate::analytics;
use crate::datastore::columns;
use crate::error::ApiError;
use crate::responses::ok_json;
use crate::AppState;

fn no_data() -> ApiError {
    ApiError::NotFound("No data found".to_string())
}

pub async fn summary(state: &AppState, headers: &HeaderMap) -> Result<Response<Body>, ApiError> {
    authenticate_admin(&state.sessions, headers, Utc::now())?;

    let data = state.datastore.snapshot();
    if data.submissions.is_empty() {
        return Err(no_data());
    }
    ok_json(&analytics::summary(&data.submissions))
}

pub async fn person(
    state: &AppState,
    headers: &HeaderMap,
    name: &str,
) -> Result<Response<Body>, ApiError> {
    let session = authenticate(&state.sessions, headers, Utc::now())?;
    require_owner_or_admin(&session, name)?;
    person_report(state, name)
}

pub async fn mine(state: &AppState, headers: &HeaderMap) -> Result<Response<Body>, ApiError> {
    let session = authenticate(&state.sessions, headers, Utc::now())?;
    let name = session
        .attributed_name
        .ok_or_else(|| ApiError::Validation("User name not found".to_string()))?;
    person_report(state, &name)
}

fn person_report(state: &AppState, name: &str) -> Result<Response<Body>, ApiError> {
    let data = state.datastore.snapshot();
    if data.submissions.is_empty() {
        return Err(no_data());
    }

    let rows = data.submissions.rows_where_eq(columns::NAME, name);
    if rows.is_empty() {
        return Err(ApiError::NotFound("No data found for this user".to_string()));
    }
    ok_json(&analytics::person_analytics(&rows))
}

pub async fn rejection_by_task_type(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Response<Body>, ApiError> {
    authenticate_admin(&state.sessions, headers, Utc::now())?;

    let data = state.datastore.snapshot();
    if data.submissions.is_empty() {
        return Err(no_data());
    }
    if !data.submissions.has_column(columns::TASK_TYPE)
        || !data.submissions.has_column(columns::REJECTED)
    {
        return Err(ApiError::NotFound("Required columns not found".to_string()));
    }
    ok_json(&analytics::rejection_by_task_type(&data.submissions))
}

pub async fn submission_trend(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Response<Body>, ApiError> {
    authenticate_admin(&state.sessions, headers, Utc::now())?;

    let data = state.datastore.snapshot();
    if data.submissions.is_empty() {
        return Err(no_data());
    }
    if !data.submissions.has_column(columns::TIMESTAMP) {
        return Err(ApiError::NotFound("Timestamp column not found".to_string()));
    }
    ok_json(&analytics::submission_trend(&data.submissions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::signin;
    use crate::test_support::{cookie_headers, state};
    use std::sync::Arc;

    async fn signed_in(state: &Arc<AppState>, email: &str) -> HeaderMap {
        let body = Body::Text(serde_json::json!({ "email": email }).to_string());
        cookie_headers(&signin(state, &body).await.unwrap())
    }

    fn json(resp: &Response<Body>) -> serde_json::Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    #[tokio::test]
    async fn test_summary() {
        let state = state();
        let admin = signed_in(&state, "boss@meti.services").await;

        let body = json(&summary(&state, &admin).await.unwrap());
        assert_eq!(body["total_submissions"], 4);
        assert_eq!(body["unique_members"], 3);
        assert_eq!(body["accepted_count"], 2);
        assert_eq!(body["rejected_count"], 2);
        assert_eq!(body["changed_count"], 1);
        assert_eq!(body["most_common_mistake"], "Rushed");
        assert_eq!(body["reviewer_with_most_rejected"], "ME116268 Dana");

        let member = signed_in(&state, "alice@meti.services").await;
        assert_eq!(summary(&state, &member).await.unwrap_err().status(), 403);
    }

    #[tokio::test]
    async fn test_my_analytics() {
        let state = state();
        let member = signed_in(&state, "me116268@meti.services").await;

        let body = json(&mine(&state, &member).await.unwrap());
        assert_eq!(body["total_submitted"], 2);
        assert_eq!(body["leader_reviewed"], 1);
        assert_eq!(body["fully_aligned"], 1);
        assert_eq!(body["misaligned"], 1);
        assert_eq!(body["changed_by_leader"], 1);
        assert_eq!(body["last_submission"], "2024-01-01T15:00:00");
        assert_eq!(body["mistake_reasons"]["Rushed"], 1);
    }

    #[tokio::test]
    async fn test_person_analytics_access() {
        let state = state();
        let member = signed_in(&state, "alice@meti.services").await;
        assert_eq!(person(&state, &member, "Alice").await.unwrap().status(), 200);
        assert_eq!(person(&state, &member, "ME116268 Dana").await.unwrap_err().status(), 403);

        let admin = signed_in(&state, "boss@meti.services").await;
        assert_eq!(person(&state, &admin, "ME116268 Dana").await.unwrap().status(), 200);
        assert_eq!(person(&state, &admin, "Nobody").await.unwrap_err().status(), 404);
    }

    #[tokio::test]
    async fn test_charts() {
        let state = state();
        let admin = signed_in(&state, "boss@meti.services").await;

        let body = json(&rejection_by_task_type(&state, &admin).await.unwrap());
        assert_eq!(body[0]["task_type"], "Miner");
        assert_eq!(body[0]["rejection_rate"], 50.0);
        assert_eq!(body[1]["task_type"], "Slice");
        assert_eq!(body[1]["total"], 2);

        let body = json(&submission_trend(&state, &admin).await.unwrap());
        assert_eq!(
            body,
            serde_json::json!([
                {"date": "2024-01-01", "count": 2},
                {"date": "2024-01-02", "count": 1},
            ])
        );
    }
}
