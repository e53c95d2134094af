use lambda_http::{http::Method, Body, Error, Request, Response};
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use tracker_shared::{
    auth,
    error::{respond, ApiError},
    reports, submissions,
    responses::{method_not_allowed, not_found, preflight, with_cors},
    users, AppState,
};

/// Main Lambda handler - routes requests to auth, data and analytics endpoints
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    tracing::info!("Tracker API invoked - Method: {} Path: {}", method, path);

    let origin = state.config.allowed_origin.as_str();

    // Handle CORS preflight
    if method == Method::OPTIONS {
        return preflight(origin);
    }

    let resp = route(&event, &state).await?;
    Ok(with_cors(resp, origin))
}

async fn route(event: &Request, state: &AppState) -> Result<Response<Body>, Error> {
    let method = event.method();
    let headers = event.headers();
    let body = event.body();

    // `/api` prefix is optional
    let path = event.uri().path();
    let path = path.strip_prefix("/api").filter(|p| p.is_empty() || p.starts_with('/')).unwrap_or(path);

    let parts: Vec<String> = match path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| percent_decode_str(s).decode_utf8().map(|d| d.into_owned()))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(parts) => parts,
        Err(e) => {
            tracing::warn!("Rejecting path with invalid UTF-8: {} ({})", path, e);
            return respond(Err(ApiError::Validation(
                "Path is not valid UTF-8".to_string(),
            )));
        }
    };
    let parts: Vec<&str> = parts.iter().map(String::as_str).collect();

    match (method, parts.as_slice()) {
        // --- AUTH ---
        (&Method::POST, ["auth", "signin"]) => respond(auth::signin(state, body).await),
        (&Method::POST, ["auth", "signout"]) => respond(auth::signout(state, headers).await),
        (&Method::GET, ["auth", "verify"]) => respond(auth::verify(state, headers).await),
        (&Method::POST, ["auth", "check-email"]) => respond(auth::check_email(state, body).await),

        // --- SUBMISSIONS ---
        (&Method::GET, ["submissions"]) => respond(submissions::list_all(state, headers).await),
        (&Method::GET, ["submissions", "my"]) => {
            respond(submissions::list_mine(state, headers).await)
        }
        (&Method::GET, ["submissions", "user", name]) => {
            respond(submissions::list_by_name(state, headers, name).await)
        }

        // --- USERS ---
        (&Method::GET, ["users"]) => respond(users::list_users(state, headers).await),
        (&Method::POST, ["admin", "reload"]) => respond(users::reload_data(state, headers).await),

        // --- ANALYTICS ---
        (&Method::GET, ["analytics", "summary"]) => respond(reports::summary(state, headers).await),
        (&Method::GET, ["analytics", "my"]) => respond(reports::mine(state, headers).await),
        (&Method::GET, ["analytics", "user", name]) => {
            respond(reports::person(state, headers, name).await)
        }
        (&Method::GET, ["analytics", "charts", "rejection-by-task-type"]) => {
            respond(reports::rejection_by_task_type(state, headers).await)
        }
        (&Method::GET, ["analytics", "charts", "submission-trend"]) => {
            respond(reports::submission_trend(state, headers).await)
        }

        (_, segments) if is_known_path(segments) => method_not_allowed(),
        _ => {
            tracing::warn!("No route matched - Method: {} Path: {}", method, path);
            not_found()
        }
    }
}

fn is_known_path(parts: &[&str]) -> bool {
    matches!(
        parts,
        ["auth", "signin" | "signout" | "verify" | "check-email"]
            | ["submissions"]
            | ["submissions", "my"]
            | ["submissions", "user", _]
            | ["users"]
            | ["admin", "reload"]
            | ["analytics", "summary" | "my"]
            | ["analytics", "user", _]
            | ["analytics", "charts", "rejection-by-task-type" | "submission-trend"]
    )
}
