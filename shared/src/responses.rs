use lambda_http::{
    http::{HeaderValue, StatusCode},
    Body, Error, Response,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Serialize `value` as the JSON body of a response with `status`
pub fn json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    value: &T,
) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_string(value)?.into())
        .map_err(Box::new)?)
}

/// Same as [`json_response`] with 200, for handlers returning `ApiError`
pub fn ok_json<T: Serialize + ?Sized>(value: &T) -> Result<Response<Body>, ApiError> {
    json_response(StatusCode::OK, value).map_err(|e| ApiError::Internal(e.to_string()))
}

pub fn body_text(body: &Body) -> &str {
    match body {
        Body::Text(text) => text,
        Body::Binary(bytes) => std::str::from_utf8(bytes).unwrap_or(""),
        Body::Empty => "",
    }
}

/// Parse a JSON request body; an empty body reads as `{}`
pub fn parse_json_body<T: DeserializeOwned>(body: &Body) -> Result<T, ApiError> {
    let text = body_text(body).trim();
    let text = if text.is_empty() { "{}" } else { text };
    serde_json::from_str(text).map_err(|e| {
        tracing::error!("Failed to parse request body: {}", e);
        ApiError::from(e)
    })
}

pub fn not_found() -> Result<Response<Body>, Error> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: "NotFound".to_string(),
            message: "Not found".to_string(),
        },
    )
}

pub fn method_not_allowed() -> Result<Response<Body>, Error> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            error: "MethodNotAllowed".to_string(),
            message: "Method not allowed".to_string(),
        },
    )
}

/// Preflight answer for browser clients
pub fn preflight(allowed_origin: &str) -> Result<Response<Body>, Error> {
    let resp = Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Methods", "GET,POST,OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type,Authorization")
        .body(Body::Empty)
        .map_err(Box::new)?;
    Ok(with_cors(resp, allowed_origin))
}

/// Stamp CORS headers on an outgoing response. Credentials are only
/// allowed for an explicit origin.
pub fn with_cors(mut resp: Response<Body>, allowed_origin: &str) -> Response<Body> {
    let headers = resp.headers_mut();
    if let Ok(origin) = allowed_origin.parse::<HeaderValue>() {
        headers.insert("Access-Control-Allow-Origin", origin);
    }
    if allowed_origin != "*" {
        headers.insert(
            "Access-Control-Allow-Credentials",
            HeaderValue::from_static("true"),
        );
    }
    resp
}
