use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::env;

/// Middleware to check for an Authorization header
///
/// When the `AUTHORIZATION` environment variable is set and non-empty, every
/// request must carry an `Authorization` header with that exact value. When
/// it is unset or empty the check is skipped entirely, which is the normal
/// mode behind a campus reverse proxy that already authenticates users.
pub async fn auth_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_secret = match env::var("AUTHORIZATION") {
        Ok(secret) if !secret.is_empty() => secret,
        _ => return Ok(next.run(request).await),
    };

    let presented = headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok());

    if presented != Some(auth_secret.as_str()) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "Unauthorized",
                "message": "Invalid or missing authorization header"
            })),
        )
            .into_response());
    }

    Ok(next.run(request).await)
}
