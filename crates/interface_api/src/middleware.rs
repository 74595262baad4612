//! Request middleware: reviewer authentication and the audit log

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderName, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{info, warn};

use crate::auth::{validate_token, Claims};
use crate::error::ApiError;
use crate::AppState;

/// Header carrying the per-request id set by the router
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Rejects requests without a valid reviewer token
///
/// The claims are added to the request extensions; role checks happen in
/// the handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request) else {
        warn!(uri = %request.uri(), "Review request without bearer token");
        return ApiError::Unauthorized.into_response();
    };

    match validate_token(token, &state.config.jwt_secret) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            warn!(uri = %request.uri(), error = %e, "Bearer token rejected");
            ApiError::Unauthorized.into_response()
        }
    }
}

/// Logs one line per onboarding request
///
/// The user is the subject of a valid bearer token, `anonymous` otherwise.
pub async fn audit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let user = request
        .extensions()
        .get::<Claims>()
        .map(|c| c.sub.clone())
        .or_else(|| {
            bearer_token(&request)
                .and_then(|token| validate_token(token, &state.config.jwt_secret).ok())
                .map(|claims| claims.sub)
        })
        .unwrap_or_else(|| "anonymous".to_string());

    let started = Instant::now();
    let response = next.run(request).await;

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        user = %user,
        status = response.status().as_u16(),
        duration_ms = started.elapsed().as_millis() as u64,
        "API request"
    );

    response
}
