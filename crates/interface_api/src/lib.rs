//! HTTP API Layer
//!
//! REST surface of the onboarding engine using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: submission, documents, status, pre-checks and review
//! - **Middleware**: JWT authentication for reviewer routes, audit logging
//! - **DTOs**: response envelope and request bodies
//! - **Error Handling**: domain errors mapped to status codes with per-field details
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(service, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_onboarding::OnboardingService;

use crate::config::ApiConfig;
use crate::handlers::{health, onboarding};
use crate::middleware::{audit_middleware, auth_middleware, REQUEST_ID_HEADER};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: OnboardingService,
    pub config: ApiConfig,
}

/// Creates the main API router
///
/// Applicant routes are public; status changes and review queues need a
/// bearer token carrying the `onboarding:review` role.
pub fn create_router(service: OnboardingService, config: ApiConfig) -> Router {
    let body_limit = config.max_body_bytes;
    let state = AppState { service, config };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let applicant_routes = Router::new()
        .route("/submit", post(onboarding::submit_application))
        .route("/upload-document", post(onboarding::upload_document))
        .route("/status/:application_id", get(onboarding::get_status))
        .route("/validate-gst", post(onboarding::check_gst_number))
        .route("/validate-pan", post(onboarding::check_pan_number))
        .route("/validate-bank", post(onboarding::verify_bank_account))
        .route("/:application_id", get(onboarding::get_application))
        .route("/:application_id/documents", put(onboarding::supply_documents));

    let review_routes = Router::new()
        .route("/review/queue", get(onboarding::review_queue))
        .route("/:application_id/status", put(onboarding::update_status))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let onboarding_routes = applicant_routes
        .merge(review_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(DefaultBodyLimit::max(body_limit));

    // Layers run bottom-up: the id is set before tracing and audit see the request
    Router::new()
        .merge(public_routes)
        .nest("/api/onboarding", onboarding_routes)
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
