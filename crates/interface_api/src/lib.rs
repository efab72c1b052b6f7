//! HTTP API Layer
//!
//! This crate provides the REST API for demurrage invoicing using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: health, invoice listing and batch generation
//! - **Middleware**: customer token and admin JWT authentication, request logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent JSON error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(port, clock, config);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    http::{HeaderName, StatusCode},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use domain_demurrage::{Clock, DemurragePort, InvoiceGenerator};

use crate::config::ApiConfig;
use crate::handlers::{health, invoices};
use crate::middleware::{admin_auth_middleware, customer_auth_middleware, request_log_middleware};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub port: Arc<dyn DemurragePort>,
    pub generator: InvoiceGenerator,
    pub clock: Arc<dyn Clock>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(port: Arc<dyn DemurragePort>, clock: Arc<dyn Clock>, config: ApiConfig) -> Self {
        let generator = InvoiceGenerator::new(port.clone(), clock.clone());
        Self {
            port,
            generator,
            clock,
            config,
        }
    }
}

/// Creates the main API router
///
/// # Routes
///
/// - `GET /health`
/// - `GET /invoices/overdue`, `GET /invoices/:id` (customer `X-Api-Token`)
/// - `POST /invoices/generate` (admin bearer JWT)
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health::health_check));

    let customer_routes = Router::new()
        .route("/invoices/overdue", get(invoices::list_overdue))
        .route("/invoices/:id", get(invoices::get_invoice))
        .layer(axum_middleware::from_fn(request_log_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), customer_auth_middleware));

    let admin_routes = Router::new()
        .route("/invoices/generate", post(invoices::generate))
        .layer(axum_middleware::from_fn(request_log_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), admin_auth_middleware));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(public_routes)
        .merge(customer_routes)
        .merge(admin_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout(),
        ))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
