//! API middleware

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{info, warn};

use domain_demurrage::{Customer, CustomerLookup};

use crate::auth::{permissions, require_role, validate_token, Claims, API_TOKEN_HEADER};
use crate::error::ApiError;
use crate::AppState;

/// Customer authentication middleware
///
/// Resolves the `X-Api-Token` header to a customer and stores it in the
/// request extensions.
pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(API_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing X-Api-Token header".to_string()))?;

    let customer = state
        .port
        .find_customer(&CustomerLookup::ApiToken(token.to_string()))
        .await?
        .ok_or_else(|| {
            warn!("Unknown API token presented");
            ApiError::Unauthorized("Invalid X-Api-Token".to_string())
        })?;

    request.extensions_mut().insert(customer);
    Ok(next.run(request).await)
}

/// Administrator authentication middleware
///
/// Requires a bearer JWT granting `invoices:generate` (or `admin`).
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| {
            warn!("Missing or invalid Authorization header");
            ApiError::Forbidden("Invalid admin token".to_string())
        })?;

    let claims = validate_token(token, &state.config.jwt_secret).map_err(|e| {
        warn!(error = %e, "Admin token validation failed");
        ApiError::from(e)
    })?;
    require_role(&claims, permissions::INVOICES_GENERATE)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Request logging middleware
///
/// Logs method, uri, actor, status and duration of every authenticated request.
pub async fn request_log_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let actor = request
        .extensions()
        .get::<Claims>()
        .map(|c| c.sub.clone())
        .or_else(|| request.extensions().get::<Customer>().map(|c| c.code.clone()))
        .unwrap_or_else(|| "anonymous".to_string());

    let start = Utc::now();

    let response = next.run(request).await;

    let duration = Utc::now() - start;
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        actor = %actor,
        status = %status.as_u16(),
        duration_ms = duration.num_milliseconds(),
        "API request"
    );

    response
}
