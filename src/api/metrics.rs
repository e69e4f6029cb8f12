//! Prometheus metrics endpoint and HTTP request tracking middleware.
//!
//! This module provides:
//! - A `/metrics` endpoint that returns Prometheus-formatted metrics
//! - Middleware for tracking HTTP request counts and durations
//! - Helper functions to record login, watchlist and catalog metrics

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

use crate::db::{users, watchlist};
use crate::AppState;

// Metric names as constants for consistency
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const LOGINS_TOTAL: &str = "logins_total";
pub const WATCHLIST_ADDS_TOTAL: &str = "watchlist_adds_total";
pub const CATALOG_REQUESTS_TOTAL: &str = "catalog_requests_total";
pub const USERS_TOTAL: &str = "users_total";
pub const WATCHLIST_ENTRIES_TOTAL: &str = "watchlist_entries_total";

/// Initialize the Prometheus metrics recorder and return a handle for rendering metrics.
///
/// This should be called once during application startup.
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    // Register metric descriptions
    describe_counter!(
        HTTP_REQUESTS_TOTAL,
        "Total number of HTTP requests received"
    );
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(
        LOGINS_TOTAL,
        "Total number of login attempts by outcome (success/failure)"
    );
    describe_counter!(
        WATCHLIST_ADDS_TOTAL,
        "Total number of watchlist add attempts by outcome (added/duplicate)"
    );
    describe_counter!(
        CATALOG_REQUESTS_TOTAL,
        "Total number of upstream catalog requests by endpoint and outcome"
    );
    describe_gauge!(USERS_TOTAL, "Total number of registered accounts");
    describe_gauge!(
        WATCHLIST_ENTRIES_TOTAL,
        "Total number of watchlist entries across all users"
    );

    handle
}

/// GET /metrics - Returns Prometheus-formatted metrics.
///
/// This endpoint is accessible without authentication.
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // Update gauge metrics before rendering
    update_gauge_metrics(&state).await;

    // Render metrics in Prometheus text format
    let handle = state.metrics_handle.as_ref();
    match handle {
        Some(h) => (StatusCode::OK, h.render()),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Metrics not initialized".to_string(),
        ),
    }
}

/// Update gauge metrics (users_total, watchlist_entries_total) from current state.
async fn update_gauge_metrics(state: &AppState) {
    if let Ok(count) = users::count(&state.db).await {
        gauge!(USERS_TOTAL).set(count as f64);
    }

    if let Ok(count) = watchlist::count(&state.db).await {
        gauge!(WATCHLIST_ENTRIES_TOTAL).set(count as f64);
    }
}

/// Middleware to track HTTP request metrics.
///
/// Records:
/// - `http_requests_total` counter with method, path, and status labels
/// - `http_request_duration_seconds` histogram with method and path labels
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    // Extract path pattern (use matched path for templates like /movies/:id)
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let method = request.method().to_string();

    // Process the request
    let response = next.run(request).await;

    // Record metrics
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

/// Record a login attempt.
pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(LOGINS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a watchlist add attempt.
pub fn record_watchlist_add(added: bool) {
    let outcome = if added { "added" } else { "duplicate" };
    counter!(WATCHLIST_ADDS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record an upstream catalog request.
pub fn record_catalog_request(endpoint: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(CATALOG_REQUESTS_TOTAL, "endpoint" => endpoint, "outcome" => outcome).increment(1);
}
