pub mod auth;
mod dashboard;
pub mod error;
pub mod metrics;
mod users;
mod validation;
mod watchlist;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public; session resolution happens inside the handlers)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/me", put(auth::update_me));

    // Catalog browsing and the caller's own watchlist
    let api_routes = Router::new()
        .route("/movies", get(dashboard::dashboard))
        .route("/movies/popular", get(dashboard::browse_popular))
        .route("/movies/search", get(dashboard::search_movies))
        .route("/movies/:id", get(dashboard::movie_detail))
        .route("/watchlist", get(watchlist::list_watchlist))
        .route("/watchlist", post(watchlist::add_to_watchlist))
        .route("/watchlist/:id", delete(watchlist::remove_from_watchlist));

    // Admin routes; each handler runs the admin gate before any work
    let admin_routes = Router::new()
        .route("/users", get(users::admin_overview))
        .route("/users", post(users::create_user))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id", put(users::update_user))
        .route("/users/:id", delete(users::delete_user))
        .route("/users/:id/promote", post(users::promote_user));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_endpoint))
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api", api_routes)
        .layer(middleware::from_fn(metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
