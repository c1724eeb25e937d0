use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics));

    let api = Router::new()
        // Orders
        .route(
            "/api/orders",
            post(handlers::orders::create).get(handlers::orders::list),
        )
        .route(
            "/api/orders/:id",
            get(handlers::orders::detail).delete(handlers::orders::cancel),
        )
        // Copy trading
        .route(
            "/api/copytrade/subscriptions",
            post(handlers::copytrade::subscribe).get(handlers::copytrade::list),
        )
        .route(
            "/api/copytrade/subscriptions/:wallet",
            delete(handlers::copytrade::unsubscribe).put(handlers::copytrade::update),
        )
        // Snipe allocations
        .route(
            "/api/snipes",
            post(handlers::snipes::create).get(handlers::snipes::list),
        )
        .route("/api/snipes/:id", delete(handlers::snipes::cancel));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
