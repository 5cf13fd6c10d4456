// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        admin::admin_handler,
        orders::orders_handler,
        payments::{payments_handler, payments_public_handler},
        wallet::wallet_handler,
    },
    middleware::{admin_only, auth},
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // The webhook stays public; its authentication is the body signature.
    let payment_routes = Router::new()
        .merge(payments_handler().layer(middleware::from_fn(auth)))
        .merge(payments_public_handler());

    let api_route = Router::new()
        .nest("/payments", payment_routes)
        .nest("/orders", orders_handler().layer(middleware::from_fn(auth)))
        .nest("/wallet", wallet_handler().layer(middleware::from_fn(auth)))
        .nest(
            "/admin",
            admin_handler()
                .layer(middleware::from_fn(admin_only))
                .layer(middleware::from_fn(auth)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}
