use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware::auth::jwt_auth_middleware;
use crate::store::ResourceStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ResourceStore>,
}

pub fn app(state: AppState) -> Router {
    use handlers::resources;

    Router::new()
        // Resource CRUD, bearer auth required
        .route(
            "/:collection",
            get(resources::list).post(resources::create),
        )
        .route(
            "/:collection/:id",
            get(resources::show)
                .patch(resources::update)
                .delete(resources::destroy),
        )
        .route_layer(middleware::from_fn(jwt_auth_middleware))
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
