pub mod assets;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;

use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use db::DbPool;
use tower_http::cors::CorsLayer;

use crate::auth::TokenIssuer;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub tokens: Arc<TokenIssuer>,
    pub base_path: Arc<String>,
}

pub fn create_app(state: AppState) -> Router {
    let base_path = state.base_path.clone();

    let app_routes = Router::new()
        .route("/", get(handlers::web::index))
        .route("/login", get(handlers::web::index))
        .route("/register", get(handlers::web::index))
        .route("/static/{*path}", get(handlers::web::static_file))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/tasks", get(handlers::api::list_user_tasks))
        .route("/api/tasks", post(handlers::api::create_new_task))
        .route("/api/tasks/{id}", put(handlers::api::update_existing_task))
        .route("/api/tasks/{id}", patch(handlers::api::update_existing_task))
        .route(
            "/api/tasks/{id}",
            delete(handlers::api::delete_existing_task),
        )
        .layer(
            tower::ServiceBuilder::new()
                .layer(tower_http::trace::TraceLayer::new_for_http())
                .layer(tower_http::compression::CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    tracing::info!("base_path: {base_path:?}");

    if base_path.is_empty() {
        app_routes
    } else {
        Router::new().nest(&*base_path, app_routes)
    }
}
