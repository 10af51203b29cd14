// libs/availability-cell/src/router.rs
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn availability_routes(state: AppState) -> Router {
    // Browsing published availability is public
    let public_routes = Router::new()
        .route("/doctors/{doctor_id}/windows", get(handlers::list_windows))
        .route("/doctors/{doctor_id}/slots", get(handlers::list_slots));

    let protected_routes = Router::new()
        .route("/", post(handlers::create_availability))
        .route("/windows/{window_id}", delete(handlers::withdraw_window))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
