// libs/booking-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn booking_routes(state: AppState) -> Router {
    // Every booking operation requires authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::reserve_at).get(handlers::list_bookings))
        .route("/slots/{slot_id}", post(handlers::reserve_slot))
        .route("/{booking_id}", get(handlers::get_booking))
        .route("/{booking_id}/cancel", post(handlers::cancel_booking))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
