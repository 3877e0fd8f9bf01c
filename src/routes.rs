use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers::api::{
    accept_pending, booking_view, connectivity_events, dismiss_notification, dismiss_pending,
    load_slots, login, logout, request_cancel, request_confirm, request_reserve, select_slot,
    AppState,
};
use crate::handlers::health::health_check;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let session_routes = Router::new()
        .route("/sessions", post(login).delete(logout));

    let booking_routes = Router::new()
        .route("/booking", get(booking_view))
        .route("/booking/load", post(load_slots))
        .route("/booking/select", post(select_slot))
        .route("/booking/reserve", post(request_reserve))
        .route("/booking/confirm", post(request_confirm))
        .route("/booking/cancel", post(request_cancel))
        .route("/booking/gate/accept", post(accept_pending))
        .route("/booking/gate/dismiss", post(dismiss_pending))
        .route("/booking/notifications/:id", delete(dismiss_notification));

    Router::new()
        .route("/health", get(health_check))
        .route("/connectivity/events", get(connectivity_events))
        .merge(session_routes)
        .merge(booking_routes)
        .with_state(app_state)
}
