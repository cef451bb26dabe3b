// libs/online-booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::services::registry::DialogRegistry;

pub fn online_booking_routes(registry: Arc<DialogRegistry>) -> Router {
    Router::new()
        .route("/sessions", post(handlers::open_session))
        .route(
            "/sessions/{session_id}",
            get(handlers::get_session).delete(handlers::close_session),
        )
        .route("/sessions/{session_id}/open", post(handlers::reopen_session))
        .route("/sessions/{session_id}/events", post(handlers::submit_event))
        .route("/sessions/{session_id}/confirm", post(handlers::confirm_booking))

        // Payment provider button callbacks
        .route("/sessions/{session_id}/payment/order", post(handlers::create_payment_order))
        .route("/sessions/{session_id}/payment/approve", post(handlers::approve_payment))
        .with_state(registry)
}
