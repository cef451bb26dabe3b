use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::get,
};

use online_booking_cell::router::online_booking_routes;
use online_booking_cell::services::DialogRegistry;
use shared_config::AppConfig;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub fn create_router(config: Arc<AppConfig>) -> Router {
    let registry = Arc::new(DialogRegistry::new(&config));
    registry.spawn_sweeper(SESSION_SWEEP_INTERVAL);

    Router::new()
        .route("/", get(|| async { "Booking chat API is running!" }))
        .nest("/booking", online_booking_routes(registry))
}
