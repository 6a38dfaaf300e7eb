use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::handlers::{
    car_history_handler, health_handler, insurance_valid_handler, list_cars_handler,
    register_claim_handler, AppState,
};
use crate::server::logging::request_logging_middleware;

/// Build the application router.
///
/// # Routes
///
/// - `GET /health` - Service and database status
/// - `GET /api/cars` - List cars with owner details
/// - `GET /api/cars/:car_id/insurance-valid?date=YYYY-MM-DD` - Check coverage on a date
/// - `POST /api/cars/:car_id/claims` - Register a claim
/// - `GET /api/cars/:car_id/history` - Policies and claims, newest first
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/cars", get(list_cars_handler))
        .route(
            "/api/cars/:car_id/insurance-valid",
            get(insurance_valid_handler),
        )
        .route("/api/cars/:car_id/claims", post(register_claim_handler))
        .route("/api/cars/:car_id/history", get(car_history_handler))
        .layer(middleware::from_fn(request_logging_middleware))
        .with_state(state)
}
