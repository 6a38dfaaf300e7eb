use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, warn};

use crate::server::api_error::ApiError;
use crate::server::dto::{
    CarDto, CarHistoryDto, ClaimRequest, ClaimResponse, InsuranceValidityQuery,
    InsuranceValidityResponse,
};
use crate::server::extract::{AppJson, AppPath, AppQuery};
use crate::server::logging::HealthResponse;
use crate::server::service::CarService;
use crate::server::validation::{parse_date, require};

/// Shared application state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: CarService,
}

/// Result type returned by every handler.
///
/// Extraction failures use the same error envelope as handler errors.
pub type ApiResult<T> = Result<T, ApiError>;

/// `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.service.db();
    let connected = db.ping().await;
    if !connected {
        warn!("Health check: database unreachable");
    }

    Json(HealthResponse::new(connected, db.db_type()))
}

/// `GET /api/cars`
pub async fn list_cars_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<CarDto>>> {
    let cars = state.service.list_cars().await?;
    Ok(Json(cars))
}

/// `GET /api/cars/:car_id/insurance-valid?date=YYYY-MM-DD`
///
/// The date is echoed back exactly as received.
pub async fn insurance_valid_handler(
    State(state): State<AppState>,
    AppPath(car_id): AppPath<i64>,
    AppQuery(query): AppQuery<InsuranceValidityQuery>,
) -> ApiResult<Json<InsuranceValidityResponse>> {
    let raw_date = require(query.date.as_deref(), "date")?;
    let date = parse_date(raw_date, "date")?;

    let valid = state.service.is_insurance_valid(car_id, date).await?;

    Ok(Json(InsuranceValidityResponse {
        car_id,
        date: raw_date.to_string(),
        valid,
    }))
}

/// `POST /api/cars/:car_id/claims`
///
/// Responds `201 Created` with the stored claim.
pub async fn register_claim_handler(
    State(state): State<AppState>,
    AppPath(car_id): AppPath<i64>,
    AppJson(request): AppJson<ClaimRequest>,
) -> ApiResult<(StatusCode, Json<ClaimResponse>)> {
    info!(car_id, claim_date = %request.claim_date, "Registering claim");

    let claim = state.service.register_claim(car_id, request).await?;

    Ok((StatusCode::CREATED, Json(claim)))
}

/// `GET /api/cars/:car_id/history`
pub async fn car_history_handler(
    State(state): State<AppState>,
    AppPath(car_id): AppPath<i64>,
) -> ApiResult<Json<CarHistoryDto>> {
    let history = state.service.get_car_history(car_id).await?;
    Ok(Json(history))
}
