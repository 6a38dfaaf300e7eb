//! Car and claim queries.
//!
//! Validation happens here, before anything touches the store, so a rejected
//! request never leaves a partial write behind.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::errors::{InsuranceError, InsuranceResult};
use crate::server::database::Database;
use crate::server::dto::{CarDto, CarHistoryDto, CarHistoryEntryDto, ClaimRequest, ClaimResponse};
use crate::server::models::NewClaim;
use crate::server::validation::{validate_amount, validate_claim_date};

#[derive(Clone)]
pub struct CarService {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
}

impl CarService {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// All cars with their owner's name and email.
    pub async fn list_cars(&self) -> InsuranceResult<Vec<CarDto>> {
        let cars = self.db.list_cars().await?;
        Ok(cars.into_iter().map(CarDto::from).collect())
    }

    /// Whether some policy of the car covers `date` (both bounds inclusive).
    pub async fn is_insurance_valid(&self, car_id: i64, date: NaiveDate) -> InsuranceResult<bool> {
        self.ensure_car_exists(car_id).await?;

        let valid = self.db.has_valid_policy(car_id, date).await?;
        debug!("Insurance for car {} on {}: valid={}", car_id, date, valid);

        Ok(valid)
    }

    /// Validate and persist a claim.
    ///
    /// Checks run in order: car existence, claim date, amount.
    pub async fn register_claim(
        &self,
        car_id: i64,
        request: ClaimRequest,
    ) -> InsuranceResult<ClaimResponse> {
        self.ensure_car_exists(car_id).await?;
        validate_claim_date(request.claim_date, self.clock.today())?;
        validate_amount(request.amount)?;

        let claim = self
            .db
            .insert_claim(NewClaim {
                car_id,
                claim_date: request.claim_date,
                description: request.description,
                amount: request.amount,
            })
            .await?;

        info!(
            claim_id = claim.id,
            car_id,
            amount = %claim.amount,
            "Claim registered"
        );

        Ok(ClaimResponse::from(claim))
    }

    /// Policies and claims of a car, newest first.
    ///
    /// Policies are dated by their start date. Entries with equal dates keep
    /// policies ahead of claims.
    pub async fn get_car_history(&self, car_id: i64) -> InsuranceResult<CarHistoryDto> {
        let car = self
            .db
            .get_car(car_id)
            .await?
            .ok_or_else(|| InsuranceError::car_not_found(car_id))?;

        let policies = self.db.policies_for_car(car_id).await?;
        let claims = self.db.claims_for_car(car_id).await?;

        let mut history: Vec<CarHistoryEntryDto> = policies
            .into_iter()
            .map(CarHistoryEntryDto::from)
            .chain(claims.into_iter().map(CarHistoryEntryDto::from))
            .collect();

        // Stable, so ties keep insertion order.
        history.sort_by(|a, b| b.date.cmp(&a.date));

        Ok(CarHistoryDto {
            car_id: car.id,
            vin: car.vin,
            model: car.model,
            year_of_manufacture: car.year_of_manufacture,
            history,
        })
    }

    async fn ensure_car_exists(&self, car_id: i64) -> InsuranceResult<()> {
        if self.db.car_exists(car_id).await? {
            Ok(())
        } else {
            Err(InsuranceError::car_not_found(car_id))
        }
    }
}
