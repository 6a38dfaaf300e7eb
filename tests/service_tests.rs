//! Integration tests for the car and claim service.

#![cfg(all(feature = "server", feature = "sqlite"))]

mod common;

use std::sync::Arc;

use car_insurance::clock::{Clock, FixedClock};
use car_insurance::errors::InsuranceError;
use car_insurance::server::database::Database;
use car_insurance::server::dto::{ClaimRequest, HistoryEntryType};
use car_insurance::server::CarService;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use common::{at, date, insert_car, insert_claim, insert_policy, setup_test_db};

fn today() -> NaiveDate {
    date(2025, 8, 29)
}

async fn setup_service() -> (CarService, Arc<Database>) {
    let db = setup_test_db().await;
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(at(today(), 12, 0, 0)));
    (CarService::new(Arc::clone(&db), clock), db)
}

fn claim(claim_date: NaiveDate, amount: Decimal) -> ClaimRequest {
    ClaimRequest {
        claim_date,
        description: Some("Scratched door".to_string()),
        amount,
    }
}

#[tokio::test]
async fn list_cars_includes_owner_fields() {
    let (service, db) = setup_service().await;
    let car = insert_car(&db, "VIN12345").await;

    let cars = service.list_cars().await.unwrap();

    assert_eq!(cars.len(), 1);
    assert_eq!(cars[0].id, car.id);
    assert_eq!(cars[0].vin, "VIN12345");
    assert_eq!(cars[0].year, 2018);
    assert_eq!(cars[0].owner_name, "Owner of VIN12345");
}

#[tokio::test]
async fn list_cars_on_empty_store() {
    let (service, _db) = setup_service().await;
    assert!(service.list_cars().await.unwrap().is_empty());
}

#[tokio::test]
async fn insurance_validity_for_unknown_car_is_not_found() {
    let (service, _db) = setup_service().await;

    let err = service
        .is_insurance_valid(999, date(2025, 1, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, InsuranceError::NotFound(m) if m == "Car 999 not found"));
}

#[tokio::test]
async fn insurance_validity_uses_inclusive_bounds() {
    let (service, db) = setup_service().await;
    let car = insert_car(&db, "VIN12345").await;
    insert_policy(&db, car.id, date(2025, 1, 1), date(2025, 12, 31)).await;

    assert!(service.is_insurance_valid(car.id, date(2025, 1, 1)).await.unwrap());
    assert!(service.is_insurance_valid(car.id, date(2025, 12, 31)).await.unwrap());
    assert!(!service.is_insurance_valid(car.id, date(2026, 1, 1)).await.unwrap());
}

#[tokio::test]
async fn car_without_policies_is_not_insured() {
    let (service, db) = setup_service().await;
    let car = insert_car(&db, "VIN12345").await;

    assert!(!service.is_insurance_valid(car.id, today()).await.unwrap());
}

#[tokio::test]
async fn register_claim_persists_and_returns_claim() {
    let (service, db) = setup_service().await;
    let car = insert_car(&db, "VIN12345").await;

    let response = service
        .register_claim(car.id, claim(date(2025, 8, 1), Decimal::new(125075, 2)))
        .await
        .unwrap();

    assert!(response.id > 0);
    assert_eq!(response.claim_date, date(2025, 8, 1));
    assert_eq!(response.amount, Decimal::new(125075, 2));
    assert_eq!(response.description.as_deref(), Some("Scratched door"));

    let stored = db.claims_for_car(car.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, response.id);
}

#[tokio::test]
async fn claim_dated_today_is_accepted() {
    let (service, db) = setup_service().await;
    let car = insert_car(&db, "VIN12345").await;

    assert!(service
        .register_claim(car.id, claim(today(), Decimal::from(10)))
        .await
        .is_ok());
}

#[tokio::test]
async fn claim_in_future_is_rejected() {
    let (service, db) = setup_service().await;
    let car = insert_car(&db, "VIN12345").await;

    let err = service
        .register_claim(car.id, claim(date(2025, 8, 30), Decimal::from(10)))
        .await
        .unwrap_err();

    assert!(
        matches!(err, InsuranceError::InvalidArgument(m) if m == "Claim date cannot be in the future")
    );
    assert!(db.claims_for_car(car.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn non_positive_amount_is_rejected() {
    let (service, db) = setup_service().await;
    let car = insert_car(&db, "VIN12345").await;

    for amount in [Decimal::ZERO, Decimal::from(-5)] {
        let err = service
            .register_claim(car.id, claim(date(2025, 8, 1), amount))
            .await
            .unwrap_err();
        assert!(
            matches!(err, InsuranceError::InvalidArgument(m) if m == "Amount cannot be 0 or negative")
        );
    }

    assert!(db.claims_for_car(car.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_car_is_checked_before_claim_fields() {
    let (service, _db) = setup_service().await;

    // Both the date and the amount are invalid too.
    let err = service
        .register_claim(42, claim(date(2030, 1, 1), Decimal::ZERO))
        .await
        .unwrap_err();

    assert!(matches!(err, InsuranceError::NotFound(_)));
}

#[tokio::test]
async fn claim_date_is_checked_before_amount() {
    let (service, db) = setup_service().await;
    let car = insert_car(&db, "VIN12345").await;

    let err = service
        .register_claim(car.id, claim(date(2030, 1, 1), Decimal::ZERO))
        .await
        .unwrap_err();

    assert!(matches!(err, InsuranceError::InvalidArgument(m) if m.contains("future")));
}

#[tokio::test]
async fn history_for_unknown_car_is_not_found() {
    let (service, _db) = setup_service().await;

    let err = service.get_car_history(7).await.unwrap_err();

    assert!(matches!(err, InsuranceError::NotFound(m) if m == "Car 7 not found"));
}

#[tokio::test]
async fn history_is_newest_first() {
    let (service, db) = setup_service().await;
    let car = insert_car(&db, "VIN12345").await;

    let old_policy = insert_policy(&db, car.id, date(2024, 1, 1), date(2024, 12, 31)).await;
    let new_policy = insert_policy(&db, car.id, date(2025, 1, 1), date(2025, 12, 31)).await;
    let old_claim = insert_claim(&db, car.id, date(2024, 6, 1), 300).await;
    let new_claim = insert_claim(&db, car.id, date(2025, 7, 15), 800).await;

    let history = service.get_car_history(car.id).await.unwrap();

    assert_eq!(history.car_id, car.id);
    assert_eq!(history.vin, "VIN12345");
    assert_eq!(history.model.as_deref(), Some("Logan"));
    assert_eq!(history.year_of_manufacture, 2018);

    let entries: Vec<(HistoryEntryType, i64)> = history
        .history
        .iter()
        .map(|e| (e.entry_type, e.id))
        .collect();
    assert_eq!(
        entries,
        vec![
            (HistoryEntryType::Claim, new_claim.id),
            (HistoryEntryType::Policy, new_policy.id),
            (HistoryEntryType::Claim, old_claim.id),
            (HistoryEntryType::Policy, old_policy.id),
        ]
    );

    let policy_entry = &history.history[1];
    assert_eq!(policy_entry.date, date(2025, 1, 1));
    assert_eq!(policy_entry.end_date, Some(date(2025, 12, 31)));
    assert_eq!(policy_entry.provider.as_deref(), Some("Allianz"));
    assert!(policy_entry.amount.is_none());

    let claim_entry = &history.history[0];
    assert_eq!(claim_entry.amount, Some(Decimal::from(800)));
    assert!(claim_entry.provider.is_none());
}

#[tokio::test]
async fn history_ties_keep_policies_first() {
    let (service, db) = setup_service().await;
    let car = insert_car(&db, "VIN12345").await;

    let claim = insert_claim(&db, car.id, date(2025, 1, 1), 50).await;
    let policy = insert_policy(&db, car.id, date(2025, 1, 1), date(2025, 12, 31)).await;

    let history = service.get_car_history(car.id).await.unwrap();
    let ids: Vec<(HistoryEntryType, i64)> = history
        .history
        .iter()
        .map(|e| (e.entry_type, e.id))
        .collect();

    assert_eq!(
        ids,
        vec![
            (HistoryEntryType::Policy, policy.id),
            (HistoryEntryType::Claim, claim.id),
        ]
    );
}

#[tokio::test]
async fn history_of_car_without_records_is_empty() {
    let (service, db) = setup_service().await;
    let car = insert_car(&db, "VIN12345").await;

    let history = service.get_car_history(car.id).await.unwrap();

    assert!(history.history.is_empty());
}
