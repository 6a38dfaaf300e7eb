//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use car_insurance::server::database::Database;
use car_insurance::server::models::{Car, Claim, InsurancePolicy, NewClaim, NewPolicy};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePoolOptions;

/// Fresh in-memory SQLite database with the schema applied.
///
/// A single long-lived connection keeps the in-memory database alive.
pub async fn setup_test_db() -> Arc<Database> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("failed to create database");

    let db = Database::SQLite(pool);
    db.init_schema().await.expect("failed to create schema");

    Arc::new(db)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(day: NaiveDate, h: u32, min: u32, s: u32) -> NaiveDateTime {
    day.and_hms_opt(h, min, s).unwrap()
}

/// Insert an owner and one car belonging to them.
pub async fn insert_car(db: &Database, vin: &str) -> Car {
    let owner = db
        .insert_owner(&format!("Owner of {vin}"), Some("owner@example.com"))
        .await
        .expect("failed to insert owner");

    db.insert_car(Car {
        id: 0,
        vin: vin.to_string(),
        make: Some("Dacia".to_string()),
        model: Some("Logan".to_string()),
        year_of_manufacture: 2018,
        owner_id: owner.id,
    })
    .await
    .expect("failed to insert car")
}

pub async fn insert_policy(
    db: &Database,
    car_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> InsurancePolicy {
    db.insert_policy(NewPolicy {
        car_id,
        provider: "Allianz".to_string(),
        start_date,
        end_date,
    })
    .await
    .expect("failed to insert policy")
}

pub async fn insert_claim(db: &Database, car_id: i64, claim_date: NaiveDate, amount: i64) -> Claim {
    db.insert_claim(NewClaim {
        car_id,
        claim_date,
        description: Some("Rear bumper".to_string()),
        amount: Decimal::from(amount),
    })
    .await
    .expect("failed to insert claim")
}
