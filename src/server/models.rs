//! Row types for the relational store.
//!
//! These mirror the `owners`, `cars`, `policies` and `claims` tables created by
//! [`Database::init_schema`](crate::server::database::Database::init_schema).

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::errors::InsuranceError;

/// A car owner.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Owner {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

/// A registered car.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Car {
    pub id: i64,
    pub vin: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year_of_manufacture: i32,
    pub owner_id: i64,
}

/// A car joined with its owner's display fields.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CarWithOwner {
    pub id: i64,
    pub vin: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year_of_manufacture: i32,
    pub owner_id: i64,
    pub owner_name: String,
    pub owner_email: Option<String>,
}

/// An insurance policy. Both dates are inclusive and `start_date <= end_date`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct InsurancePolicy {
    pub id: i64,
    pub car_id: i64,
    pub provider: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl InsurancePolicy {
    /// True if `date` falls inside the policy's coverage period.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Fields needed to create a policy; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewPolicy {
    pub car_id: i64,
    pub provider: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// A claim registered against a car.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub id: i64,
    pub car_id: i64,
    pub claim_date: NaiveDate,
    pub description: Option<String>,
    pub amount: Decimal,
}

/// Fields needed to create a claim; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewClaim {
    pub car_id: i64,
    pub claim_date: NaiveDate,
    pub description: Option<String>,
    pub amount: Decimal,
}

/// Raw claim row. Amounts travel as decimal text so both backends read them
/// back without float rounding.
#[derive(Debug, FromRow)]
pub(crate) struct ClaimRow {
    pub id: i64,
    pub car_id: i64,
    pub claim_date: NaiveDate,
    pub description: Option<String>,
    pub amount: String,
}

impl TryFrom<ClaimRow> for Claim {
    type Error = InsuranceError;

    fn try_from(row: ClaimRow) -> Result<Self, Self::Error> {
        let amount = Decimal::from_str(&row.amount).map_err(|e| {
            InsuranceError::DatabaseError(format!(
                "claim {} has unreadable amount '{}': {e}",
                row.id, row.amount
            ))
        })?;

        Ok(Claim {
            id: row.id,
            car_id: row.car_id,
            claim_date: row.claim_date,
            description: row.description,
            amount,
        })
    }
}
