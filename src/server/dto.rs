//! Request and response bodies for the HTTP API.
//!
//! All bodies use camelCase field names.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::server::models::{CarWithOwner, Claim, InsurancePolicy};

/// A car with its owner's display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarDto {
    pub id: i64,
    pub vin: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: i32,
    pub owner_id: i64,
    pub owner_name: String,
    pub owner_email: Option<String>,
}

impl From<CarWithOwner> for CarDto {
    fn from(car: CarWithOwner) -> Self {
        Self {
            id: car.id,
            vin: car.vin,
            make: car.make,
            model: car.model,
            year: car.year_of_manufacture,
            owner_id: car.owner_id,
            owner_name: car.owner_name,
            owner_email: car.owner_email,
        }
    }
}

/// Query string of the insurance validity check.
#[derive(Debug, Clone, Deserialize)]
pub struct InsuranceValidityQuery {
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceValidityResponse {
    pub car_id: i64,
    pub date: String,
    pub valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub claim_date: NaiveDate,
    pub description: Option<String>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub id: i64,
    pub claim_date: NaiveDate,
    pub description: Option<String>,
    pub amount: Decimal,
}

impl From<Claim> for ClaimResponse {
    fn from(claim: Claim) -> Self {
        Self {
            id: claim.id,
            claim_date: claim.claim_date,
            description: claim.description,
            amount: claim.amount,
        }
    }
}

/// Kind of a car history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryEntryType {
    Policy,
    Claim,
}

/// One entry of a car's history.
///
/// Policy entries carry `provider` and `endDate` and are dated by their start
/// date; claim entries carry `description` and `amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarHistoryEntryDto {
    pub id: i64,
    #[serde(rename = "type")]
    pub entry_type: HistoryEntryType,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub provider: Option<String>,
    pub end_date: Option<NaiveDate>,
}

impl From<InsurancePolicy> for CarHistoryEntryDto {
    fn from(policy: InsurancePolicy) -> Self {
        Self {
            id: policy.id,
            entry_type: HistoryEntryType::Policy,
            date: policy.start_date,
            description: None,
            amount: None,
            provider: Some(policy.provider),
            end_date: Some(policy.end_date),
        }
    }
}

impl From<Claim> for CarHistoryEntryDto {
    fn from(claim: Claim) -> Self {
        Self {
            id: claim.id,
            entry_type: HistoryEntryType::Claim,
            date: claim.claim_date,
            description: claim.description,
            amount: Some(claim.amount),
            provider: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarHistoryDto {
    pub car_id: i64,
    pub vin: String,
    pub model: Option<String>,
    pub year_of_manufacture: i32,
    pub history: Vec<CarHistoryEntryDto>,
}
