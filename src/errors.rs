//! Error types shared across the crate.

use thiserror::Error;

/// Errors produced by the data-access layer and the car/claim service.
#[derive(Debug, Error)]
pub enum InsuranceError {
    /// A referenced car does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Input failed validation before anything was written.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("server error: {0}")]
    ServerError(String),
}

pub type InsuranceResult<T> = Result<T, InsuranceError>;

impl InsuranceError {
    /// Not-found error for a car id, with the message clients see.
    pub fn car_not_found(car_id: i64) -> Self {
        InsuranceError::NotFound(format!("Car {car_id} not found"))
    }
}
