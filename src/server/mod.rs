// src/server/mod.rs

//! Server-side components.
//!
//! This module contains:
//! - `database`    → DB abstraction over SQLite/Postgres
//! - `models`      → Row types for owners, cars, policies and claims
//! - `dto`         → HTTP request/response bodies
//! - `service`     → Car and claim queries with validation
//! - `handlers`    → Axum HTTP handlers
//! - `routes`      → Router builder
//! - `api_error`   → Error envelope and status mapping
//! - `extract`     → Json/Path/Query extractors rejecting with the envelope
//! - `logging`     → Tracing setup and request logging middleware
//! - `validation`  → Request validation utilities

pub mod api_error;
pub mod database;
pub mod dto;
pub mod extract;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod routes;
pub mod service;
pub mod validation;

pub use api_error::{ApiError, ErrorCode};
pub use database::{Database, DbScope};
pub use handlers::{
    car_history_handler, health_handler, insurance_valid_handler, list_cars_handler,
    register_claim_handler, AppState,
};
pub use routes::build_router;
pub use service::CarService;
pub use validation::{ValidationError, ValidationResult};
