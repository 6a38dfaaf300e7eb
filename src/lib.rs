//! Car insurance record keeping service.
//!
//! Tracks cars, owners, insurance policies and claims behind a small HTTP API,
//! and runs a background notifier that logs policies as they expire.
//!
//! # Features
//!
//! - `server` - HTTP handlers and the database layer. Enabled by default.
//! - `sqlite` - SQLite database backend. Enabled by default.
//! - `postgres` - PostgreSQL database backend.
//! - `background-jobs` - Policy expiration notifier. Enabled by default.
//!
//! # Example
//!
//! ```toml
//! # Use defaults (server + sqlite + background jobs)
//! car-insurance = { path = "." }
//!
//! # Server with PostgreSQL
//! car-insurance = { path = ".", features = ["server", "postgres", "background-jobs"] }
//! ```

// Core modules (always available)
pub mod clock;
pub mod config;
pub mod errors;

// Server-related modules (requires "server" feature)
#[cfg(feature = "server")]
#[path = "server/mod.rs"]
pub mod server;

// Background jobs (requires "background-jobs" feature)
#[cfg(feature = "background-jobs")]
pub mod jobs;
