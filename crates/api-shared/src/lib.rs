//! # API Shared
//!
//! Shared definitions for the triage APIs.
//!
//! Contains:
//! - Request/response DTOs (`dto` module) with OpenAPI schemas
//! - Conversions between DTOs and `triage-core` domain types
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the `triage` CLI.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
