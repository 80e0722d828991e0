//! # API REST
//!
//! REST API for the emergency triage core.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - Mapping core errors to HTTP status codes
//!
//! Uses `api-shared` for DTOs and `triage-core` for every operation.

#![warn(rust_2018_idioms)]

mod error;
mod handlers;

pub use error::ApiError;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use triage_core::EmergencyDepartment;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub department: EmergencyDepartment,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::admit_emergency,
        handlers::get_triage_record,
        handlers::discharge_emergency,
        handlers::update_clinical_state,
        handlers::update_vitals,
        handlers::worklist,
        handlers::bed_board,
        handlers::available_beds,
        handlers::reserve_slot,
        handlers::book_appointment,
        handlers::cancel_appointment,
        handlers::appointment_slot,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ErrorRes,
        api_shared::VitalSignsDto,
        api_shared::TemporaryIdentityDto,
        api_shared::AdmitEmergencyReq,
        api_shared::AdmitEmergencyRes,
        api_shared::PatientIdentityRes,
        api_shared::TriageRecordRes,
        api_shared::DischargeEmergencyReq,
        api_shared::DischargeEmergencyRes,
        api_shared::UpdateClinicalStateReq,
        api_shared::WorklistRes,
        api_shared::AvailableBedsRes,
        api_shared::BedRes,
        api_shared::BedBoardRes,
        api_shared::ReserveSlotReq,
        api_shared::AppointmentSlotRes,
        api_shared::BookAppointmentReq,
        api_shared::AppointmentRes,
    ))
)]
pub struct ApiDoc;

/// Build the application router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/emergency/admissions", post(handlers::admit_emergency))
        .route("/emergency/admissions/:id", get(handlers::get_triage_record))
        .route(
            "/emergency/admissions/:id/discharge",
            post(handlers::discharge_emergency),
        )
        .route(
            "/emergency/admissions/:id/state",
            put(handlers::update_clinical_state),
        )
        .route(
            "/emergency/admissions/:id/vitals",
            put(handlers::update_vitals),
        )
        .route("/emergency/worklist", get(handlers::worklist))
        .route("/emergency/beds", get(handlers::bed_board))
        .route("/emergency/beds/available", get(handlers::available_beds))
        .route("/appointments", post(handlers::book_appointment))
        .route("/appointments/reservations", post(handlers::reserve_slot))
        .route("/appointments/:id/cancel", post(handlers::cancel_appointment))
        .route(
            "/providers/:id/slots/:date",
            get(handlers::appointment_slot),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
