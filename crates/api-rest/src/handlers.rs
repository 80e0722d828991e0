use crate::{ApiError, AppState};
use api_shared::{
    AdmitEmergencyReq, AdmitEmergencyRes, AppointmentRes, AppointmentSlotRes, AvailableBedsRes,
    BedBoardRes, BookAppointmentReq, DischargeEmergencyReq, ErrorRes, DischargeEmergencyRes, HealthRes,
    HealthService, ReserveSlotReq, TriageRecordRes, UpdateClinicalStateReq, VitalSignsDto,
    WorklistRes,
};
use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use triage_core::{AppointmentId, ClinicalState, ProviderId, TriageId};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/emergency/admissions",
    request_body = AdmitEmergencyReq,
    responses(
        (status = 201, description = "Patient admitted and bed assigned", body = AdmitEmergencyRes),
        (status = 400, description = "Invalid urgency, identity, symptoms or vitals", body = ErrorRes),
        (status = 404, description = "Known patient not found in registry", body = ErrorRes),
        (status = 409, description = "No beds available", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Admit an emergency patient
///
/// Classifies urgency, claims a bed and creates a TriageRecord in `en_atencion`.
/// Exhaustion returns `409` with code `no_beds_available`.
#[axum::debug_handler]
pub async fn admit_emergency(
    State(state): State<AppState>,
    Json(req): Json<AdmitEmergencyReq>,
) -> Result<(StatusCode, Json<AdmitEmergencyRes>), ApiError> {
    let admission = state.department.admit_emergency(req.into_request()?)?;
    Ok((
        StatusCode::CREATED,
        Json(AdmitEmergencyRes {
            triage_id: admission.record.id.to_string(),
            record: TriageRecordRes::from(&admission.record),
            warnings: admission.warnings.iter().map(|w| w.to_string()).collect(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/emergency/admissions/{id}",
    params(("id" = String, Path, description = "Triage record id")),
    responses(
        (status = 200, description = "Triage record", body = TriageRecordRes),
        (status = 404, description = "Unknown triage record", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn get_triage_record(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<TriageRecordRes>, ApiError> {
    let record = state.department.record(TriageId::parse(&id)?)?;
    Ok(Json(TriageRecordRes::from(&record)))
}

#[utoipa::path(
    post,
    path = "/emergency/admissions/{id}/discharge",
    params(("id" = String, Path, description = "Triage record id")),
    request_body = DischargeEmergencyReq,
    responses(
        (status = 200, description = "Record closed and bed released", body = DischargeEmergencyRes),
        (status = 400, description = "Missing death date or invalid state", body = ErrorRes),
        (status = 404, description = "Unknown triage record", body = ErrorRes),
        (status = 409, description = "Record already in a terminal state", body = ErrorRes)
    )
)]
/// Discharge an emergency patient
///
/// Moves the record to a terminal state and releases its bed. Safe to retry.
#[axum::debug_handler]
pub async fn discharge_emergency(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<DischargeEmergencyReq>,
) -> Result<Json<DischargeEmergencyRes>, ApiError> {
    let triage_id = TriageId::parse(&id)?;
    let target: ClinicalState = req.target_state.parse()?;
    let discharge = state
        .department
        .discharge_emergency(triage_id, target, req.deceased_at)?;
    Ok(Json(DischargeEmergencyRes::from(&discharge)))
}

#[utoipa::path(
    put,
    path = "/emergency/admissions/{id}/state",
    params(("id" = String, Path, description = "Triage record id")),
    request_body = UpdateClinicalStateReq,
    responses(
        (status = 200, description = "Clinical state updated", body = TriageRecordRes),
        (status = 409, description = "Transition not allowed", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update_clinical_state(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<UpdateClinicalStateReq>,
) -> Result<Json<TriageRecordRes>, ApiError> {
    let target: ClinicalState = req.state.parse()?;
    let record = state
        .department
        .update_clinical_state(TriageId::parse(&id)?, target)?;
    Ok(Json(TriageRecordRes::from(&record)))
}

#[utoipa::path(
    put,
    path = "/emergency/admissions/{id}/vitals",
    params(("id" = String, Path, description = "Triage record id")),
    request_body = VitalSignsDto,
    responses(
        (status = 200, description = "Vital signs merged", body = TriageRecordRes),
        (status = 400, description = "Implausible reading", body = ErrorRes),
        (status = 409, description = "Record already closed", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn update_vitals(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<VitalSignsDto>,
) -> Result<Json<TriageRecordRes>, ApiError> {
    let record = state
        .department
        .update_vitals(TriageId::parse(&id)?, req.into())?;
    Ok(Json(TriageRecordRes::from(&record)))
}

#[utoipa::path(
    get,
    path = "/emergency/worklist",
    responses(
        (status = 200, description = "Active records, most urgent first", body = WorklistRes)
    )
)]
#[axum::debug_handler]
pub async fn worklist(State(state): State<AppState>) -> Result<Json<WorklistRes>, ApiError> {
    let records = state.department.worklist()?;
    Ok(Json(WorklistRes {
        records: records.iter().map(TriageRecordRes::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/emergency/beds",
    responses(
        (status = 200, description = "Every bed with its occupancy", body = BedBoardRes)
    )
)]
#[axum::debug_handler]
pub async fn bed_board(State(state): State<AppState>) -> Result<Json<BedBoardRes>, ApiError> {
    let (status, beds) = state.department.bed_board()?;
    Ok(Json(BedBoardRes::new(status, &beds)))
}

#[utoipa::path(
    get,
    path = "/emergency/beds/available",
    responses(
        (status = 200, description = "Advisory count of available beds", body = AvailableBedsRes)
    )
)]
#[axum::debug_handler]
pub async fn available_beds(
    State(state): State<AppState>,
) -> Result<Json<AvailableBedsRes>, ApiError> {
    Ok(Json(AvailableBedsRes {
        available: state.department.available_bed_count()?,
    }))
}

#[utoipa::path(
    post,
    path = "/appointments/reservations",
    request_body = ReserveSlotReq,
    responses(
        (status = 201, description = "Slot reserved", body = AppointmentSlotRes),
        (status = 409, description = "Provider at daily capacity", body = ErrorRes)
    )
)]
/// Reserve one unit of a provider's daily appointment capacity.
#[axum::debug_handler]
pub async fn reserve_slot(
    State(state): State<AppState>,
    Json(req): Json<ReserveSlotReq>,
) -> Result<(StatusCode, Json<AppointmentSlotRes>), ApiError> {
    let slot = state
        .department
        .reserve_appointment_slot(req.provider()?, req.date)?;
    Ok((StatusCode::CREATED, Json(AppointmentSlotRes::from(&slot))))
}

#[utoipa::path(
    post,
    path = "/appointments",
    request_body = BookAppointmentReq,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentRes),
        (status = 409, description = "Provider at daily capacity", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppState>,
    Json(req): Json<BookAppointmentReq>,
) -> Result<(StatusCode, Json<AppointmentRes>), ApiError> {
    let appointment = state.department.book_appointment(req.into_request()?)?;
    Ok((StatusCode::CREATED, Json(AppointmentRes::from(&appointment))))
}

#[utoipa::path(
    post,
    path = "/appointments/{id}/cancel",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment cancelled, capacity freed", body = AppointmentRes),
        (status = 404, description = "Unknown appointment", body = ErrorRes)
    )
)]
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<AppointmentRes>, ApiError> {
    let appointment = state
        .department
        .cancel_appointment(AppointmentId::parse(&id)?)?;
    Ok(Json(AppointmentRes::from(&appointment)))
}

#[utoipa::path(
    get,
    path = "/providers/{id}/slots/{date}",
    params(
        ("id" = String, Path, description = "Provider id"),
        ("date" = String, Path, description = "Calendar date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Quota usage for the day", body = AppointmentSlotRes)
    )
)]
#[axum::debug_handler]
pub async fn appointment_slot(
    State(state): State<AppState>,
    AxumPath((id, date)): AxumPath<(String, NaiveDate)>,
) -> Result<Json<AppointmentSlotRes>, ApiError> {
    let slot = state
        .department
        .appointment_slot(ProviderId::parse(&id)?, date)?;
    Ok(Json(AppointmentSlotRes::from(&slot)))
}
