//! Transport DTOs.
//!
//! Identifiers travel as canonical 32-hex strings and are parsed at the edge, so malformed
//! ids surface as `invalid_input` before any core operation runs.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use triage_core::{
    AdmissionRequest, Appointment, AppointmentSlot, Bed, BookingRequest, Discharge,
    PatientIdentity, PatientId, PoolStatus, ProviderId, TemporaryIdentity, TriageError,
    TriageRecord, TriageResult, VitalSigns,
};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    /// Stable machine-readable code, e.g. `no_beds_available`.
    pub code: String,
    pub message: String,
}

impl From<&TriageError> for ErrorRes {
    fn from(err: &TriageError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Emergency admissions
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VitalSignsDto {
    /// `systolic/diastolic`, e.g. `120/80`
    #[serde(default)]
    pub blood_pressure: Option<String>,
    #[serde(default)]
    pub heart_rate: Option<u16>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub oxygen_saturation: Option<u8>,
}

impl From<VitalSignsDto> for VitalSigns {
    fn from(dto: VitalSignsDto) -> Self {
        VitalSigns {
            blood_pressure: dto.blood_pressure,
            heart_rate: dto.heart_rate,
            temperature: dto.temperature,
            oxygen_saturation: dto.oxygen_saturation,
        }
    }
}

impl From<&VitalSigns> for VitalSignsDto {
    fn from(vitals: &VitalSigns) -> Self {
        VitalSignsDto {
            blood_pressure: vitals.blood_pressure.clone(),
            heart_rate: vitals.heart_rate,
            temperature: vitals.temperature,
            oxygen_saturation: vitals.oxygen_saturation,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TemporaryIdentityDto {
    pub name: String,
    pub approximate_age: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AdmitEmergencyReq {
    /// One of `critical`, `urgent`, `less_urgent`, `not_urgent` (staff labels accepted)
    pub urgency: String,
    pub symptoms: String,
    #[serde(default)]
    pub vitals: Option<VitalSignsDto>,
    /// Registry patient id; mutually exclusive with `temporary_identity`
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub temporary_identity: Option<TemporaryIdentityDto>,
}

impl AdmitEmergencyReq {
    pub fn into_request(self) -> TriageResult<AdmissionRequest> {
        let patient_id = self
            .patient_id
            .as_deref()
            .map(PatientId::parse)
            .transpose()?;
        Ok(AdmissionRequest {
            urgency: self.urgency,
            symptoms: self.symptoms,
            vitals: self.vitals.map(VitalSigns::from),
            patient_id,
            temporary_identity: self.temporary_identity.map(|t| TemporaryIdentity {
                name: t.name,
                approximate_age: t.approximate_age,
            }),
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientIdentityRes {
    /// `known` or `unidentified`
    pub kind: String,
    pub patient_id: Option<String>,
    pub temporary_name: Option<String>,
    pub approximate_age: Option<u8>,
}

impl From<&PatientIdentity> for PatientIdentityRes {
    fn from(identity: &PatientIdentity) -> Self {
        match identity {
            PatientIdentity::Known { patient_id } => Self {
                kind: "known".into(),
                patient_id: Some(patient_id.to_string()),
                temporary_name: None,
                approximate_age: None,
            },
            PatientIdentity::Unidentified {
                temporary_name,
                approximate_age,
            } => Self {
                kind: "unidentified".into(),
                patient_id: None,
                temporary_name: Some(temporary_name.to_string()),
                approximate_age: Some(*approximate_age),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TriageRecordRes {
    pub id: String,
    pub patient: PatientIdentityRes,
    pub urgency: String,
    pub urgency_label: String,
    pub display_priority: u8,
    pub target_response_minutes: i64,
    pub respond_by: DateTime<Utc>,
    pub symptoms: String,
    pub vitals: VitalSignsDto,
    pub bed_number: Option<u32>,
    pub bed_floor: Option<i32>,
    pub state: String,
    pub state_label: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every write to the record.
    pub revision: u64,
    pub closed_at: Option<DateTime<Utc>>,
    pub deceased_at: Option<DateTime<Utc>>,
}

impl From<&TriageRecord> for TriageRecordRes {
    fn from(record: &TriageRecord) -> Self {
        Self {
            id: record.id.to_string(),
            patient: PatientIdentityRes::from(&record.patient),
            urgency: record.urgency.slug().into(),
            urgency_label: record.urgency.label().into(),
            display_priority: record.urgency.display_priority(),
            target_response_minutes: record.target_response().num_minutes(),
            respond_by: record.respond_by,
            symptoms: record.symptoms.to_string(),
            vitals: VitalSignsDto::from(&record.vitals),
            bed_number: record.bed.map(|b| b.number),
            bed_floor: record.bed.map(|b| b.floor),
            state: record.state.slug().into(),
            state_label: record.state.label().into(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            revision: record.revision,
            closed_at: record.closed_at,
            deceased_at: record.deceased_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AdmitEmergencyRes {
    pub triage_id: String,
    pub record: TriageRecordRes,
    /// Non-fatal problems, e.g. clinical history could not be linked
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DischargeEmergencyReq {
    /// `de_alta`, `alta_medica` or `fallecido`
    pub target_state: String,
    /// Required when `target_state` is `fallecido`
    #[serde(default)]
    pub deceased_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DischargeEmergencyRes {
    pub record: TriageRecordRes,
    pub released_bed: Option<u32>,
}

impl From<&Discharge> for DischargeEmergencyRes {
    fn from(discharge: &Discharge) -> Self {
        Self {
            record: TriageRecordRes::from(&discharge.record),
            released_bed: discharge.released_bed.map(|b| b.number),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateClinicalStateReq {
    pub state: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WorklistRes {
    pub records: Vec<TriageRecordRes>,
}

// ============================================================================
// Beds
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AvailableBedsRes {
    /// Advisory snapshot; not a reservation
    pub available: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BedRes {
    pub number: u32,
    pub floor: i32,
    /// `available` or `occupied`
    pub state: String,
    pub occupant: Option<String>,
    pub occupied_since: Option<DateTime<Utc>>,
}

impl From<&Bed> for BedRes {
    fn from(bed: &Bed) -> Self {
        Self {
            number: bed.number,
            floor: bed.floor,
            state: match bed.state {
                triage_core::BedState::Available => "available".into(),
                triage_core::BedState::Occupied => "occupied".into(),
            },
            occupant: bed.occupant.map(|id| id.to_string()),
            occupied_since: bed.occupied_since,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BedBoardRes {
    pub total: usize,
    pub available: usize,
    pub occupied: usize,
    pub beds: Vec<BedRes>,
}

impl BedBoardRes {
    pub fn new(status: PoolStatus, beds: &[Bed]) -> Self {
        Self {
            total: status.total,
            available: status.available,
            occupied: status.occupied,
            beds: beds.iter().map(BedRes::from).collect(),
        }
    }
}

// ============================================================================
// Appointments
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ReserveSlotReq {
    pub provider_id: String,
    pub date: NaiveDate,
}

impl ReserveSlotReq {
    pub fn provider(&self) -> TriageResult<ProviderId> {
        Ok(ProviderId::parse(&self.provider_id)?)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AppointmentSlotRes {
    pub provider_id: String,
    pub date: NaiveDate,
    pub confirmed: u32,
    pub daily_max: u32,
    pub remaining: u32,
}

impl From<&AppointmentSlot> for AppointmentSlotRes {
    fn from(slot: &AppointmentSlot) -> Self {
        Self {
            provider_id: slot.provider.to_string(),
            date: slot.date,
            confirmed: slot.confirmed,
            daily_max: slot.daily_max,
            remaining: slot.remaining(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BookAppointmentReq {
    pub provider_id: String,
    pub patient_id: String,
    pub date: NaiveDate,
    /// `HH:MM` or `HH:MM:SS`
    pub time: String,
}

impl BookAppointmentReq {
    pub fn into_request(self) -> TriageResult<BookingRequest> {
        let time = NaiveTime::parse_from_str(&self.time, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&self.time, "%H:%M"))
            .map_err(|_| {
                TriageError::InvalidInput(format!("time must be HH:MM, got '{}'", self.time))
            })?;
        Ok(BookingRequest {
            provider: ProviderId::parse(&self.provider_id)?,
            patient: PatientId::parse(&self.patient_id)?,
            date: self.date,
            time,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AppointmentRes {
    pub id: String,
    pub provider_id: String,
    pub patient_id: String,
    pub date: NaiveDate,
    pub time: String,
    /// `confirmed` or `cancelled`
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Appointment> for AppointmentRes {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id.to_string(),
            provider_id: appointment.provider.to_string(),
            patient_id: appointment.patient.to_string(),
            date: appointment.date,
            time: appointment.time.format("%H:%M").to_string(),
            status: match appointment.status {
                triage_core::AppointmentStatus::Confirmed => "confirmed".into(),
                triage_core::AppointmentStatus::Cancelled => "cancelled".into(),
            },
            created_at: appointment.created_at,
        }
    }
}
