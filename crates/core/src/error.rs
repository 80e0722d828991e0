use chrono::NaiveDate;
use triage_types::{AppointmentId, PatientId, ProviderId, TriageId, TypesError};

use crate::triage::ClinicalState;

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("no emergency beds available")]
    NoBedsAvailable,
    #[error("provider {provider} has reached its daily maximum of {max} appointments on {date}")]
    CapacityExceeded {
        provider: ProviderId,
        date: NaiveDate,
        max: u32,
    },

    #[error("invalid urgency level: '{0}'")]
    InvalidUrgencyLevel(String),
    #[error("exactly one of a known patient reference or a temporary identity is required")]
    AmbiguousPatientIdentity,
    #[error("a death timestamp is required to record a deceased patient")]
    MissingDeathDate,
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: ClinicalState,
        to: ClinicalState,
    },

    #[error("triage record {0} was changed by another writer")]
    RecordConflict(TriageId),

    #[error("triage record not found: {0}")]
    TriageRecordNotFound(TriageId),
    #[error("patient not found: {0}")]
    PatientNotFound(PatientId),
    #[error("bed not found: {0}")]
    BedNotFound(u32),
    #[error("appointment not found: {0}")]
    AppointmentNotFound(AppointmentId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to read configuration file: {0}")]
    ConfigRead(std::io::Error),
    #[error("shared state lock poisoned")]
    LockPoisoned,
    #[error("external collaborator failed: {0}")]
    Collaborator(String),
}

impl From<TypesError> for TriageError {
    fn from(err: TypesError) -> Self {
        TriageError::InvalidInput(err.to_string())
    }
}

/// Coarse classification of a [`TriageError`], used by callers to decide how to present or
/// retry a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Expected outcome when a scarce resource is used up. Retry later.
    ResourceExhausted,
    /// The caller supplied bad input. Do not retry.
    InvalidInput,
    /// The requested lifecycle move is not allowed, or the record changed underneath the caller.
    InvalidTransition,
    /// A referenced entity does not exist.
    NotFound,
    /// Internal or collaborator fault.
    Fault,
}

impl TriageError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TriageError::NoBedsAvailable | TriageError::CapacityExceeded { .. } => {
                ErrorClass::ResourceExhausted
            }
            TriageError::InvalidUrgencyLevel(_)
            | TriageError::AmbiguousPatientIdentity
            | TriageError::MissingDeathDate
            | TriageError::InvalidInput(_) => ErrorClass::InvalidInput,
            TriageError::InvalidStateTransition { .. } | TriageError::RecordConflict(_) => {
                ErrorClass::InvalidTransition
            }
            TriageError::TriageRecordNotFound(_)
            | TriageError::PatientNotFound(_)
            | TriageError::BedNotFound(_)
            | TriageError::AppointmentNotFound(_) => ErrorClass::NotFound,
            TriageError::InvalidConfig(_)
            | TriageError::ConfigRead(_)
            | TriageError::LockPoisoned
            | TriageError::Collaborator(_) => ErrorClass::Fault,
        }
    }

    /// Stable machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            TriageError::NoBedsAvailable => "no_beds_available",
            TriageError::CapacityExceeded { .. } => "capacity_exceeded",
            TriageError::InvalidUrgencyLevel(_) => "invalid_urgency_level",
            TriageError::AmbiguousPatientIdentity => "ambiguous_patient_identity",
            TriageError::MissingDeathDate => "missing_death_date",
            TriageError::InvalidInput(_) => "invalid_input",
            TriageError::InvalidStateTransition { .. } => "invalid_state_transition",
            TriageError::RecordConflict(_) => "record_conflict",
            TriageError::TriageRecordNotFound(_) => "triage_record_not_found",
            TriageError::PatientNotFound(_) => "patient_not_found",
            TriageError::BedNotFound(_) => "bed_not_found",
            TriageError::AppointmentNotFound(_) => "appointment_not_found",
            TriageError::InvalidConfig(_) | TriageError::ConfigRead(_) => "invalid_config",
            TriageError::LockPoisoned | TriageError::Collaborator(_) => "internal_error",
        }
    }
}

pub type TriageResult<T> = std::result::Result<T, TriageError>;
