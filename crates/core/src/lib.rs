//! # Triage Core
//!
//! Emergency admission, bed allocation and appointment capacity for the patient portal.
//!
//! This crate contains the pure domain logic:
//! - Urgency classification with response-time targets
//! - A fixed pool of emergency beds with atomic claim/release
//! - The TriageRecord lifecycle from admission to discharge or death
//! - Per-provider daily appointment quotas
//!
//! **No API concerns**: HTTP servers, request DTOs and authentication belong in `api-rest` and
//! `api-shared`. The patient registry, clinical history, appointment book and record
//! persistence are reached through the traits in [`collaborators`].

pub mod admission;
pub mod bed_pool;
pub mod capacity;
pub mod collaborators;
pub mod config;
pub mod constants;
pub mod department;
pub mod discharge;
pub mod error;
pub mod memory;
pub mod triage;
pub mod urgency;

pub use admission::{Admission, AdmissionRequest, AdmissionWarning};
pub use bed_pool::{Bed, BedAssignment, BedPool, BedState, PoolStatus, ReleaseOutcome};
pub use capacity::{AppointmentCapacityGuard, AppointmentSlot, BookingRequest};
pub use collaborators::{Appointment, AppointmentStatus};
pub use config::{ConfigSources, CoreConfig};
pub use department::{Collaborators, EmergencyDepartment};
pub use discharge::Discharge;
pub use error::{ErrorClass, TriageError, TriageResult};
pub use triage::{
    BedRef, ClinicalState, PatientIdentity, TemporaryIdentity, TriageRecord, VitalSigns,
};
pub use urgency::{Classification, UrgencyClassifier, UrgencyLevel};

pub use triage_types::{AppointmentId, NonEmptyText, PatientId, ProviderId, TriageId, TypesError};
