//! Seams to the systems the triage core calls into.
//!
//! The patient registry, clinical history, appointment book and TriageRecord persistence are
//! owned elsewhere. The core only depends on these traits; [`crate::memory`] provides
//! in-process implementations.

use crate::triage::TriageRecord;
use crate::TriageResult;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use triage_types::{AppointmentId, PatientId, ProviderId, TriageId};

/// Identity data held by the patient registry. The core never stores or edits it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PatientSummary {
    pub id: PatientId,
    pub national_id: String,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
}

pub trait PatientRegistry: Send + Sync {
    /// `Ok(None)` when the patient is not registered.
    fn find(&self, id: &PatientId) -> TriageResult<Option<PatientSummary>>;
}

/// One append-only clinical history entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub patient: PatientId,
    pub provider: ProviderId,
    pub triage_id: TriageId,
    pub diagnosis: String,
    pub notes: String,
    pub recorded_at: DateTime<Utc>,
}

pub trait ClinicalHistoryStore: Send + Sync {
    fn append(&self, entry: HistoryEntry) -> TriageResult<()>;
}

/// Durable storage for TriageRecords.
pub trait TriageRecordStore: Send + Sync {
    fn insert(&self, record: TriageRecord) -> TriageResult<()>;

    fn get(&self, id: &TriageId) -> TriageResult<Option<TriageRecord>>;

    /// Replace the stored record, but only if its stored revision still equals
    /// `record.revision`. Returns the record as written, with the revision bumped.
    ///
    /// Fails with [`crate::TriageError::RecordConflict`] when another writer got there first,
    /// and with [`crate::TriageError::TriageRecordNotFound`] if the record is missing.
    fn update(&self, record: TriageRecord) -> TriageResult<TriageRecord>;

    fn list_active(&self) -> TriageResult<Vec<TriageRecord>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub provider: ProviderId,
    pub patient: PatientId,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

pub trait AppointmentStore: Send + Sync {
    fn insert(&self, appointment: Appointment) -> TriageResult<()>;

    fn get(&self, id: &AppointmentId) -> TriageResult<Option<Appointment>>;

    /// Conditionally flip a Confirmed appointment to Cancelled.
    ///
    /// Returns the cancelled appointment, or `None` if it was already cancelled. Two
    /// concurrent cancellations of the same appointment see exactly one `Some`.
    fn cancel(&self, id: &AppointmentId) -> TriageResult<Option<Appointment>>;

    fn count_confirmed(&self, provider: &ProviderId, date: NaiveDate) -> TriageResult<u32>;
}
