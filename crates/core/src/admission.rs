//! Emergency admission.
//!
//! An admission classifies urgency, validates the patient identity, claims a bed and then
//! persists a TriageRecord bound to that bed. The bed claim and the record insert behave as
//! one unit: if the insert fails the bed is released again before the error is returned, so
//! a failed admission never strands a bed.
//!
//! Linking a known patient's clinical history is best effort. Its failure is logged and
//! reported as an [`AdmissionWarning`]; the admission itself still succeeds.

use crate::bed_pool::BedPool;
use crate::collaborators::{ClinicalHistoryStore, HistoryEntry, PatientRegistry, TriageRecordStore};
use crate::config::CoreConfig;
use crate::constants::EMERGENCY_HISTORY_DIAGNOSIS;
use crate::triage::{PatientIdentity, TemporaryIdentity, TriageRecord, VitalSigns};
use crate::urgency::UrgencyClassifier;
use crate::{TriageError, TriageResult};
use std::sync::Arc;
use triage_types::{NonEmptyText, PatientId, TriageId};

/// Raw admission input as entered by staff.
#[derive(Clone, Debug, Default)]
pub struct AdmissionRequest {
    pub urgency: String,
    pub symptoms: String,
    pub vitals: Option<VitalSigns>,
    pub patient_id: Option<PatientId>,
    pub temporary_identity: Option<TemporaryIdentity>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdmissionWarning {
    HistoryLinkFailed { patient: PatientId, reason: String },
}

impl std::fmt::Display for AdmissionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionWarning::HistoryLinkFailed { patient, reason } => {
                write!(f, "clinical history for patient {patient} was not updated: {reason}")
            }
        }
    }
}

/// A completed admission.
#[derive(Clone, Debug)]
pub struct Admission {
    pub record: TriageRecord,
    pub warnings: Vec<AdmissionWarning>,
}

#[derive(Clone)]
pub struct AdmissionService {
    cfg: Arc<CoreConfig>,
    classifier: UrgencyClassifier,
    beds: Arc<BedPool>,
    records: Arc<dyn TriageRecordStore>,
    registry: Arc<dyn PatientRegistry>,
    history: Arc<dyn ClinicalHistoryStore>,
}

impl AdmissionService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        beds: Arc<BedPool>,
        records: Arc<dyn TriageRecordStore>,
        registry: Arc<dyn PatientRegistry>,
        history: Arc<dyn ClinicalHistoryStore>,
    ) -> Self {
        Self {
            cfg,
            classifier: UrgencyClassifier::new(),
            beds,
            records,
            registry,
            history,
        }
    }

    /// Admit an emergency patient.
    ///
    /// # Errors
    ///
    /// All input is validated before a bed is claimed:
    /// - [`TriageError::InvalidUrgencyLevel`] - unrecognised urgency
    /// - [`TriageError::AmbiguousPatientIdentity`] - both or neither identity shapes supplied
    /// - [`TriageError::InvalidInput`] - blank symptoms, implausible vitals or temporary identity
    /// - [`TriageError::PatientNotFound`] - the known patient is not in the registry
    ///
    /// Then:
    /// - [`TriageError::NoBedsAvailable`] - the pool is exhausted; no record is created
    /// - any record-store error, after the claimed bed has been released again
    pub fn admit(&self, request: AdmissionRequest) -> TriageResult<Admission> {
        let classification = self.classifier.classify(&request.urgency)?;
        let patient =
            PatientIdentity::from_parts(request.patient_id, request.temporary_identity)?;
        let symptoms = NonEmptyText::new(&request.symptoms)
            .map_err(|_| TriageError::InvalidInput("symptoms cannot be empty".into()))?;
        let vitals = request.vitals.unwrap_or_default();
        vitals.validate()?;

        if let Some(patient_id) = patient.known_patient() {
            if self.registry.find(&patient_id)?.is_none() {
                return Err(TriageError::PatientNotFound(patient_id));
            }
        }

        let triage_id = TriageId::generate();
        let bed = match self.beds.claim(triage_id) {
            Ok(bed) => bed,
            Err(TriageError::NoBedsAvailable) => {
                tracing::info!(urgency = %classification.level, "admission refused, no beds available");
                return Err(TriageError::NoBedsAvailable);
            }
            Err(e) => return Err(e),
        };

        let record = TriageRecord::admit(triage_id, patient, classification, symptoms, vitals, &bed);

        if let Err(insert_error) = self.records.insert(record.clone()) {
            match self.beds.release(bed.number, triage_id) {
                Ok(_) => tracing::warn!(
                    triage_id = %triage_id,
                    bed = bed.number,
                    "record insert failed, bed released: {insert_error}"
                ),
                Err(release_error) => tracing::error!(
                    triage_id = %triage_id,
                    bed = bed.number,
                    "record insert failed ({insert_error}) and bed release also failed: {release_error}"
                ),
            }
            return Err(insert_error);
        }

        let mut warnings = Vec::new();
        if let Some(warning) = self.link_history(&record) {
            warnings.push(warning);
        }

        tracing::info!(
            triage_id = %record.id,
            bed = bed.number,
            urgency = %record.urgency,
            "emergency admitted"
        );

        Ok(Admission { record, warnings })
    }

    fn link_history(&self, record: &TriageRecord) -> Option<AdmissionWarning> {
        let patient = record.patient.known_patient()?;
        let provider = self.cfg.emergency_provider()?;

        let entry = HistoryEntry {
            patient,
            provider,
            triage_id: record.id,
            diagnosis: EMERGENCY_HISTORY_DIAGNOSIS.to_string(),
            notes: format!("[{}] {}", record.urgency.label(), record.symptoms),
            recorded_at: record.created_at,
        };

        match self.history.append(entry) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(triage_id = %record.id, patient = %patient, "clinical history link failed: {e}");
                Some(AdmissionWarning::HistoryLinkFailed {
                    patient,
                    reason: e.to_string(),
                })
            }
        }
    }
}
