//! Emergency department facade.
//!
//! Wires the bed pool, admission, discharge and appointment guard over one set of
//! collaborators and exposes the operations callers use. Cheap to clone; every clone shares
//! the same bed pool and counters.

use crate::admission::{Admission, AdmissionRequest, AdmissionService};
use crate::bed_pool::{Bed, BedPool, PoolStatus};
use crate::capacity::{AppointmentCapacityGuard, AppointmentSlot, BookingRequest};
use crate::collaborators::{
    Appointment, AppointmentStore, ClinicalHistoryStore, PatientRegistry, TriageRecordStore,
};
use crate::config::CoreConfig;
use crate::constants::RECORD_WRITE_ATTEMPTS;
use crate::discharge::{Discharge, DischargeService};
use crate::memory::{
    InMemoryAppointmentStore, InMemoryClinicalHistory, InMemoryPatientRegistry,
    InMemoryTriageRecordStore,
};
use crate::triage::{ClinicalState, TriageRecord, VitalSigns};
use crate::{TriageError, TriageResult};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use triage_types::{AppointmentId, ProviderId, TriageId};

/// External systems the department depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub registry: Arc<dyn PatientRegistry>,
    pub history: Arc<dyn ClinicalHistoryStore>,
    pub records: Arc<dyn TriageRecordStore>,
    pub appointments: Arc<dyn AppointmentStore>,
}

impl Collaborators {
    pub fn in_memory() -> Self {
        Self {
            registry: Arc::new(InMemoryPatientRegistry::new()),
            history: Arc::new(InMemoryClinicalHistory::new()),
            records: Arc::new(InMemoryTriageRecordStore::new()),
            appointments: Arc::new(InMemoryAppointmentStore::new()),
        }
    }
}

#[derive(Clone)]
pub struct EmergencyDepartment {
    cfg: Arc<CoreConfig>,
    beds: Arc<BedPool>,
    records: Arc<dyn TriageRecordStore>,
    admissions: AdmissionService,
    discharges: DischargeService,
    appointments: Arc<AppointmentCapacityGuard>,
}

impl EmergencyDepartment {
    pub fn new(cfg: Arc<CoreConfig>, collaborators: Collaborators) -> Self {
        let beds = Arc::new(BedPool::from_config(&cfg));
        let admissions = AdmissionService::new(
            cfg.clone(),
            beds.clone(),
            collaborators.records.clone(),
            collaborators.registry,
            collaborators.history,
        );
        let discharges = DischargeService::new(beds.clone(), collaborators.records.clone());
        let appointments = Arc::new(AppointmentCapacityGuard::new(
            cfg.clone(),
            collaborators.appointments,
        ));

        Self {
            cfg,
            beds,
            records: collaborators.records,
            admissions,
            discharges,
            appointments,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    // ------------------------------------------------------------------
    // Emergency beds
    // ------------------------------------------------------------------

    pub fn admit_emergency(&self, request: AdmissionRequest) -> TriageResult<Admission> {
        self.admissions.admit(request)
    }

    pub fn discharge_emergency(
        &self,
        triage_id: TriageId,
        target: ClinicalState,
        deceased_at: Option<DateTime<Utc>>,
    ) -> TriageResult<Discharge> {
        self.discharges.discharge(triage_id, target, deceased_at)
    }

    /// Advisory only; see [`BedPool::count_available`].
    pub fn available_bed_count(&self) -> TriageResult<usize> {
        self.beds.count_available()
    }

    pub fn bed_board(&self) -> TriageResult<(PoolStatus, Vec<Bed>)> {
        Ok((self.beds.status()?, self.beds.snapshot()?))
    }

    pub fn record(&self, triage_id: TriageId) -> TriageResult<TriageRecord> {
        self.records
            .get(&triage_id)?
            .ok_or(TriageError::TriageRecordNotFound(triage_id))
    }

    /// Active records, most urgent first, oldest first within an urgency level.
    pub fn worklist(&self) -> TriageResult<Vec<TriageRecord>> {
        let mut active = self.records.list_active()?;
        active.sort_by_key(|r| (r.urgency.display_priority(), r.created_at));
        Ok(active)
    }

    /// Non-terminal clinical progress. Terminal states go through
    /// [`EmergencyDepartment::discharge_emergency`].
    pub fn update_clinical_state(
        &self,
        triage_id: TriageId,
        target: ClinicalState,
    ) -> TriageResult<TriageRecord> {
        let updated = self.modify_record(triage_id, |record| record.progress(target, Utc::now()))?;
        tracing::info!(triage_id = %triage_id, to = %target, "clinical state updated");
        Ok(updated)
    }

    pub fn update_vitals(&self, triage_id: TriageId, vitals: VitalSigns) -> TriageResult<TriageRecord> {
        self.modify_record(triage_id, |record| record.update_vitals(vitals.clone(), Utc::now()))
    }

    /// Read, apply and write back, starting over from a fresh read whenever another writer
    /// changed the record in between.
    fn modify_record(
        &self,
        triage_id: TriageId,
        mut apply: impl FnMut(&mut TriageRecord) -> TriageResult<()>,
    ) -> TriageResult<TriageRecord> {
        for _ in 0..RECORD_WRITE_ATTEMPTS {
            let mut record = self.record(triage_id)?;
            apply(&mut record)?;
            match self.records.update(record) {
                Err(TriageError::RecordConflict(_)) => {
                    tracing::debug!(triage_id = %triage_id, "record changed underneath, retrying");
                }
                written => return written,
            }
        }
        Err(TriageError::RecordConflict(triage_id))
    }

    // ------------------------------------------------------------------
    // Appointments
    // ------------------------------------------------------------------

    pub fn reserve_appointment_slot(
        &self,
        provider: ProviderId,
        date: NaiveDate,
    ) -> TriageResult<AppointmentSlot> {
        self.appointments.try_reserve(provider, date)
    }

    pub fn book_appointment(&self, request: BookingRequest) -> TriageResult<Appointment> {
        self.appointments.book(request)
    }

    pub fn cancel_appointment(&self, id: AppointmentId) -> TriageResult<Appointment> {
        self.appointments.cancel(id)
    }

    pub fn appointment_slot(
        &self,
        provider: ProviderId,
        date: NaiveDate,
    ) -> TriageResult<AppointmentSlot> {
        self.appointments.current(provider, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::testing::InterferingRecords;
    use crate::triage::TemporaryIdentity;

    fn department(bed_count: u32) -> EmergencyDepartment {
        let cfg = Arc::new(CoreConfig::with_bed_count(bed_count).expect("cfg"));
        EmergencyDepartment::new(cfg, Collaborators::in_memory())
    }

    fn unidentified(urgency: &str) -> AdmissionRequest {
        AdmissionRequest {
            urgency: urgency.into(),
            symptoms: "abdominal pain".into(),
            temporary_identity: Some(TemporaryIdentity {
                name: "Unknown".into(),
                approximate_age: 45,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_admit_then_discharge_restores_available_count() {
        let dept = department(20);
        let admitted = dept.admit_emergency(unidentified("urgent")).expect("admit");
        assert_eq!(dept.available_bed_count().expect("count"), 19);

        let bed = admitted.record.bed.expect("bed").number;
        dept.discharge_emergency(admitted.record.id, ClinicalState::DeAlta, None)
            .expect("discharge");
        assert_eq!(dept.available_bed_count().expect("count"), 20);

        let (_, beds) = dept.bed_board().expect("board");
        assert!(beds.iter().any(|b| b.number == bed && b.occupant.is_none()));
    }

    #[test]
    fn test_exhaustion_leaves_no_record() {
        let dept = department(1);
        dept.admit_emergency(unidentified("critical")).expect("first");
        let err = dept
            .admit_emergency(unidentified("critical"))
            .expect_err("exhausted");
        assert!(matches!(err, TriageError::NoBedsAvailable));
        assert_eq!(dept.worklist().expect("worklist").len(), 1);
    }

    #[test]
    fn test_worklist_orders_by_urgency_then_arrival() {
        let dept = department(5);
        let not_urgent = dept.admit_emergency(unidentified("not_urgent")).expect("admit");
        let critical = dept.admit_emergency(unidentified("critical")).expect("admit");
        let urgent_a = dept.admit_emergency(unidentified("urgent")).expect("admit");
        let urgent_b = dept.admit_emergency(unidentified("urgent")).expect("admit");

        let order: Vec<TriageId> = dept
            .worklist()
            .expect("worklist")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(order[0], critical.record.id);
        assert_eq!(order[3], not_urgent.record.id);
        let a = order.iter().position(|id| *id == urgent_a.record.id);
        let b = order.iter().position(|id| *id == urgent_b.record.id);
        assert!(a.is_some() && b.is_some());

        dept.discharge_emergency(critical.record.id, ClinicalState::AltaMedica, None)
            .expect("discharge");
        assert_eq!(dept.worklist().expect("worklist").len(), 3);
    }

    #[test]
    fn test_clinical_progress_and_vitals() {
        let dept = department(2);
        let id = dept
            .admit_emergency(unidentified("less_urgent"))
            .expect("admit")
            .record
            .id;

        let record = dept
            .update_clinical_state(id, ClinicalState::Estable)
            .expect("progress");
        assert_eq!(record.state, ClinicalState::Estable);

        let record = dept
            .update_vitals(
                id,
                VitalSigns {
                    temperature: Some(38.2),
                    ..Default::default()
                },
            )
            .expect("vitals");
        assert_eq!(record.vitals.temperature, Some(38.2));
        assert_eq!(dept.record(id).expect("stored").state, ClinicalState::Estable);

        assert!(matches!(
            dept.update_clinical_state(id, ClinicalState::DeAlta),
            Err(TriageError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_concurrent_vitals_updates_are_both_kept() {
        let records = Arc::new(InterferingRecords::default());
        let collaborators = Collaborators {
            records: records.clone(),
            ..Collaborators::in_memory()
        };
        let cfg = Arc::new(CoreConfig::with_bed_count(2).expect("cfg"));
        let dept = EmergencyDepartment::new(cfg, collaborators);
        let id = dept.admit_emergency(unidentified("urgent")).expect("admit").record.id;

        records.before_next_update(move |store| {
            let mut other = store.get(&id).expect("get").expect("stored");
            other
                .update_vitals(
                    VitalSigns {
                        heart_rate: Some(118),
                        ..Default::default()
                    },
                    Utc::now(),
                )
                .expect("vitals");
            store.update(other).expect("competing write");
        });

        let record = dept
            .update_vitals(
                id,
                VitalSigns {
                    temperature: Some(39.1),
                    ..Default::default()
                },
            )
            .expect("vitals");
        assert_eq!(record.vitals.heart_rate, Some(118));
        assert_eq!(record.vitals.temperature, Some(39.1));
        assert_eq!(record.revision, 2);

        let stored = dept.record(id).expect("stored");
        assert_eq!(stored.vitals.heart_rate, Some(118));
        assert_eq!(stored.vitals.temperature, Some(39.1));
    }

    #[test]
    fn test_state_update_racing_discharge_does_not_reopen_record() {
        let records = Arc::new(InterferingRecords::default());
        let collaborators = Collaborators {
            records: records.clone(),
            ..Collaborators::in_memory()
        };
        let cfg = Arc::new(CoreConfig::with_bed_count(1).expect("cfg"));
        let dept = EmergencyDepartment::new(cfg, collaborators);
        let id = dept.admit_emergency(unidentified("urgent")).expect("admit").record.id;

        records.before_next_update(move |store| {
            let mut closed = store.get(&id).expect("get").expect("stored");
            closed
                .close(ClinicalState::DeAlta, None, Utc::now())
                .expect("close");
            store.update(closed).expect("competing discharge write");
        });

        let err = dept
            .update_clinical_state(id, ClinicalState::Estable)
            .expect_err("record closed underneath");
        assert!(matches!(
            err,
            TriageError::InvalidStateTransition {
                from: ClinicalState::DeAlta,
                ..
            }
        ));
        assert_eq!(dept.record(id).expect("stored").state, ClinicalState::DeAlta);
    }

    #[test]
    fn test_appointment_operations_share_one_guard_across_clones() {
        let dept = department(1);
        let clone = dept.clone();
        let provider = ProviderId::generate();
        let date = NaiveDate::from_ymd_opt(2026, 11, 2).expect("date");

        for _ in 0..20 {
            dept.reserve_appointment_slot(provider, date).expect("reserve");
        }
        assert!(matches!(
            clone.reserve_appointment_slot(provider, date),
            Err(TriageError::CapacityExceeded { .. })
        ));
        assert_eq!(clone.appointment_slot(provider, date).expect("slot").confirmed, 20);
    }
}
