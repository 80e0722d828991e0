//! Emergency discharge.
//!
//! Order of operations: close a copy of the record, write it back conditioned on the revision
//! it was read at, then release the bed it held. A competing write between the read and the
//! write makes the discharge start over from a fresh read, so the bed is only returned once the
//! record no longer points at it.
//!
//! If the release fails after the write, the record is terminal but its bed is still held.
//! Repeating the same discharge finishes the release.

use crate::bed_pool::{BedPool, ReleaseOutcome};
use crate::collaborators::TriageRecordStore;
use crate::constants::RECORD_WRITE_ATTEMPTS;
use crate::triage::{BedRef, ClinicalState, TriageRecord};
use crate::{TriageError, TriageResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use triage_types::TriageId;

#[derive(Clone, Debug)]
pub struct Discharge {
    pub record: TriageRecord,
    pub released_bed: Option<BedRef>,
    pub release_outcome: Option<ReleaseOutcome>,
}

#[derive(Clone)]
pub struct DischargeService {
    beds: Arc<BedPool>,
    records: Arc<dyn TriageRecordStore>,
}

impl DischargeService {
    pub fn new(beds: Arc<BedPool>, records: Arc<dyn TriageRecordStore>) -> Self {
        Self { beds, records }
    }

    /// Move a record to `target` (a terminal state) and return its bed to the pool.
    ///
    /// # Errors
    ///
    /// - [`TriageError::TriageRecordNotFound`] if `triage_id` is unknown
    /// - [`TriageError::InvalidStateTransition`] if the record is already terminal or `target`
    ///   is not a terminal state
    /// - [`TriageError::MissingDeathDate`] for `Fallecido` without `deceased_at`
    /// - [`TriageError::RecordConflict`] if other writers kept changing the record
    pub fn discharge(
        &self,
        triage_id: TriageId,
        target: ClinicalState,
        deceased_at: Option<DateTime<Utc>>,
    ) -> TriageResult<Discharge> {
        for _ in 0..RECORD_WRITE_ATTEMPTS {
            let current = self
                .records
                .get(&triage_id)?
                .ok_or(TriageError::TriageRecordNotFound(triage_id))?;
            if current.state.is_terminal() {
                return self.finish_release(current, target);
            }

            let mut closed = current;
            let released_bed = closed.close(target, deceased_at, Utc::now())?;
            let closed = match self.records.update(closed) {
                Ok(written) => written,
                Err(TriageError::RecordConflict(_)) => {
                    tracing::debug!(triage_id = %triage_id, "record changed before discharge, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let release_outcome = match released_bed {
                Some(bed) => Some(self.beds.release(bed.number, triage_id)?),
                None => None,
            };

            tracing::info!(
                triage_id = %triage_id,
                bed = ?released_bed.map(|b| b.number),
                state = %target,
                "emergency discharged"
            );

            return Ok(Discharge {
                record: closed,
                released_bed,
                release_outcome,
            });
        }
        Err(TriageError::RecordConflict(triage_id))
    }

    /// Release a bed still held by a record that was already closed into `target`.
    fn finish_release(&self, record: TriageRecord, target: ClinicalState) -> TriageResult<Discharge> {
        let held = if record.state == target {
            self.beds
                .snapshot()?
                .into_iter()
                .find(|b| b.occupant == Some(record.id))
        } else {
            None
        };
        let Some(bed) = held else {
            return Err(TriageError::InvalidStateTransition {
                from: record.state,
                to: target,
            });
        };

        let release_outcome = self.beds.release(bed.number, record.id)?;
        tracing::warn!(triage_id = %record.id, bed = bed.number, "finished interrupted discharge");
        Ok(Discharge {
            record,
            released_bed: Some(BedRef {
                number: bed.number,
                floor: bed.floor,
            }),
            release_outcome: Some(release_outcome),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bed_pool::BedState;
    use crate::config::bed_layout;
    use crate::memory::testing::InterferingRecords;
    use crate::memory::InMemoryTriageRecordStore;
    use crate::triage::{PatientIdentity, VitalSigns};
    use crate::urgency::{Classification, UrgencyLevel};
    use chrono::Duration;
    use std::sync::atomic::{AtomicBool, Ordering};
    use triage_types::{NonEmptyText, PatientId};

    fn admit(beds: &BedPool, records: &dyn TriageRecordStore) -> TriageRecord {
        let id = TriageId::generate();
        let bed = beds.claim(id).expect("claim");
        let record = TriageRecord::admit(
            id,
            PatientIdentity::Known {
                patient_id: PatientId::generate(),
            },
            Classification::from(UrgencyLevel::Critical),
            NonEmptyText::new("stroke symptoms").expect("symptoms"),
            VitalSigns::default(),
            &bed,
        );
        records.insert(record.clone()).expect("insert");
        record
    }

    /// Wraps the in-memory store and fails the next update once when armed.
    #[derive(Default)]
    struct FlakyRecords {
        inner: InMemoryTriageRecordStore,
        fail_next_update: AtomicBool,
    }

    impl TriageRecordStore for FlakyRecords {
        fn insert(&self, record: TriageRecord) -> TriageResult<()> {
            self.inner.insert(record)
        }
        fn get(&self, id: &TriageId) -> TriageResult<Option<TriageRecord>> {
            self.inner.get(id)
        }
        fn update(&self, record: TriageRecord) -> TriageResult<TriageRecord> {
            if self.fail_next_update.swap(false, Ordering::SeqCst) {
                return Err(TriageError::Collaborator("write timed out".into()));
            }
            self.inner.update(record)
        }
        fn list_active(&self) -> TriageResult<Vec<TriageRecord>> {
            self.inner.list_active()
        }
    }

    #[test]
    fn test_full_cycle_returns_bed_to_pool() {
        let beds = Arc::new(BedPool::new(&bed_layout(3, 1).expect("layout")));
        let records = Arc::new(InMemoryTriageRecordStore::new());
        let service = DischargeService::new(beds.clone(), records.clone());

        let record = admit(&beds, records.as_ref());
        let bed_number = record.bed.expect("bed").number;
        let available_before = beds.count_available().expect("count");

        let discharge = service
            .discharge(record.id, ClinicalState::DeAlta, None)
            .expect("discharge");

        assert_eq!(discharge.record.state, ClinicalState::DeAlta);
        assert!(discharge.record.bed.is_none());
        assert_eq!(discharge.release_outcome, Some(ReleaseOutcome::Released));
        assert_eq!(beds.count_available().expect("count"), available_before + 1);
        let bed = beds
            .snapshot()
            .expect("snapshot")
            .into_iter()
            .find(|b| b.number == bed_number)
            .expect("bed exists");
        assert_eq!(bed.state, BedState::Available);

        let stored = records.get(&record.id).expect("get").expect("stored");
        assert_eq!(stored.state, ClinicalState::DeAlta);
        assert!(stored.bed.is_none());
    }

    #[test]
    fn test_second_discharge_is_invalid_transition() {
        let beds = Arc::new(BedPool::new(&bed_layout(2, 1).expect("layout")));
        let records = Arc::new(InMemoryTriageRecordStore::new());
        let service = DischargeService::new(beds.clone(), records.clone());
        let record = admit(&beds, records.as_ref());

        service
            .discharge(record.id, ClinicalState::AltaMedica, None)
            .expect("first discharge");
        let err = service
            .discharge(record.id, ClinicalState::DeAlta, None)
            .expect_err("already terminal");
        assert!(matches!(
            err,
            TriageError::InvalidStateTransition {
                from: ClinicalState::AltaMedica,
                to: ClinicalState::DeAlta
            }
        ));
        assert_eq!(beds.count_available().expect("count"), 2);
    }

    #[test]
    fn test_deceased_requires_death_date_and_keeps_bed_on_failure() {
        let beds = Arc::new(BedPool::new(&bed_layout(2, 1).expect("layout")));
        let records = Arc::new(InMemoryTriageRecordStore::new());
        let service = DischargeService::new(beds.clone(), records.clone());
        let record = admit(&beds, records.as_ref());

        let err = service
            .discharge(record.id, ClinicalState::Fallecido, None)
            .expect_err("death date required");
        assert!(matches!(err, TriageError::MissingDeathDate));
        assert_eq!(beds.count_available().expect("count"), 1);

        let died_at = Utc::now() - Duration::minutes(2);
        let discharge = service
            .discharge(record.id, ClinicalState::Fallecido, Some(died_at))
            .expect("deceased with date");
        assert_eq!(discharge.record.deceased_at, Some(died_at));
        assert_eq!(beds.count_available().expect("count"), 2);
    }

    #[test]
    fn test_failed_write_keeps_bed_and_discharge_can_be_retried() {
        let beds = Arc::new(BedPool::new(&bed_layout(2, 1).expect("layout")));
        let records = Arc::new(FlakyRecords::default());
        let service = DischargeService::new(beds.clone(), records.clone());
        let record = admit(&beds, records.as_ref());

        records.fail_next_update.store(true, Ordering::SeqCst);
        let err = service
            .discharge(record.id, ClinicalState::DeAlta, None)
            .expect_err("write fails");
        assert!(matches!(err, TriageError::Collaborator(_)));
        assert_eq!(beds.count_available().expect("count"), 1, "bed still held");
        assert_eq!(beds.occupant_of(1).expect("bed 1"), Some(record.id));

        let retried = service
            .discharge(record.id, ClinicalState::DeAlta, None)
            .expect("retry succeeds");
        assert_eq!(retried.release_outcome, Some(ReleaseOutcome::Released));
        assert_eq!(retried.record.state, ClinicalState::DeAlta);
        assert_eq!(beds.count_available().expect("count"), 2);
    }

    #[test]
    fn test_repeated_discharge_finishes_release_of_closed_record() {
        let beds = Arc::new(BedPool::new(&bed_layout(1, 1).expect("layout")));
        let records = Arc::new(InMemoryTriageRecordStore::new());
        let service = DischargeService::new(beds.clone(), records.clone());
        let record = admit(&beds, records.as_ref());

        // Record written as closed, bed release never happened.
        let mut closed = record.clone();
        closed
            .close(ClinicalState::DeAlta, None, Utc::now())
            .expect("close");
        records.update(closed).expect("write closed record");
        assert_eq!(beds.occupant_of(1).expect("bed 1"), Some(record.id));

        let err = service
            .discharge(record.id, ClinicalState::AltaMedica, None)
            .expect_err("different terminal state");
        assert!(matches!(err, TriageError::InvalidStateTransition { .. }));
        assert_eq!(beds.count_available().expect("count"), 0);

        let finished = service
            .discharge(record.id, ClinicalState::DeAlta, None)
            .expect("same discharge again");
        assert_eq!(finished.release_outcome, Some(ReleaseOutcome::Released));
        assert_eq!(finished.released_bed.map(|b| b.number), Some(1));
        assert_eq!(beds.count_available().expect("count"), 1);
    }

    #[test]
    fn test_discharge_racing_state_update_never_leaves_active_record_on_free_bed() {
        let beds = Arc::new(BedPool::new(&bed_layout(1, 1).expect("layout")));
        let records = Arc::new(InterferingRecords::default());
        let service = DischargeService::new(beds.clone(), records.clone());
        let record = admit(&beds, records.as_ref());

        let id = record.id;
        records.before_next_update(move |store| {
            let mut moved = store.get(&id).expect("get").expect("stored");
            moved
                .progress(ClinicalState::Estable, Utc::now())
                .expect("progress");
            store.update(moved).expect("competing write");
        });

        let discharge = service
            .discharge(record.id, ClinicalState::DeAlta, None)
            .expect("discharge retries on a fresh read");
        assert_eq!(discharge.record.state, ClinicalState::DeAlta);
        assert_eq!(discharge.release_outcome, Some(ReleaseOutcome::Released));

        let next = admit(&beds, records.as_ref());
        let holders: Vec<TriageId> = records
            .list_active()
            .expect("active")
            .into_iter()
            .filter(|r| r.bed.map(|b| b.number) == Some(1))
            .map(|r| r.id)
            .collect();
        assert_eq!(holders, vec![next.id]);
    }

    #[test]
    fn test_discharge_keeps_vitals_written_after_it_read_the_record() {
        let beds = Arc::new(BedPool::new(&bed_layout(1, 1).expect("layout")));
        let records = Arc::new(InterferingRecords::default());
        let service = DischargeService::new(beds.clone(), records.clone());
        let record = admit(&beds, records.as_ref());

        let id = record.id;
        records.before_next_update(move |store| {
            let mut latest = store.get(&id).expect("get").expect("stored");
            latest
                .update_vitals(
                    VitalSigns {
                        oxygen_saturation: Some(91),
                        ..Default::default()
                    },
                    Utc::now(),
                )
                .expect("vitals");
            store.update(latest).expect("competing write");
        });

        let discharge = service
            .discharge(record.id, ClinicalState::AltaMedica, None)
            .expect("discharge");
        assert_eq!(discharge.record.vitals.oxygen_saturation, Some(91));
        let stored = records.get(&record.id).expect("get").expect("stored");
        assert_eq!(stored.vitals.oxygen_saturation, Some(91));
        assert_eq!(stored.state, ClinicalState::AltaMedica);
    }

    #[test]
    fn test_unknown_record_is_not_found() {
        let beds = Arc::new(BedPool::new(&bed_layout(1, 1).expect("layout")));
        let service = DischargeService::new(beds, Arc::new(InMemoryTriageRecordStore::new()));
        let err = service
            .discharge(TriageId::generate(), ClinicalState::DeAlta, None)
            .expect_err("missing record");
        assert!(matches!(err, TriageError::TriageRecordNotFound(_)));
    }
}
