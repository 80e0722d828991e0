//! In-process collaborator implementations.
//!
//! Used by the runner and the CLI simulation, and as fixtures in tests. Every conditional
//! write happens under a single lock acquisition.

use crate::collaborators::{
    Appointment, AppointmentStatus, AppointmentStore, ClinicalHistoryStore, HistoryEntry,
    PatientRegistry, PatientSummary, TriageRecordStore,
};
use crate::triage::TriageRecord;
use crate::{TriageError, TriageResult};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use triage_types::{AppointmentId, PatientId, ProviderId, TriageId};

#[derive(Debug, Default)]
pub struct InMemoryPatientRegistry {
    patients: RwLock<HashMap<PatientId, PatientSummary>>,
}

impl InMemoryPatientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, patient: PatientSummary) -> TriageResult<()> {
        self.patients
            .write()
            .map_err(|_| TriageError::LockPoisoned)?
            .insert(patient.id, patient);
        Ok(())
    }
}

impl PatientRegistry for InMemoryPatientRegistry {
    fn find(&self, id: &PatientId) -> TriageResult<Option<PatientSummary>> {
        Ok(self
            .patients
            .read()
            .map_err(|_| TriageError::LockPoisoned)?
            .get(id)
            .cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryClinicalHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl InMemoryClinicalHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries_for(&self, patient: &PatientId) -> TriageResult<Vec<HistoryEntry>> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| TriageError::LockPoisoned)?
            .iter()
            .filter(|e| &e.patient == patient)
            .cloned()
            .collect())
    }
}

impl ClinicalHistoryStore for InMemoryClinicalHistory {
    fn append(&self, entry: HistoryEntry) -> TriageResult<()> {
        self.entries
            .lock()
            .map_err(|_| TriageError::LockPoisoned)?
            .push(entry);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTriageRecordStore {
    records: RwLock<HashMap<TriageId, TriageRecord>>,
}

impl InMemoryTriageRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> TriageResult<usize> {
        Ok(self
            .records
            .read()
            .map_err(|_| TriageError::LockPoisoned)?
            .len())
    }

    pub fn is_empty(&self) -> TriageResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl TriageRecordStore for InMemoryTriageRecordStore {
    fn insert(&self, record: TriageRecord) -> TriageResult<()> {
        let mut records = self.records.write().map_err(|_| TriageError::LockPoisoned)?;
        if records.contains_key(&record.id) {
            return Err(TriageError::InvalidInput(format!(
                "triage record {} already exists",
                record.id
            )));
        }
        records.insert(record.id, record);
        Ok(())
    }

    fn get(&self, id: &TriageId) -> TriageResult<Option<TriageRecord>> {
        Ok(self
            .records
            .read()
            .map_err(|_| TriageError::LockPoisoned)?
            .get(id)
            .cloned())
    }

    fn update(&self, mut record: TriageRecord) -> TriageResult<TriageRecord> {
        let mut records = self.records.write().map_err(|_| TriageError::LockPoisoned)?;
        let stored = records
            .get_mut(&record.id)
            .ok_or(TriageError::TriageRecordNotFound(record.id))?;
        if stored.revision != record.revision {
            return Err(TriageError::RecordConflict(record.id));
        }
        record.revision += 1;
        *stored = record.clone();
        Ok(record)
    }

    fn list_active(&self) -> TriageResult<Vec<TriageRecord>> {
        Ok(self
            .records
            .read()
            .map_err(|_| TriageError::LockPoisoned)?
            .values()
            .filter(|r| r.is_active())
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<AppointmentId, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AppointmentStore for InMemoryAppointmentStore {
    fn insert(&self, appointment: Appointment) -> TriageResult<()> {
        self.appointments
            .write()
            .map_err(|_| TriageError::LockPoisoned)?
            .insert(appointment.id, appointment);
        Ok(())
    }

    fn get(&self, id: &AppointmentId) -> TriageResult<Option<Appointment>> {
        Ok(self
            .appointments
            .read()
            .map_err(|_| TriageError::LockPoisoned)?
            .get(id)
            .cloned())
    }

    fn cancel(&self, id: &AppointmentId) -> TriageResult<Option<Appointment>> {
        let mut appointments = self
            .appointments
            .write()
            .map_err(|_| TriageError::LockPoisoned)?;
        let appointment = appointments
            .get_mut(id)
            .ok_or(TriageError::AppointmentNotFound(*id))?;
        if appointment.status == AppointmentStatus::Cancelled {
            return Ok(None);
        }
        appointment.status = AppointmentStatus::Cancelled;
        Ok(Some(appointment.clone()))
    }

    fn count_confirmed(&self, provider: &ProviderId, date: NaiveDate) -> TriageResult<u32> {
        let appointments = self
            .appointments
            .read()
            .map_err(|_| TriageError::LockPoisoned)?;
        let count = appointments
            .values()
            .filter(|a| {
                &a.provider == provider
                    && a.date == date
                    && a.status == AppointmentStatus::Confirmed
            })
            .count();
        u32::try_from(count).map_err(|_| {
            TriageError::Collaborator(format!("confirmed count {count} does not fit in u32"))
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    type Interference = Box<dyn FnOnce(&InMemoryTriageRecordStore) + Send>;

    /// Record store that lets another writer land just before the next update.
    #[derive(Default)]
    pub(crate) struct InterferingRecords {
        pub(crate) inner: InMemoryTriageRecordStore,
        interference: Mutex<Option<Interference>>,
    }

    impl InterferingRecords {
        pub(crate) fn before_next_update(
            &self,
            write: impl FnOnce(&InMemoryTriageRecordStore) + Send + 'static,
        ) {
            *self.interference.lock().expect("interference lock") = Some(Box::new(write));
        }
    }

    impl TriageRecordStore for InterferingRecords {
        fn insert(&self, record: TriageRecord) -> TriageResult<()> {
            self.inner.insert(record)
        }
        fn get(&self, id: &TriageId) -> TriageResult<Option<TriageRecord>> {
            self.inner.get(id)
        }
        fn update(&self, record: TriageRecord) -> TriageResult<TriageRecord> {
            let pending = self.interference.lock().expect("interference lock").take();
            if let Some(write) = pending {
                write(&self.inner);
            }
            self.inner.update(record)
        }
        fn list_active(&self) -> TriageResult<Vec<TriageRecord>> {
            self.inner.list_active()
        }
    }
}
