//! Per-provider daily appointment quota.
//!
//! The guard keeps one confirmed-appointment counter per (provider, calendar date). A
//! reservation compares and increments that counter inside a single critical section, so two
//! callers who both observe "19 of 20 used" cannot both succeed.
//!
//! The first time a key is touched its counter is seeded from the appointment store's
//! confirmed-row count, under the same lock. Afterwards every booking and cancellation that
//! goes through the guard keeps the two in step. Cancelling an appointment frees its unit of
//! capacity for that day.

use crate::collaborators::{Appointment, AppointmentStatus, AppointmentStore};
use crate::config::CoreConfig;
use crate::{TriageError, TriageResult};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use triage_types::{AppointmentId, PatientId, ProviderId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct SlotKey {
    provider: ProviderId,
    date: NaiveDate,
}

/// Snapshot of one provider's quota for one day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AppointmentSlot {
    pub provider: ProviderId,
    pub date: NaiveDate,
    pub confirmed: u32,
    pub daily_max: u32,
}

impl AppointmentSlot {
    pub fn remaining(&self) -> u32 {
        self.daily_max.saturating_sub(self.confirmed)
    }
}

#[derive(Clone, Debug)]
pub struct BookingRequest {
    pub provider: ProviderId,
    pub patient: PatientId,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

pub struct AppointmentCapacityGuard {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn AppointmentStore>,
    counters: Mutex<HashMap<SlotKey, u32>>,
}

impl AppointmentCapacityGuard {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn AppointmentStore>) -> Self {
        Self {
            cfg,
            store,
            counters: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> TriageResult<MutexGuard<'_, HashMap<SlotKey, u32>>> {
        self.counters.lock().map_err(|_| TriageError::LockPoisoned)
    }

    fn counter<'a>(
        &self,
        counters: &'a mut HashMap<SlotKey, u32>,
        key: SlotKey,
    ) -> TriageResult<&'a mut u32> {
        if !counters.contains_key(&key) {
            let seeded = self.store.count_confirmed(&key.provider, key.date)?;
            counters.insert(key, seeded);
        }
        counters
            .get_mut(&key)
            .ok_or_else(|| TriageError::Collaborator("slot counter vanished under lock".into()))
    }

    fn slot(&self, key: SlotKey, confirmed: u32) -> AppointmentSlot {
        AppointmentSlot {
            provider: key.provider,
            date: key.date,
            confirmed,
            daily_max: self.cfg.daily_max_for(&key.provider),
        }
    }

    /// Atomically take one unit of `provider`'s capacity on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::CapacityExceeded`] without changing anything when the provider is
    /// already at its daily maximum.
    pub fn try_reserve(&self, provider: ProviderId, date: NaiveDate) -> TriageResult<AppointmentSlot> {
        let key = SlotKey { provider, date };
        let max = self.cfg.daily_max_for(&provider);

        let mut counters = self.lock()?;
        let count = self.counter(&mut counters, key)?;
        if *count >= max {
            tracing::info!(provider = %provider, %date, max, "appointment capacity exceeded");
            return Err(TriageError::CapacityExceeded {
                provider,
                date,
                max,
            });
        }
        *count += 1;
        let confirmed = *count;
        drop(counters);

        tracing::debug!(provider = %provider, %date, confirmed, max, "appointment slot reserved");
        Ok(self.slot(key, confirmed))
    }

    /// Give back one unit of capacity. Never drops below zero.
    pub fn release_slot(&self, provider: ProviderId, date: NaiveDate) -> TriageResult<AppointmentSlot> {
        let key = SlotKey { provider, date };
        let mut counters = self.lock()?;
        let count = self.counter(&mut counters, key)?;
        *count = count.saturating_sub(1);
        let confirmed = *count;
        drop(counters);
        Ok(self.slot(key, confirmed))
    }

    /// Current quota usage for `provider` on `date`.
    pub fn current(&self, provider: ProviderId, date: NaiveDate) -> TriageResult<AppointmentSlot> {
        let key = SlotKey { provider, date };
        let mut counters = self.lock()?;
        let confirmed = *self.counter(&mut counters, key)?;
        drop(counters);
        Ok(self.slot(key, confirmed))
    }

    /// Reserve capacity and write the appointment. If the write fails the reserved unit is
    /// given back before the error is returned.
    pub fn book(&self, request: BookingRequest) -> TriageResult<Appointment> {
        self.try_reserve(request.provider, request.date)?;

        let appointment = Appointment {
            id: AppointmentId::generate(),
            provider: request.provider,
            patient: request.patient,
            date: request.date,
            time: request.time,
            status: AppointmentStatus::Confirmed,
            created_at: Utc::now(),
        };

        if let Err(e) = self.store.insert(appointment.clone()) {
            if let Err(release_error) = self.release_slot(request.provider, request.date) {
                tracing::error!(
                    provider = %request.provider,
                    date = %request.date,
                    "appointment write failed ({e}) and slot release also failed: {release_error}"
                );
            }
            return Err(e);
        }

        tracing::info!(
            appointment_id = %appointment.id,
            provider = %appointment.provider,
            date = %appointment.date,
            "appointment booked"
        );
        Ok(appointment)
    }

    /// Cancel an appointment and free its capacity. Cancelling twice frees capacity once.
    ///
    /// The day's counter is seeded before the store flips the row, so a seed taken from the
    /// store never already excludes the appointment being cancelled.
    pub fn cancel(&self, id: AppointmentId) -> TriageResult<Appointment> {
        let appointment = self
            .store
            .get(&id)?
            .ok_or(TriageError::AppointmentNotFound(id))?;
        let key = SlotKey {
            provider: appointment.provider,
            date: appointment.date,
        };

        let mut counters = self.lock()?;
        let count = self.counter(&mut counters, key)?;
        let cancelled = self.store.cancel(&id)?;
        if cancelled.is_some() {
            *count = count.saturating_sub(1);
        }
        drop(counters);

        match cancelled {
            Some(cancelled) => {
                tracing::info!(appointment_id = %id, "appointment cancelled");
                Ok(cancelled)
            }
            None => self
                .store
                .get(&id)?
                .ok_or(TriageError::AppointmentNotFound(id)),
        }
    }
}
