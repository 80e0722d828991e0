//! Emergency bed inventory.
//!
//! The pool owns a fixed set of beds for the lifetime of the process. Every state change goes
//! through [`BedPool::claim`] or [`BedPool::release`], each of which runs as a single critical
//! section over the whole inventory: the search for an Available bed and the flip to Occupied
//! happen under the same lock, so two admissions can never both take the same bed.
//!
//! Claim tie-break: the Available bed with the lowest bed number wins.

use crate::config::{BedSpec, CoreConfig};
use crate::{TriageError, TriageResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use triage_types::TriageId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BedState {
    Available,
    Occupied,
}

/// One emergency bed.
///
/// Invariant: `state == Occupied` if and only if `occupant` and `occupied_since` are set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Bed {
    pub number: u32,
    pub floor: i32,
    pub state: BedState,
    pub occupant: Option<TriageId>,
    pub occupied_since: Option<DateTime<Utc>>,
}

impl Bed {
    fn vacant(spec: &BedSpec) -> Self {
        Self {
            number: spec.number,
            floor: spec.floor,
            state: BedState::Available,
            occupant: None,
            occupied_since: None,
        }
    }

    fn occupy(&mut self, occupant: TriageId, at: DateTime<Utc>) {
        self.state = BedState::Occupied;
        self.occupant = Some(occupant);
        self.occupied_since = Some(at);
    }

    fn vacate(&mut self) {
        self.state = BedState::Available;
        self.occupant = None;
        self.occupied_since = None;
    }
}

/// The bed handed to an admission by a successful claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BedAssignment {
    pub number: u32,
    pub floor: i32,
    pub occupied_since: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The bed was held by the named record and is now Available.
    Released,
    /// Nothing to do: the bed was already Available or is held by a different record.
    AlreadyReleased,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub total: usize,
    pub available: usize,
    pub occupied: usize,
}

/// Fixed-size pool of exclusively claimable emergency beds.
#[derive(Debug)]
pub struct BedPool {
    beds: Mutex<Vec<Bed>>,
}

impl BedPool {
    /// Build a pool from a bed layout. Beds are kept ordered by bed number.
    pub fn new(layout: &[BedSpec]) -> Self {
        let mut beds: Vec<Bed> = layout.iter().map(Bed::vacant).collect();
        beds.sort_by_key(|b| b.number);
        Self {
            beds: Mutex::new(beds),
        }
    }

    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self::new(cfg.beds())
    }

    fn lock(&self) -> TriageResult<MutexGuard<'_, Vec<Bed>>> {
        self.beds.lock().map_err(|_| TriageError::LockPoisoned)
    }

    /// Atomically take the lowest-numbered Available bed for `occupant`.
    ///
    /// # Errors
    ///
    /// - [`TriageError::NoBedsAvailable`] if every bed is Occupied. This is an expected outcome.
    /// - [`TriageError::InvalidInput`] if `occupant` already holds a bed.
    /// - [`TriageError::LockPoisoned`] if another thread panicked while holding the pool.
    pub fn claim(&self, occupant: TriageId) -> TriageResult<BedAssignment> {
        let mut beds = self.lock()?;

        if let Some(held) = beds.iter().find(|b| b.occupant == Some(occupant)) {
            return Err(TriageError::InvalidInput(format!(
                "triage record {occupant} already occupies bed {}",
                held.number
            )));
        }

        let bed = beds
            .iter_mut()
            .find(|b| b.state == BedState::Available)
            .ok_or(TriageError::NoBedsAvailable)?;

        let now = Utc::now();
        bed.occupy(occupant, now);
        tracing::debug!(bed = bed.number, triage_id = %occupant, "bed claimed");

        Ok(BedAssignment {
            number: bed.number,
            floor: bed.floor,
            occupied_since: now,
        })
    }

    /// Atomically return bed `number` to the pool if `occupant` still holds it.
    ///
    /// Idempotent: releasing an Available bed, or a bed that has since been claimed by another
    /// record, changes nothing and reports [`ReleaseOutcome::AlreadyReleased`].
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::BedNotFound`] if `number` is not part of the inventory.
    pub fn release(&self, number: u32, occupant: TriageId) -> TriageResult<ReleaseOutcome> {
        let mut beds = self.lock()?;
        let bed = beds
            .iter_mut()
            .find(|b| b.number == number)
            .ok_or(TriageError::BedNotFound(number))?;

        if bed.occupant != Some(occupant) {
            tracing::debug!(bed = number, triage_id = %occupant, "release skipped, bed not held by record");
            return Ok(ReleaseOutcome::AlreadyReleased);
        }

        bed.vacate();
        tracing::debug!(bed = number, triage_id = %occupant, "bed released");
        Ok(ReleaseOutcome::Released)
    }

    /// Advisory count of Available beds. Stale as soon as the lock is dropped; never treat it
    /// as a reservation.
    pub fn count_available(&self) -> TriageResult<usize> {
        Ok(self.status()?.available)
    }

    pub fn status(&self) -> TriageResult<PoolStatus> {
        let beds = self.lock()?;
        let available = beds
            .iter()
            .filter(|b| b.state == BedState::Available)
            .count();
        Ok(PoolStatus {
            total: beds.len(),
            available,
            occupied: beds.len() - available,
        })
    }

    /// Copy of every bed, ordered by bed number.
    pub fn snapshot(&self) -> TriageResult<Vec<Bed>> {
        Ok(self.lock()?.clone())
    }

    pub fn occupant_of(&self, number: u32) -> TriageResult<Option<TriageId>> {
        let beds = self.lock()?;
        beds.iter()
            .find(|b| b.number == number)
            .map(|b| b.occupant)
            .ok_or(TriageError::BedNotFound(number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::bed_layout;
    use std::collections::HashSet;
    use std::sync::Barrier;

    fn pool(count: u32) -> BedPool {
        BedPool::new(&bed_layout(count, 1).expect("non-empty layout"))
    }

    fn assert_conserved(pool: &BedPool) {
        let status = pool.status().expect("status");
        assert_eq!(status.available + status.occupied, status.total);
    }

    #[test]
    fn test_claim_takes_lowest_available_bed() {
        let pool = pool(5);
        let first = pool.claim(TriageId::generate()).expect("claim 1");
        let second = pool.claim(TriageId::generate()).expect("claim 2");
        assert_eq!((first.number, second.number), (1, 2));
        assert_eq!(first.floor, 1);

        let holder = pool.occupant_of(1).expect("bed 1").expect("occupied");
        pool.release(1, holder).expect("release");
        let third = pool.claim(TriageId::generate()).expect("claim 3");
        assert_eq!(third.number, 1, "freed lower bed should be reused first");
    }

    #[test]
    fn test_unordered_layout_still_claims_lowest_number() {
        let layout = [
            BedSpec { number: 7, floor: 2 },
            BedSpec { number: 3, floor: 1 },
        ];
        let pool = BedPool::new(&layout);
        assert_eq!(pool.claim(TriageId::generate()).expect("claim").number, 3);
    }

    #[test]
    fn test_claim_on_full_pool_returns_no_beds_available() {
        let pool = pool(2);
        pool.claim(TriageId::generate()).expect("claim 1");
        pool.claim(TriageId::generate()).expect("claim 2");

        let err = pool.claim(TriageId::generate()).expect_err("pool exhausted");
        assert!(matches!(err, TriageError::NoBedsAvailable));
        assert_eq!(pool.count_available().expect("count"), 0);
        assert_conserved(&pool);
    }

    #[test]
    fn test_record_cannot_hold_two_beds() {
        let pool = pool(3);
        let id = TriageId::generate();
        pool.claim(id).expect("first claim");
        let err = pool.claim(id).expect_err("second claim for same record");
        assert!(matches!(err, TriageError::InvalidInput(_)));
        assert_eq!(pool.count_available().expect("count"), 2);
    }

    #[test]
    fn test_concurrent_claims_never_share_a_bed() {
        const BEDS: u32 = 5;
        const CONTENDERS: usize = 32;

        let pool = pool(BEDS);
        let barrier = Barrier::new(CONTENDERS);

        let results: Vec<TriageResult<BedAssignment>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..CONTENDERS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        pool.claim(TriageId::generate())
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("claim thread panicked"))
                .collect()
        });

        let won: Vec<u32> = results
            .iter()
            .filter_map(|r| r.as_ref().ok().map(|a| a.number))
            .collect();
        let lost = results
            .iter()
            .filter(|r| matches!(r, Err(TriageError::NoBedsAvailable)))
            .count();

        assert_eq!(won.len(), BEDS as usize);
        assert_eq!(lost, CONTENDERS - BEDS as usize);
        let distinct: HashSet<u32> = won.iter().copied().collect();
        assert_eq!(distinct.len(), won.len(), "a bed was handed out twice");
        assert_eq!(pool.count_available().expect("count"), 0);
    }

    #[test]
    fn test_release_is_idempotent() {
        let pool = pool(3);
        let id = TriageId::generate();
        let bed = pool.claim(id).expect("claim");

        assert_eq!(
            pool.release(bed.number, id).expect("first release"),
            ReleaseOutcome::Released
        );
        let after_once = pool.snapshot().expect("snapshot");

        assert_eq!(
            pool.release(bed.number, id).expect("second release"),
            ReleaseOutcome::AlreadyReleased
        );
        assert_eq!(pool.snapshot().expect("snapshot"), after_once);
        assert_eq!(pool.count_available().expect("count"), 3);
    }

    #[test]
    fn test_stale_release_does_not_free_reclaimed_bed() {
        let pool = pool(1);
        let first = TriageId::generate();
        let bed = pool.claim(first).expect("claim");
        pool.release(bed.number, first).expect("release");

        let second = TriageId::generate();
        pool.claim(second).expect("reclaim");

        assert_eq!(
            pool.release(bed.number, first).expect("stale release"),
            ReleaseOutcome::AlreadyReleased
        );
        assert_eq!(pool.occupant_of(bed.number).expect("bed"), Some(second));
    }

    #[test]
    fn test_release_unknown_bed_is_not_found() {
        let pool = pool(2);
        let err = pool
            .release(99, TriageId::generate())
            .expect_err("bed 99 does not exist");
        assert!(matches!(err, TriageError::BedNotFound(99)));
    }

    #[test]
    fn test_conservation_over_mixed_sequence() {
        let pool = pool(4);
        let mut held = Vec::new();
        for step in 0..12 {
            if step % 3 == 2 {
                if let Some((number, id)) = held.pop() {
                    pool.release(number, id).expect("release");
                }
            } else {
                let id = TriageId::generate();
                if let Ok(bed) = pool.claim(id) {
                    held.push((bed.number, id));
                }
            }
            assert_conserved(&pool);
            assert_eq!(pool.status().expect("status").occupied, held.len());
        }
    }

    #[test]
    fn test_snapshot_reports_occupancy_details() {
        let pool = pool(2);
        let id = TriageId::generate();
        pool.claim(id).expect("claim");

        let beds = pool.snapshot().expect("snapshot");
        assert_eq!(beds[0].state, BedState::Occupied);
        assert_eq!(beds[0].occupant, Some(id));
        assert!(beds[0].occupied_since.is_some());
        assert_eq!(beds[1].state, BedState::Available);
        assert!(beds[1].occupant.is_none());
    }
}
