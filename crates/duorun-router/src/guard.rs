//! Per-worker in-flight counters gating admission.
//!
//! Counters are atomics in a map fixed at construction, so contention is
//! bounded by the number of workers rather than by request volume.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use duorun_core::WorkerId;
use tracing::{debug, warn};

use crate::catalog::CapabilityCatalog;

#[derive(Debug)]
struct Slot {
    in_flight: AtomicU32,
    peak: AtomicU32,
    limit: AtomicU32,
}

impl Slot {
    fn new(limit: u32) -> Self {
        Self {
            in_flight: AtomicU32::new(0),
            peak: AtomicU32::new(0),
            limit: AtomicU32::new(limit),
        }
    }

    fn try_acquire(&self) -> bool {
        let limit = self.limit.load(Ordering::Acquire);
        let acquired = self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < limit).then_some(current + 1)
            });
        match acquired {
            Ok(previous) => {
                self.peak.fetch_max(previous + 1, Ordering::AcqRel);
                true
            }
            Err(_) => false,
        }
    }

    /// Decrement, refusing to go below zero. Returns false on underflow.
    fn release(&self) -> bool {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1)
            })
            .is_ok()
    }
}

/// Occupancy of one worker at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotUsage {
    pub worker_id: WorkerId,
    pub in_flight: u32,
    pub capacity: u32,
    pub peak: u32,
}

/// Tracks in-flight invocations per worker against `max_concurrent_tasks`.
#[derive(Debug, Default)]
pub struct ConcurrencyGuard {
    slots: BTreeMap<WorkerId, Arc<Slot>>,
    /// Slots of removed workers that still have permits out. Never admits;
    /// revived if the worker comes back before they drain.
    retired: BTreeMap<WorkerId, Arc<Slot>>,
}

impl ConcurrencyGuard {
    /// Create a guard with one zeroed counter per catalog worker.
    pub fn new(catalog: &CapabilityCatalog) -> Self {
        let slots = catalog
            .profiles()
            .map(|profile| {
                (
                    profile.id.clone(),
                    Arc::new(Slot::new(profile.max_concurrent_tasks)),
                )
            })
            .collect();
        Self {
            slots,
            retired: BTreeMap::new(),
        }
    }

    /// Build a guard for a refreshed catalog. Workers present in both keep
    /// their counters (and outstanding permits) with the new limit applied.
    /// A removed worker's slot is retained while permits are outstanding, so
    /// re-adding it later still counts them.
    pub fn rebuild(&self, catalog: &CapabilityCatalog) -> Self {
        let slots: BTreeMap<WorkerId, Arc<Slot>> = catalog
            .profiles()
            .map(|profile| {
                let previous = self
                    .slots
                    .get(&profile.id)
                    .or_else(|| self.retired.get(&profile.id));
                let slot = match previous {
                    Some(existing) => {
                        existing
                            .limit
                            .store(profile.max_concurrent_tasks, Ordering::Release);
                        existing.clone()
                    }
                    None => Arc::new(Slot::new(profile.max_concurrent_tasks)),
                };
                (profile.id.clone(), slot)
            })
            .collect();

        let retired = self
            .slots
            .iter()
            .chain(self.retired.iter())
            .filter(|(worker_id, slot)| {
                !slots.contains_key(*worker_id) && slot.in_flight.load(Ordering::Acquire) > 0
            })
            .map(|(worker_id, slot)| (worker_id.clone(), slot.clone()))
            .collect::<BTreeMap<_, _>>();
        if !retired.is_empty() {
            debug!(retired = retired.len(), "Keeping slots of removed workers until permits drain");
        }

        Self { slots, retired }
    }

    /// Increment the worker's counter if it is below its limit.
    pub fn try_acquire(&self, worker_id: &WorkerId) -> bool {
        let Some(slot) = self.slots.get(worker_id) else {
            warn!(worker_id = %worker_id, "Admission requested for unknown worker");
            return false;
        };
        let admitted = slot.try_acquire();
        if !admitted {
            debug!(worker_id = %worker_id, "Worker at capacity");
        }
        admitted
    }

    /// Decrement the worker's counter. Never goes below zero; an extra
    /// release is logged and ignored.
    pub fn release(&self, worker_id: &WorkerId) {
        match self.slots.get(worker_id) {
            Some(slot) => {
                if !slot.release() {
                    warn!(worker_id = %worker_id, "Release without matching acquire ignored");
                }
            }
            None => warn!(worker_id = %worker_id, "Release for unknown worker ignored"),
        }
    }

    /// Acquire a slot as a permit that releases when dropped.
    pub fn acquire(&self, worker_id: &WorkerId) -> Option<GuardPermit> {
        if !self.try_acquire(worker_id) {
            return None;
        }
        let slot = self.slots.get(worker_id)?.clone();
        Some(GuardPermit {
            worker_id: worker_id.clone(),
            slot,
        })
    }

    /// Current in-flight count (0 for unknown workers).
    pub fn in_flight(&self, worker_id: &WorkerId) -> u32 {
        self.slots
            .get(worker_id)
            .map_or(0, |slot| slot.in_flight.load(Ordering::Acquire))
    }

    /// Highest in-flight count observed since the slot was created.
    pub fn peak(&self, worker_id: &WorkerId) -> u32 {
        self.slots
            .get(worker_id)
            .map_or(0, |slot| slot.peak.load(Ordering::Acquire))
    }

    /// Configured limit (0 for unknown workers).
    pub fn capacity(&self, worker_id: &WorkerId) -> u32 {
        self.slots
            .get(worker_id)
            .map_or(0, |slot| slot.limit.load(Ordering::Acquire))
    }

    /// Fraction of capacity in use, in [0, 1].
    pub fn load(&self, worker_id: &WorkerId) -> f64 {
        match self.capacity(worker_id) {
            0 => 0.0,
            capacity => f64::from(self.in_flight(worker_id)) / f64::from(capacity),
        }
    }

    /// Occupancy of every worker, ordered by id.
    pub fn usage(&self) -> Vec<SlotUsage> {
        self.slots
            .iter()
            .map(|(worker_id, slot)| SlotUsage {
                worker_id: worker_id.clone(),
                in_flight: slot.in_flight.load(Ordering::Acquire),
                capacity: slot.limit.load(Ordering::Acquire),
                peak: slot.peak.load(Ordering::Acquire),
            })
            .collect()
    }
}

/// A held admission slot. Dropping it releases the slot, so every exit
/// path of a stage (including timeout and cancellation) gives it back.
#[derive(Debug)]
pub struct GuardPermit {
    worker_id: WorkerId,
    slot: Arc<Slot>,
}

impl GuardPermit {
    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }
}

impl Drop for GuardPermit {
    fn drop(&mut self) {
        if !self.slot.release() {
            warn!(worker_id = %self.worker_id, "Permit dropped on an empty slot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duorun_core::WorkerProfile;

    fn guard(limit: u32) -> (ConcurrencyGuard, WorkerId) {
        let catalog = CapabilityCatalog::from_profiles([
            WorkerProfile::new("claude").with_max_concurrent_tasks(limit)
        ])
        .unwrap();
        (ConcurrencyGuard::new(&catalog), WorkerId::new("claude"))
    }

    #[test]
    fn test_acquire_up_to_limit() {
        let (guard, id) = guard(2);
        assert!(guard.try_acquire(&id));
        assert!(guard.try_acquire(&id));
        assert!(!guard.try_acquire(&id));
        assert_eq!(guard.in_flight(&id), 2);

        guard.release(&id);
        assert!(guard.try_acquire(&id));
        assert_eq!(guard.peak(&id), 2);
    }

    #[test]
    fn test_release_never_goes_negative() {
        let (guard, id) = guard(1);
        guard.release(&id);
        guard.release(&id);
        assert_eq!(guard.in_flight(&id), 0);
        assert!(guard.try_acquire(&id));
        assert!(!guard.try_acquire(&id));
    }

    #[test]
    fn test_unknown_worker_denied() {
        let (guard, _) = guard(1);
        let ghost = WorkerId::new("ghost");
        assert!(!guard.try_acquire(&ghost));
        assert!(guard.acquire(&ghost).is_none());
        guard.release(&ghost);
        assert_eq!(guard.in_flight(&ghost), 0);
    }

    #[test]
    fn test_permit_releases_on_drop() {
        let (guard, id) = guard(1);
        {
            let permit = guard.acquire(&id).unwrap();
            assert_eq!(permit.worker_id(), &id);
            assert!(guard.acquire(&id).is_none());
            assert!((guard.load(&id) - 1.0).abs() < f64::EPSILON);
        }
        assert_eq!(guard.in_flight(&id), 0);
        assert!(guard.acquire(&id).is_some());
    }

    #[test]
    fn test_rebuild_keeps_outstanding_permits() {
        let (guard, id) = guard(1);
        let permit = guard.acquire(&id).unwrap();

        let refreshed = CapabilityCatalog::from_profiles([
            WorkerProfile::new("claude").with_max_concurrent_tasks(3),
            WorkerProfile::new("codex").with_max_concurrent_tasks(1),
        ])
        .unwrap();
        let rebuilt = guard.rebuild(&refreshed);

        assert_eq!(rebuilt.in_flight(&id), 1);
        assert_eq!(rebuilt.capacity(&id), 3);
        drop(permit);
        assert_eq!(rebuilt.in_flight(&id), 0);
        assert_eq!(rebuilt.usage().len(), 2);
    }

    #[test]
    fn test_readded_worker_still_counts_old_permits() {
        let (guard, id) = guard(1);
        let permit = guard.acquire(&id).unwrap();

        let without = CapabilityCatalog::from_profiles([
            WorkerProfile::new("codex").with_max_concurrent_tasks(1)
        ])
        .unwrap();
        let removed = guard.rebuild(&without);
        assert!(!removed.try_acquire(&id));
        assert_eq!(removed.usage().len(), 1);

        let with = CapabilityCatalog::from_profiles([
            WorkerProfile::new("claude").with_max_concurrent_tasks(1),
            WorkerProfile::new("codex").with_max_concurrent_tasks(1),
        ])
        .unwrap();
        let readded = removed.rebuild(&with);
        assert_eq!(readded.in_flight(&id), 1);
        assert!(readded.acquire(&id).is_none());

        drop(permit);
        assert!(readded.acquire(&id).is_some());

        let drained = readded.rebuild(&without).rebuild(&with);
        assert_eq!(drained.in_flight(&id), 0);
    }

    #[test]
    fn test_concurrent_acquire_respects_limit() {
        let (guard, id) = guard(3);
        let guard = Arc::new(guard);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let guard = guard.clone();
                let id = id.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        if let Some(permit) = guard.acquire(&id) {
                            assert!(guard.in_flight(&id) <= 3);
                            drop(permit);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(guard.in_flight(&id), 0);
        assert!(guard.peak(&id) <= 3);
    }
}
