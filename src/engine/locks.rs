use crate::core::ship::ShipId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Per-ship serialization point for ledger mutations.
///
/// Every read-modify-write on a ship's ledger runs while holding that
/// ship's lock, so two concurrent calls cannot both consume the same
/// banked tranche. Multi-ship operations take the locks in ship-id order.
///
/// Entries live only while a caller holds or waits for them; the last
/// caller to leave removes the ship from the registry.
#[derive(Debug, Default)]
pub struct ShipLocks {
    locks: Mutex<HashMap<ShipId, Arc<Mutex<()>>>>,
}

impl ShipLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<ShipId, Arc<Mutex<()>>>> {
        // The map and the per-ship mutexes guard no data, so a poisoned
        // lock is still safe to reuse.
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, ship_id: &ShipId) -> Arc<Mutex<()>> {
        self.registry().entry(ship_id.clone()).or_default().clone()
    }

    /// Drop the entry once only the registry still refers to it.
    fn release(&self, ship_id: &ShipId) {
        let mut locks = self.registry();
        if locks
            .get(ship_id)
            .map_or(false, |handle| Arc::strong_count(handle) == 1)
        {
            locks.remove(ship_id);
        }
    }

    /// Run `f` while holding the lock of a single ship.
    pub fn with_ship<R>(&self, ship_id: &ShipId, f: impl FnOnce() -> R) -> R {
        let handle = self.handle(ship_id);
        let result = {
            let _guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(handle);
        self.release(ship_id);
        result
    }

    /// Run `f` while holding the locks of every listed ship.
    pub fn with_ships<R>(&self, ship_ids: &[ShipId], f: impl FnOnce() -> R) -> R {
        let mut ordered: Vec<&ShipId> = ship_ids.iter().collect();
        ordered.sort();
        ordered.dedup();

        let handles: Vec<Arc<Mutex<()>>> = ordered.iter().map(|id| self.handle(id)).collect();
        let result = {
            let _guards: Vec<MutexGuard<'_, ()>> = handles
                .iter()
                .map(|h| h.lock().unwrap_or_else(PoisonError::into_inner))
                .collect();
            f()
        };
        drop(handles);
        for ship_id in ordered {
            self.release(ship_id);
        }
        result
    }

    /// Number of ships currently locked or waited on.
    pub fn tracked_ships(&self) -> usize {
        self.registry().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_same_ship_is_serialized() {
        let locks = Arc::new(ShipLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    locks.with_ship(&ShipId::new("S1"), || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_with_ships_accepts_duplicates_and_any_order() {
        let locks = ShipLocks::new();
        let ships = vec![ShipId::new("B"), ShipId::new("A"), ShipId::new("B")];
        let result = locks.with_ships(&ships, || {
            assert_eq!(locks.tracked_ships(), 2);
            42
        });
        assert_eq!(result, 42);
        assert_eq!(locks.tracked_ships(), 0);
    }

    #[test]
    fn test_registry_is_pruned_after_release() {
        let locks = Arc::new(ShipLocks::new());
        let workers: Vec<_> = (0..16)
            .map(|i| {
                let locks = Arc::clone(&locks);
                thread::spawn(move || {
                    let ship = ShipId::new(format!("S{}", i % 4));
                    locks.with_ship(&ship, thread::yield_now);
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(locks.tracked_ships(), 0);

        locks.with_ship(&ShipId::new("S1"), || {
            assert_eq!(locks.tracked_ships(), 1);
        });
        assert_eq!(locks.tracked_ships(), 0);
    }

    #[test]
    fn test_nested_different_ships() {
        let locks = ShipLocks::new();
        let value = locks.with_ship(&ShipId::new("A"), || {
            locks.with_ship(&ShipId::new("B"), || "ok")
        });
        assert_eq!(value, "ok");
    }
}
