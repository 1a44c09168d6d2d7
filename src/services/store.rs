//! In-memory shipment store
//!
//! Locking layout:
//! - `RwLock` over the key index and insertion order (held briefly)
//! - one `Mutex` per aggregate, held for the whole read-validate-append
//!
//! No path holds an aggregate lock while acquiring the index lock, and no path
//! holds two aggregate locks at once.

use crate::domain::error::ShipmentError;
use crate::domain::shipment::Shipment;
use crate::domain::types::TrackingId;
use crate::services::tracking_code::TrackingCodeGenerator;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
struct StoreInner {
    /// Aggregates by tracking id
    index: FxHashMap<TrackingId, Arc<Mutex<Shipment>>>,
    /// Tracking ids in insertion order
    order: Vec<TrackingId>,
}

impl StoreInner {
    fn push(&mut self, shipment: Shipment) {
        let id = shipment.tracking_id().clone();
        self.order.push(id.clone());
        self.index.insert(id, Arc::new(Mutex::new(shipment)));
    }
}

/// Keyed collection of shipment aggregates
#[derive(Default)]
pub struct ShipmentStore {
    inner: RwLock<StoreInner>,
}

impl ShipmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a shipment whose tracking id was assigned elsewhere
    pub fn insert(&self, shipment: Shipment) -> Result<(), ShipmentError> {
        let mut inner = self.inner.write();
        if inner.index.contains_key(shipment.tracking_id()) {
            return Err(ShipmentError::DuplicateKey(shipment.tracking_id().clone()));
        }
        inner.push(shipment);
        Ok(())
    }

    /// Generate a free tracking id and insert the shipment built from it.
    ///
    /// Generation and insertion happen under one write lock, so a code seen as
    /// free cannot be claimed by a concurrent insert before this one lands.
    pub fn insert_new<B>(
        &self,
        codes: &TrackingCodeGenerator,
        build: B,
    ) -> Result<Shipment, ShipmentError>
    where
        B: FnOnce(TrackingId) -> Shipment,
    {
        let mut inner = self.inner.write();
        let tracking_id = codes.generate(|candidate| inner.index.contains_key(candidate))?;
        let shipment = build(tracking_id);
        if inner.index.contains_key(shipment.tracking_id()) {
            return Err(ShipmentError::DuplicateKey(shipment.tracking_id().clone()));
        }
        inner.push(shipment.clone());
        Ok(shipment)
    }

    fn cell(&self, tracking_id: &str) -> Result<Arc<Mutex<Shipment>>, ShipmentError> {
        self.inner
            .read()
            .index
            .get(tracking_id)
            .cloned()
            .ok_or_else(|| ShipmentError::NotFound(TrackingId::new(tracking_id)))
    }

    /// Snapshot of one shipment
    pub fn get(&self, tracking_id: &str) -> Result<Shipment, ShipmentError> {
        let cell = self.cell(tracking_id)?;
        let shipment = cell.lock().clone();
        Ok(shipment)
    }

    /// Snapshots of every shipment in insertion order
    pub fn list(&self) -> Vec<Shipment> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.index.get(id))
            .map(|cell| cell.lock().clone())
            .collect()
    }

    /// Atomic read-modify-write on one shipment.
    ///
    /// `f` works on a draft; the draft replaces the stored aggregate only when
    /// `f` returns `Ok`. Other `mutate` calls on the same key wait for the
    /// commit, calls on other keys proceed.
    pub fn mutate<F>(&self, tracking_id: &str, f: F) -> Result<Shipment, ShipmentError>
    where
        F: FnOnce(&mut Shipment) -> Result<(), ShipmentError>,
    {
        let cell = self.cell(tracking_id)?;
        let mut guard = cell.lock();

        let mut draft = guard.clone();
        f(&mut draft)?;
        *guard = draft;

        debug!(tracking_id = %tracking_id, milestones = %guard.milestones().len(), "shipment_committed");
        Ok(guard.clone())
    }

    pub fn contains(&self, tracking_id: &str) -> bool {
        self.inner.read().index.contains_key(tracking_id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every shipment (test isolation and administrative reset)
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        let removed = inner.order.len();
        inner.index.clear();
        inner.order.clear();
        info!(removed = %removed, "shipment_store_cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::TransitionError;
    use crate::domain::types::ShipmentStatus;
    use chrono::{Duration, Utc};

    fn shipment(suffix: u32) -> Shipment {
        let now = Utc::now();
        Shipment::new(TrackingId::from_suffix(suffix), "Berlin", "Amsterdam", now + Duration::days(2), now)
    }

    #[test]
    fn test_insert_and_get() {
        let store = ShipmentStore::new();
        store.insert(shipment(111111)).unwrap();

        let found = store.get("DHL111111").unwrap();
        assert_eq!(found.origin(), "Berlin");
        assert_eq!(store.len(), 1);
        assert!(store.contains("DHL111111"));
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let store = ShipmentStore::new();
        store.insert(shipment(111111)).unwrap();

        let err = store.insert(shipment(111111)).unwrap_err();
        assert_eq!(err, ShipmentError::DuplicateKey(TrackingId::from_suffix(111111)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let store = ShipmentStore::new();
        let err = store.get("DHL000001").unwrap_err();
        assert_eq!(err, ShipmentError::NotFound(TrackingId::new("DHL000001")));
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let store = ShipmentStore::new();
        for suffix in [333333, 111111, 222222] {
            store.insert(shipment(suffix)).unwrap();
        }

        let ids: Vec<String> =
            store.list().iter().map(|s| s.tracking_id().to_string()).collect();
        assert_eq!(ids, ["DHL333333", "DHL111111", "DHL222222"]);
    }

    #[test]
    fn test_insert_new_assigns_unused_code() {
        let store = ShipmentStore::new();
        let codes = TrackingCodeGenerator::default();
        let now = Utc::now();

        let created = store
            .insert_new(&codes, |id| Shipment::new(id, "Dubai", "Mumbai", now + Duration::days(1), now))
            .unwrap();

        assert!(TrackingId::is_well_formed(created.tracking_id().as_str()));
        assert_eq!(store.get(created.tracking_id().as_str()).unwrap(), created);
    }

    #[test]
    fn test_failed_mutation_leaves_aggregate_untouched() {
        let store = ShipmentStore::new();
        store.insert(shipment(111111)).unwrap();
        let before = store.get("DHL111111").unwrap();

        let err = store
            .mutate("DHL111111", |s| {
                s.record(ShipmentStatus::PickedUp, "Somewhere", Utc::now());
                Err(TransitionError::NoOpTransition {
                    from: ShipmentStatus::PickedUp,
                    to: ShipmentStatus::PickedUp,
                }
                .into())
            })
            .unwrap_err();

        assert!(matches!(err, ShipmentError::InvalidTransition(_)));
        assert_eq!(store.get("DHL111111").unwrap(), before);
    }

    #[test]
    fn test_mutate_commits() {
        let store = ShipmentStore::new();
        store.insert(shipment(111111)).unwrap();

        let updated = store
            .mutate("DHL111111", |s| {
                s.record(ShipmentStatus::PickedUp, "Berlin Hub", Utc::now());
                Ok(())
            })
            .unwrap();

        assert_eq!(updated.milestones().len(), 2);
        assert_eq!(store.get("DHL111111").unwrap(), updated);
    }

    #[test]
    fn test_mutate_missing() {
        let store = ShipmentStore::new();
        let err = store.mutate("DHL999999", |_| Ok(())).unwrap_err();
        assert!(matches!(err, ShipmentError::NotFound(_)));
    }

    #[test]
    fn test_concurrent_mutations_serialize_per_key() {
        let store = ShipmentStore::new();
        store.insert(shipment(111111)).unwrap();
        store.insert(shipment(222222)).unwrap();

        std::thread::scope(|scope| {
            for i in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    let id = if i % 2 == 0 { "DHL111111" } else { "DHL222222" };
                    for _ in 0..25 {
                        store
                            .mutate(id, |s| {
                                s.record(ShipmentStatus::InTransit, "Hub", Utc::now());
                                Ok(())
                            })
                            .unwrap();
                    }
                });
            }
        });

        // 4 threads x 25 appends per key, plus the initial milestone
        assert_eq!(store.get("DHL111111").unwrap().milestones().len(), 101);
        assert_eq!(store.get("DHL222222").unwrap().milestones().len(), 101);
    }

    #[test]
    fn test_clear() {
        let store = ShipmentStore::new();
        store.insert(shipment(111111)).unwrap();
        store.insert(shipment(222222)).unwrap();

        store.clear();

        assert!(store.is_empty());
        assert!(store.list().is_empty());
        assert!(store.get("DHL111111").is_err());
        store.insert(shipment(111111)).unwrap();
    }
}
