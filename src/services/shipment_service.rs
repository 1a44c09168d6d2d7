//! Shipment service - the entry point for callers of the lifecycle engine

use crate::domain::error::ShipmentError;
use crate::domain::shipment::Shipment;
use crate::domain::types::ShipmentStatus;
use crate::infra::metrics::Metrics;
use crate::services::lifecycle::TransitionValidator;
use crate::services::store::ShipmentStore;
use crate::services::tracking_code::TrackingCodeGenerator;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Creates, reads and advances shipments
///
/// Inputs are assumed structurally valid (non-empty strings, future ETA);
/// the service only enforces existence and lifecycle legality.
pub struct ShipmentService {
    store: Arc<ShipmentStore>,
    validator: TransitionValidator,
    codes: TrackingCodeGenerator,
    metrics: Option<Arc<Metrics>>,
}

impl ShipmentService {
    pub fn new(store: Arc<ShipmentStore>) -> Self {
        Self {
            store,
            validator: TransitionValidator::new(),
            codes: TrackingCodeGenerator::default(),
            metrics: None,
        }
    }

    /// Create a service with metrics recording
    pub fn with_metrics(store: Arc<ShipmentStore>, metrics: Arc<Metrics>) -> Self {
        Self { metrics: Some(metrics), ..Self::new(store) }
    }

    /// Override the tracking code generator (retry budget)
    pub fn with_codes(mut self, codes: TrackingCodeGenerator) -> Self {
        self.codes = codes;
        self
    }

    pub fn store(&self) -> &Arc<ShipmentStore> {
        &self.store
    }

    /// Register a new shipment in `Created` at its origin
    pub fn create(
        &self,
        origin: &str,
        destination: &str,
        estimated_delivery_date: DateTime<Utc>,
    ) -> Result<Shipment, ShipmentError> {
        let result = self.store.insert_new(&self.codes, |tracking_id| {
            Shipment::new(tracking_id, origin, destination, estimated_delivery_date, Utc::now())
        });

        match result {
            Ok(shipment) => {
                info!(
                    tracking_id = %shipment.tracking_id(),
                    shipment_id = %shipment.id(),
                    origin = %shipment.origin(),
                    destination = %shipment.destination(),
                    eta = %shipment.estimated_delivery_date().to_rfc3339(),
                    "shipment_created"
                );
                if let Some(m) = &self.metrics {
                    m.record_shipment_created();
                    m.set_live_shipments(self.store.len() as u64);
                }
                Ok(shipment)
            }
            Err(e) => {
                warn!(error = %e, "shipment_create_failed");
                if let Some(m) = &self.metrics {
                    m.record_code_generation_failure();
                }
                Err(e)
            }
        }
    }

    /// Current snapshot of one shipment
    pub fn get_by_tracking_id(&self, tracking_id: &str) -> Result<Shipment, ShipmentError> {
        self.store.get(tracking_id).inspect_err(|e| self.note_failure(tracking_id, e))
    }

    /// Move a shipment to `new_status`, recording a milestone at `location`.
    ///
    /// Validation and append run inside the store's per-shipment critical
    /// section; on any failure the shipment is left unchanged.
    pub fn update_status(
        &self,
        tracking_id: &str,
        new_status: ShipmentStatus,
        location: &str,
    ) -> Result<Shipment, ShipmentError> {
        let mut previous = None;
        let result = self.store.mutate(tracking_id, |shipment| {
            let current = shipment.current_status();
            self.validator.validate(current, new_status)?;
            previous = Some(current);
            shipment.record(new_status, location, Utc::now());
            Ok(())
        });

        match result {
            Ok(shipment) => {
                let milestone_id = shipment.last_milestone().map(|m| m.id.to_string());
                info!(
                    tracking_id = %tracking_id,
                    milestone_id = %milestone_id.as_deref().unwrap_or("none"),
                    from = %previous.map_or("unknown", |s| s.as_str()),
                    to = %new_status,
                    location = %location,
                    milestones = %shipment.milestones().len(),
                    "shipment_status_updated"
                );
                if let Some(m) = &self.metrics {
                    m.record_status_update();
                }
                Ok(shipment)
            }
            Err(e) => {
                self.note_failure(tracking_id, &e);
                Err(e)
            }
        }
    }

    /// Every shipment in creation order
    pub fn list_all(&self) -> Vec<Shipment> {
        let shipments = self.store.list();
        debug!(count = %shipments.len(), "shipments_listed");
        shipments
    }

    /// Remove every shipment (test isolation and administrative reset)
    ///
    /// Must not run concurrently with `update_status`: an update already
    /// holding a shipment commits to the removed copy and still returns `Ok`.
    pub fn reset(&self) {
        self.store.clear();
        info!("shipments_reset");
        if let Some(m) = &self.metrics {
            m.set_live_shipments(0);
        }
    }

    fn note_failure(&self, tracking_id: &str, err: &ShipmentError) {
        match err {
            ShipmentError::NotFound(_) => {
                debug!(tracking_id = %tracking_id, "shipment_not_found");
                if let Some(m) = &self.metrics {
                    m.record_not_found();
                }
            }
            ShipmentError::InvalidTransition(t) => {
                info!(
                    tracking_id = %tracking_id,
                    kind = %t.kind(),
                    reason = %t,
                    "shipment_transition_rejected"
                );
                if let Some(m) = &self.metrics {
                    m.record_transition_rejected(t);
                }
            }
            other => warn!(tracking_id = %tracking_id, error = %other, "shipment_operation_failed"),
        }
    }
}
