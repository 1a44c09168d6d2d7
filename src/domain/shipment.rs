//! Shipment aggregate and its milestone history

use crate::domain::types::{ShipmentStatus, TrackingId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A recorded status change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    #[serde(skip)]
    pub id: Uuid,
    pub status: ShipmentStatus,
    pub location: String,
    pub timestamp: DateTime<Utc>,
}

impl Milestone {
    fn new(status: ShipmentStatus, location: &str, timestamp: DateTime<Utc>) -> Self {
        Self { id: Uuid::now_v7(), status, location: location.to_string(), timestamp }
    }
}

/// Shipment aggregate root
///
/// Fields are private so the only way to change a shipment after creation is
/// [`Shipment::record`], which keeps `current_status` in step with the last
/// milestone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    #[serde(skip)]
    id: Uuid,
    tracking_id: TrackingId,
    origin: String,
    destination: String,
    estimated_delivery_date: DateTime<Utc>,
    current_status: ShipmentStatus,
    milestones: Vec<Milestone>,
}

impl Shipment {
    /// Create a shipment in `Created` with its first milestone at `origin`
    pub fn new(
        tracking_id: TrackingId,
        origin: &str,
        destination: &str,
        estimated_delivery_date: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            tracking_id,
            origin: origin.to_string(),
            destination: destination.to_string(),
            estimated_delivery_date,
            current_status: ShipmentStatus::Created,
            milestones: vec![Milestone::new(ShipmentStatus::Created, origin, created_at)],
        }
    }

    /// Append a milestone and move to `status`.
    ///
    /// Does not check lifecycle legality; callers validate first. The
    /// timestamp is clamped so milestones never go backwards in time.
    pub fn record(&mut self, status: ShipmentStatus, location: &str, at: DateTime<Utc>) {
        let at = self.milestones.last().map_or(at, |last| at.max(last.timestamp));
        self.milestones.push(Milestone::new(status, location, at));
        self.current_status = status;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tracking_id(&self) -> &TrackingId {
        &self.tracking_id
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn estimated_delivery_date(&self) -> DateTime<Utc> {
        self.estimated_delivery_date
    }

    pub fn current_status(&self) -> ShipmentStatus {
        self.current_status
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    /// Most recent milestone (the sequence is never empty)
    pub fn last_milestone(&self) -> Option<&Milestone> {
        self.milestones.last()
    }

    pub fn is_delivered(&self) -> bool {
        self.current_status.is_terminal()
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
