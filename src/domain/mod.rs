//! Domain models - shipment aggregate, lifecycle states, and errors
//!
//! This module contains the canonical data types used throughout the system:
//! - `Shipment` - the aggregate root with its milestone history
//! - `Milestone` - a single recorded status change
//! - `ShipmentStatus` - the eight lifecycle states
//! - `TrackingId` - the business-facing `DHL` + 6 digit code
//! - `ShipmentError` / `TransitionError` - typed failure outcomes

pub mod error;
pub mod shipment;
pub mod types;

// Re-export commonly used types at module level
pub use error::{ShipmentError, TransitionError};
pub use shipment::{Milestone, Shipment};
pub use types::{ShipmentStatus, TrackingId};
