//! Services - lifecycle rules and state management
//!
//! This module contains the core business logic services:
//! - `lifecycle` - Transition table and validator
//! - `tracking_code` - Unique `DHL` tracking code generation
//! - `store` - In-memory shipment store with per-shipment locking
//! - `shipment_service` - Create/read/update orchestration

pub mod lifecycle;
pub mod shipment_service;
pub mod store;
pub mod tracking_code;

// Re-export commonly used types
pub use lifecycle::TransitionValidator;
pub use shipment_service::ShipmentService;
pub use store::ShipmentStore;
pub use tracking_code::TrackingCodeGenerator;
