//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `api` - hyper HTTP server exposing the shipment service
//! - `validation` - request DTOs and structural input checks
//! - `prometheus` - Prometheus text rendering for `/metrics`

pub mod api;
pub mod prometheus;
pub mod validation;

// Re-export commonly used types
pub use api::{start_api_server, ApiState};
pub use validation::ValidationError;
