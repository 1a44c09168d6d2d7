//! Error types for shipment lifecycle operations.
//!
//! Every failure is a deterministic business outcome; callers branch on the
//! variant rather than on message text.

use crate::domain::types::{ShipmentStatus, TrackingId};
use thiserror::Error;

/// A rejected lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot transition from {from} to {to}. Delivered is a terminal state. No further updates are allowed.")]
    TerminalState { from: ShipmentStatus, to: ShipmentStatus },

    #[error("Cannot transition from {from} to {to}. Status is already set to this value.")]
    NoOpTransition { from: ShipmentStatus, to: ShipmentStatus },

    #[error("Cannot transition from {from} to {to}. Current status {from} is not recognized.")]
    UnrecognizedState { from: ShipmentStatus, to: ShipmentStatus },

    #[error("Cannot transition from {from} to {to}. This transition is not allowed in the shipment lifecycle.")]
    DisallowedTransition { from: ShipmentStatus, to: ShipmentStatus },
}

impl TransitionError {
    /// Short label used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            TransitionError::TerminalState { .. } => "terminal_state",
            TransitionError::NoOpTransition { .. } => "no_op",
            TransitionError::UnrecognizedState { .. } => "unrecognized_state",
            TransitionError::DisallowedTransition { .. } => "disallowed",
        }
    }
}

/// Errors surfaced by the shipment service and store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShipmentError {
    #[error("Shipment not found")]
    NotFound(TrackingId),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("Tracking ID already exists: {0}")]
    DuplicateKey(TrackingId),

    #[error("Failed to generate a unique tracking ID after {attempts} attempts")]
    ExhaustedAttempts { attempts: u32 },
}

impl ShipmentError {
    /// True for outcomes caused by the request itself (not found, illegal transition)
    pub fn is_client_error(&self) -> bool {
        matches!(self, ShipmentError::NotFound(_) | ShipmentError::InvalidTransition(_))
    }
}
