//! Shipment lifecycle transition rules
//!
//! ```text
//! Created -> PickedUp -> InTransit -> ArrivedAtFacility -> OutForDelivery -> Delivered
//!                           |  ^              |                  |
//!                           v  |              v                  v
//!                 Exception / Delayed <-------+------------------+
//! ```
//!
//! `Delayed` resumes to `InTransit` or `OutForDelivery`; `Exception` resumes to
//! `InTransit`. `Delivered` has no table entry and accepts nothing.

use crate::domain::error::TransitionError;
use crate::domain::types::ShipmentStatus;

use ShipmentStatus::*;

/// Current state -> states it may move to
pub type TransitionTable = &'static [(ShipmentStatus, &'static [ShipmentStatus])];

/// The delivery lifecycle
pub const LIFECYCLE: TransitionTable = &[
    (Created, &[PickedUp]),
    (PickedUp, &[InTransit]),
    (InTransit, &[ArrivedAtFacility, Delayed, Exception]),
    (ArrivedAtFacility, &[OutForDelivery, Delayed, Exception]),
    (OutForDelivery, &[Delivered, Delayed, Exception]),
    (Delayed, &[InTransit, OutForDelivery]),
    (Exception, &[InTransit]),
];

/// Stateless validator over a fixed transition table
#[derive(Debug, Clone, Copy)]
pub struct TransitionValidator {
    table: TransitionTable,
}

impl Default for TransitionValidator {
    fn default() -> Self {
        Self { table: LIFECYCLE }
    }
}

impl TransitionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator over a custom table (tests)
    #[cfg(test)]
    pub(crate) fn with_table(table: TransitionTable) -> Self {
        Self { table }
    }

    /// States reachable from `current` in one step
    pub fn allowed_next(&self, current: ShipmentStatus) -> &'static [ShipmentStatus] {
        self.lookup(current).unwrap_or(&[])
    }

    fn lookup(&self, current: ShipmentStatus) -> Option<&'static [ShipmentStatus]> {
        self.table.iter().find(|(from, _)| *from == current).map(|(_, next)| *next)
    }

    /// Check whether `current -> requested` is a legal lifecycle step
    pub fn validate(
        &self,
        current: ShipmentStatus,
        requested: ShipmentStatus,
    ) -> Result<(), TransitionError> {
        let (from, to) = (current, requested);

        if current.is_terminal() {
            return Err(TransitionError::TerminalState { from, to });
        }

        if current == requested {
            return Err(TransitionError::NoOpTransition { from, to });
        }

        let allowed = self.lookup(current).ok_or(TransitionError::UnrecognizedState { from, to })?;

        if !allowed.contains(&requested) {
            return Err(TransitionError::DisallowedTransition { from, to });
        }

        Ok(())
    }
}
