//! Tracking code generation (`DHL` + 6 random digits)

use crate::domain::error::ShipmentError;
use crate::domain::types::TrackingId;
use rand::Rng;
use tracing::{debug, warn};

/// Lowest and highest numeric suffix
const SUFFIX_MIN: u32 = 100_000;
const SUFFIX_MAX: u32 = 999_999;

/// Default retry budget when a drawn code is already taken
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Draws random tracking codes, retrying on collision
#[derive(Debug, Clone, Copy)]
pub struct TrackingCodeGenerator {
    max_attempts: u32,
}

impl Default for TrackingCodeGenerator {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS }
    }
}

impl TrackingCodeGenerator {
    /// A budget of zero is treated as one attempt
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts: max_attempts.max(1) }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Generate a code for which `is_taken` returns false
    pub fn generate<F>(&self, is_taken: F) -> Result<TrackingId, ShipmentError>
    where
        F: Fn(&TrackingId) -> bool,
    {
        self.generate_with(&mut rand::thread_rng(), is_taken)
    }

    /// Same as [`generate`](Self::generate) with an explicit RNG
    pub fn generate_with<R, F>(&self, rng: &mut R, is_taken: F) -> Result<TrackingId, ShipmentError>
    where
        R: Rng,
        F: Fn(&TrackingId) -> bool,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = TrackingId::from_suffix(rng.gen_range(SUFFIX_MIN..=SUFFIX_MAX));
            if !is_taken(&candidate) {
                return Ok(candidate);
            }
            debug!(tracking_id = %candidate, attempt = %attempt, "tracking_code_collision");
        }

        warn!(attempts = %self.max_attempts, "tracking_code_attempts_exhausted");
        Err(ShipmentError::ExhaustedAttempts { attempts: self.max_attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;
    use std::collections::HashSet;

    #[test]
    fn test_generated_code_is_well_formed() {
        let generator = TrackingCodeGenerator::default();
        for _ in 0..200 {
            let id = generator.generate(|_| false).unwrap();
            assert!(TrackingId::is_well_formed(id.as_str()), "{id}");
            let suffix: u32 = id.as_str()[3..].parse().unwrap();
            assert!((SUFFIX_MIN..=SUFFIX_MAX).contains(&suffix));
        }
    }

    #[test]
    fn test_retries_past_collisions() {
        let generator = TrackingCodeGenerator::new(5);
        let calls = Cell::new(0u32);

        // First two draws collide
        let id = generator
            .generate(|_| {
                calls.set(calls.get() + 1);
                calls.get() <= 2
            })
            .unwrap();

        assert_eq!(calls.get(), 3);
        assert!(TrackingId::is_well_formed(id.as_str()));
    }

    #[test]
    fn test_exhausted_attempts() {
        let generator = TrackingCodeGenerator::new(4);
        let calls = Cell::new(0u32);

        let err = generator
            .generate(|_| {
                calls.set(calls.get() + 1);
                true
            })
            .unwrap_err();

        assert_eq!(err, ShipmentError::ExhaustedAttempts { attempts: 4 });
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_zero_budget_still_tries_once() {
        let generator = TrackingCodeGenerator::new(0);
        assert_eq!(generator.max_attempts(), 1);
        assert!(generator.generate(|_| false).is_ok());
    }

    #[test]
    fn test_avoids_existing_codes() {
        let generator = TrackingCodeGenerator::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut taken = HashSet::new();

        for _ in 0..500 {
            let id = generator.generate_with(&mut rng, |c| taken.contains(c)).unwrap();
            assert!(taken.insert(id));
        }
    }
}
