//! App-queue selection policies
//!
//! The scheduler delegates "which tenant goes next" to a policy object so
//! alternative fairness rules (strict round-robin, weighted, aging-based)
//! can be swapped in without touching the loop itself.

use rand::Rng;

/// Picks which ready app queue the scheduler services next.
pub trait SelectPolicy: Send + Sync {
    /// Return an index into `ready`. Called only with a non-empty slice.
    fn select(&self, ready: &[String]) -> usize;
}

/// Uniform random selection.
///
/// Approximates round-robin fairness across apps without per-app state;
/// selection ignores queue depth and age, so there is no starvation
/// bound beyond the probabilistic one.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelect;

impl SelectPolicy for RandomSelect {
    fn select(&self, ready: &[String]) -> usize {
        rand::rng().random_range(0..ready.len())
    }
}
