//! Aggregate wait-time accounting
//!
//! Two counters back every latency quote the dispatcher hands out:
//!
//! - **lobby**: the summed estimates of all tasks currently waiting or
//!   running anywhere in the system.
//! - **door**: a reservation projection for arrivals that have asked for
//!   a quote but are not admitted yet.
//!
//! Admission moves an estimate from door to lobby; completion drains it
//! from lobby. Both counters are plain atomics, mutated only through the
//! operations below.

use std::sync::atomic::{AtomicI64, Ordering};

/// The two admission-control counters, in microseconds.
#[derive(Debug, Default)]
pub struct WaitTimes {
    lobby: AtomicI64,
    door: AtomicI64,
}

impl WaitTimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an admitted task: the estimate joins the lobby load and
    /// consumes its door reservation.
    pub fn admit(&self, estimate_us: i64) {
        self.lobby.fetch_add(estimate_us, Ordering::SeqCst);
        self.door.fetch_sub(estimate_us, Ordering::SeqCst);
    }

    /// Record a completed execution, draining the estimate from the lobby.
    pub fn finish(&self, estimate_us: i64) {
        self.lobby.fetch_sub(estimate_us, Ordering::SeqCst);
    }

    /// Reserve door capacity for a prospective arrival and return the
    /// quote pair `(lobby, lobby + door)`, door taken after the add.
    ///
    /// The reservation is consumed by a following [`admit`](Self::admit).
    /// A caller that quotes and never admits leaves it in place; there is
    /// no compensating release.
    pub fn quote(&self, estimate_us: i64) -> (i64, i64) {
        let door = self.door.fetch_add(estimate_us, Ordering::SeqCst) + estimate_us;
        let lobby = self.lobby.load(Ordering::SeqCst);
        (lobby, lobby + door)
    }

    /// Current lobby load in microseconds.
    pub fn lobby_us(&self) -> i64 {
        self.lobby.load(Ordering::SeqCst)
    }

    /// Current door reservation total in microseconds.
    pub fn door_us(&self) -> i64 {
        self.door.load(Ordering::SeqCst)
    }
}
