//! Reload gate: marks the single in-flight reload.
//!
//! The gate is shared (`Arc`) so other threads can sample the state while
//! the controller works. Entering hands out a [`ReloadGuard`]; dropping the
//! guard returns the gate to `Idle` on every exit path, unwinding included.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

/// Where the controller is in the reload cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Idle,
    Reloading,
    Published,
    Failed,
}

impl ReloadState {
    fn to_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Reloading => 1,
            Self::Published => 2,
            Self::Failed => 3,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Reloading,
            2 => Self::Published,
            3 => Self::Failed,
            _ => Self::Idle,
        }
    }
}

/// Atomic busy flag plus observable state.
#[derive(Debug, Default)]
pub struct ReloadGate {
    in_flight: AtomicBool,
    state: AtomicU8,
    completed: AtomicU64,
}

impl ReloadGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Enter a reload. Returns `None` while another reload holds the gate.
    pub fn try_begin(self: &Arc<Self>) -> Option<ReloadGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.set_state(ReloadState::Reloading);
        Some(ReloadGuard {
            gate: Arc::clone(self),
        })
    }

    pub fn is_reloading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ReloadState {
        ReloadState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Number of reload cycles that have run to completion.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    fn set_state(&self, state: ReloadState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }
}

/// Proof of holding the gate.
#[derive(Debug)]
pub struct ReloadGuard {
    gate: Arc<ReloadGate>,
}

impl ReloadGuard {
    /// Record the outcome of the loader call.
    pub fn settle(&self, outcome: ReloadState) {
        self.gate.set_state(outcome);
    }
}

impl Drop for ReloadGuard {
    fn drop(&mut self) {
        self.gate.set_state(ReloadState::Idle);
        self.gate.completed.fetch_add(1, Ordering::AcqRel);
        self.gate.in_flight.store(false, Ordering::Release);
    }
}
