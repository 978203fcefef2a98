//! Reload Module
//!
//! Drives the develop-mode reload cycle.
//!
//! # Architecture
//!
//! ```text
//! WatchEvent ─→ is_relevant ─→ Controller::reload ─→ SourceLoader
//!                                   │                     │
//!                                   ├─ push (reloading)   ↓
//!                                   └─ push (final) ←── Document | LoadError
//! ```
//!
//! # Modules
//!
//! - `controller` - owns the current Document and runs reload cycles
//! - `filter` - which watch events trigger a reload
//! - `gate` - at-most-one in-flight reload, observable state

mod controller;
mod filter;
mod gate;

pub use controller::Controller;
pub use filter::is_relevant;
pub use gate::{ReloadGate, ReloadGuard, ReloadState};

#[cfg(test)]
mod tests;
