//! Core types - pure abstractions shared across the codebase.

mod context;
mod mode;
mod state;

pub use context::AppContext;
#[cfg(test)]
pub(crate) use context::test_context;
pub use mode::Mode;
pub use state::{register_shutdown, setup_shutdown_handler, shutdown_flag};
