//! Configuration sections.
//!
//! | Section  | Purpose                                   |
//! |----------|-------------------------------------------|
//! | `[app]`  | Source file and application name          |
//! | `[serve]`| Publisher interface, ports, browser open  |

mod app;
mod serve;

pub use app::{AppSection, DEFAULT_SOURCE};
pub use serve::{DEFAULT_PORT, ServeConfig};
