//! Reloadable `tracing` setup: a quiet bootstrap filter until settings are
//! loaded, then the configured one.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
