mod auth_session;
mod error;
mod profile_sync;

pub use auth_session::*;
pub use error::*;
pub use profile_sync::*;
