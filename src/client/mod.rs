mod authenticated_client;
mod error;
mod refresh_state;

pub use authenticated_client::*;
pub use error::*;
pub use refresh_state::*;
