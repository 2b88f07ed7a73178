// store

mod token_store;

pub use token_store::*;

// transport

mod refresh_transport;

pub use refresh_transport::*;

// notification

mod session_events;

pub use session_events::*;
